//! Notification store: which source issues have already been announced.
//!
//! Persists a `NotifyStore` JSON document at `<state_dir>/announcements.json`.
//! The flat `{identity: token}` map written by earlier tooling is accepted on
//! load. Writes use the atomic `.tmp` + rename pattern.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use devpool_core::IssueId;

use crate::error::{io_err, SyncError};

pub const STORE_FILE: &str = "announcements.json";

/// Identity → announcement token.
pub type AnnouncementMap = BTreeMap<String, String>;

/// On-disk notification store payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotifyStore {
    pub updated_at: DateTime<Utc>,
    pub announced: AnnouncementMap,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NotifyStoreCompat {
    Structured(NotifyStoreStructuredCompat),
    Legacy(AnnouncementMap),
}

#[derive(Debug, Deserialize)]
struct NotifyStoreStructuredCompat {
    pub updated_at: Option<DateTime<Utc>>,
    pub announced: AnnouncementMap,
}

impl Default for NotifyStore {
    fn default() -> Self {
        NotifyStore {
            updated_at: Utc::now(),
            announced: AnnouncementMap::new(),
        }
    }
}

impl NotifyStore {
    pub fn has_announced(&self, identity: &IssueId) -> bool {
        self.announced.contains_key(identity.as_str())
    }

    /// Record an announcement. An existing token is never overwritten.
    pub fn mark_announced(&mut self, identity: &IssueId, token: impl Into<String>) {
        self.announced
            .entry(identity.as_str().to_string())
            .or_insert_with(|| token.into());
    }

    pub fn len(&self) -> usize {
        self.announced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.announced.is_empty()
    }
}

/// `<state_dir>/announcements.json`
pub fn store_path_at(state_dir: &Path) -> PathBuf {
    state_dir.join(STORE_FILE)
}

/// Load the store, returning an empty one if the file does not yet exist.
pub fn load_at(state_dir: &Path) -> Result<NotifyStore, SyncError> {
    let path = store_path_at(state_dir);
    if !path.exists() {
        return Ok(NotifyStore::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    match serde_json::from_str::<NotifyStoreCompat>(&contents)? {
        NotifyStoreCompat::Structured(store) => Ok(NotifyStore {
            updated_at: store.updated_at.unwrap_or_else(Utc::now),
            announced: store.announced,
        }),
        NotifyStoreCompat::Legacy(announced) => Ok(NotifyStore {
            updated_at: Utc::now(),
            announced,
        }),
    }
}

/// Load the store; a missing, unreadable or corrupt file yields an empty
/// store, and when `persist_fresh` is set a fresh empty store is written in
/// its place.
///
/// Never fails: a store that cannot be rewritten is logged and the pass runs
/// on the in-memory copy. Issues announced before the corruption will be
/// announced again.
pub fn load_or_reset_at(state_dir: &Path, persist_fresh: bool) -> NotifyStore {
    let path = store_path_at(state_dir);
    let store = match load_at(state_dir) {
        Ok(store) if path.exists() => return store,
        Ok(store) => {
            tracing::info!(path = %path.display(), "no notification store; starting empty");
            store
        }
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "notification store unreadable; starting empty"
            );
            NotifyStore::default()
        }
    };
    if persist_fresh {
        if let Err(err) = save_at(state_dir, &store) {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "fresh notification store not written; continuing in memory"
            );
        }
    }
    store
}

/// Save the store atomically: `<path>.tmp` then rename.
pub fn save_at(state_dir: &Path, store: &NotifyStore) -> Result<(), SyncError> {
    let path = store_path_at(state_dir);
    std::fs::create_dir_all(state_dir).map_err(|e| io_err(state_dir, e))?;

    let json = serde_json::to_string_pretty(store)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}
