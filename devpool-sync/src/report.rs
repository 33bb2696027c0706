//! Local statistics file.
//!
//! ## Write protocol
//!
//! 1. Serialize statistics as pretty JSON with a trailing newline.
//! 2. SHA-256 both the new content and the file currently on disk.
//! 3. Skip if the digests match.
//! 4. Write to `<path>.devpool.tmp`, then rename over the target.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use devpool_core::{PublishOutcome, Statistics, StatisticsSink, TrackerError};

use crate::error::{io_err, SyncError};

fn digest(content: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(content);
    hex::encode(h.finalize())
}

/// Write `content` to `path` unless the file already holds it.
pub(crate) fn write_if_changed(
    path: &Path,
    content: &str,
    dry_run: bool,
) -> Result<PublishOutcome, SyncError> {
    let target = path.display().to_string();
    let wanted = digest(content.as_bytes());
    if let Ok(current) = std::fs::read(path) {
        if digest(&current) == wanted {
            tracing::debug!(path = %target, "statistics unchanged");
            return Ok(PublishOutcome::Unchanged { target });
        }
    }

    if dry_run {
        tracing::info!(path = %target, "[dry-run] would write statistics");
        return Ok(PublishOutcome::WouldWrite { target });
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = PathBuf::from(format!("{}.devpool.tmp", path.display()));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }

    tracing::info!(path = %target, "wrote statistics");
    Ok(PublishOutcome::Written { target })
}

/// [`StatisticsSink`] backed by a JSON file on local disk.
#[derive(Debug, Clone)]
pub struct FileStatisticsSink {
    path: PathBuf,
}

impl FileStatisticsSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStatisticsSink { path: path.into() }
    }
}

impl StatisticsSink for FileStatisticsSink {
    fn target(&self) -> String {
        self.path.display().to_string()
    }

    fn publish(
        &self,
        statistics: &Statistics,
        dry_run: bool,
    ) -> Result<PublishOutcome, TrackerError> {
        let publish = || -> Result<PublishOutcome, SyncError> {
            let mut json = serde_json::to_string_pretty(statistics)?;
            json.push('\n');
            write_if_changed(&self.path, &json, dry_run)
        };
        publish().map_err(|err| TrackerError::Storage {
            operation: format!("write {}", self.target()),
            message: err.to_string(),
        })
    }
}
