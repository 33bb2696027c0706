//! Exclusive pass lock on the state directory.
//!
//! Two passes against the same devpool would race on mirror writes, so a pass
//! holds `<state_dir>/pass.lock` for its whole duration. The OS releases the
//! lock when the file handle drops, including on crash.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{io_err, SyncError};

pub const LOCK_FILE: &str = "pass.lock";

/// Guard for a held pass lock. Unlocks on drop.
#[derive(Debug)]
pub struct PassLock {
    file: fs::File,
    path: PathBuf,
}

impl PassLock {
    /// Take the lock without blocking.
    pub fn acquire(state_dir: &Path) -> Result<PassLock, SyncError> {
        fs::create_dir_all(state_dir).map_err(|e| io_err(state_dir, e))?;
        let path = state_dir.join(LOCK_FILE);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        if file.try_lock_exclusive().is_err() {
            return Err(SyncError::PassInProgress { path });
        }
        file.set_len(0).map_err(|e| io_err(&path, e))?;
        write!(file, "{}", std::process::id()).map_err(|e| io_err(&path, e))?;
        tracing::debug!(path = %path.display(), "pass lock acquired");
        Ok(PassLock { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PassLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
