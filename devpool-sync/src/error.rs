//! Error types for devpool-sync.

use std::path::PathBuf;

use thiserror::Error;

use devpool_core::{ConfigError, TrackerError};
use devpool_renderer::RenderError;

/// Errors that can stop a pass. Per-issue and per-repository tracker failures
/// are recorded in the report instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the rendering engine.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// An error from the configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A tracker error that the caller chose to propagate.
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (notification store, statistics file).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Another pass holds the lock on the same state directory.
    #[error("another devpool pass is running (lock held at {path})")]
    PassInProgress { path: PathBuf },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
