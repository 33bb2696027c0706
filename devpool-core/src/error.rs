//! Error types for devpool-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating the configuration file.
///
/// These are the only errors that stop a pass before it starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// A partner or devpool URL that does not point at a GitHub owner or repository.
    #[error("invalid repository url '{url}': expected https://github.com/<owner>[/<repo>]")]
    InvalidRepoUrl { url: String },

    /// A field that parsed but carries an unusable value.
    #[error("invalid config value for `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Errors from label parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    /// A `Pricing:`/`Price:` label whose amount cannot be read exactly.
    #[error("malformed price label '{label}'")]
    MalformedPrice { label: String },
}

/// Errors surfaced by a remote issue tracker.
///
/// The variants follow the retry policy rather than the transport: callers
/// retry [`TrackerError::Transient`], re-fetch on [`TrackerError::Conflict`],
/// and give up on everything else.
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    /// Network failure, rate limit, or server error. Safe to retry.
    #[error("transient tracker error during {operation}: {message}")]
    Transient { operation: String, message: String },

    /// The resource changed between read and write.
    #[error("write conflict during {operation}: {message}")]
    Conflict { operation: String, message: String },

    /// The repository or issue does not exist (or is not visible to the token).
    #[error("not found during {operation}")]
    NotFound { operation: String },

    /// Any other refusal from the tracker (validation, permissions).
    #[error("tracker rejected {operation} (status {status}): {message}")]
    Rejected {
        operation: String,
        status: u16,
        message: String,
    },

    /// The tracker answered with a payload we could not decode.
    #[error("undecodable tracker response during {operation}: {message}")]
    Decode { operation: String, message: String },

    /// A collaborator backed by local storage failed to read or write it.
    #[error("storage error during {operation}: {message}")]
    Storage { operation: String, message: String },
}

impl TrackerError {
    /// `true` when retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, TrackerError::Transient { .. })
    }

    /// `true` when the target changed underneath the write.
    pub fn is_conflict(&self) -> bool {
        matches!(self, TrackerError::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let err = TrackerError::Transient {
            operation: "list issues acme/x".into(),
            message: "429".into(),
        };
        assert!(err.is_transient());
        assert!(!err.is_conflict());
        assert!(err.to_string().contains("acme/x"));
    }

    #[test]
    fn invalid_repo_url_message_names_url() {
        let err = ConfigError::InvalidRepoUrl {
            url: "ftp://nope".into(),
        };
        assert!(err.to_string().contains("ftp://nope"));
    }
}
