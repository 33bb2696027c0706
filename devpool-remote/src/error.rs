//! Mapping from HTTP failures to [`TrackerError`].
//!
//! | Response                                   | Error       |
//! |--------------------------------------------|-------------|
//! | transport failure, 429, 5xx                | `Transient` |
//! | 403 with `x-ratelimit-remaining: 0`        | `Transient` |
//! | 409, 412                                   | `Conflict`  |
//! | 404                                        | `NotFound`  |
//! | anything else                              | `Rejected`  |

use serde::Deserialize;

use devpool_core::TrackerError;

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

pub(crate) fn from_ureq(operation: &str, err: ureq::Error) -> TrackerError {
    match err {
        ureq::Error::Status(status, response) => {
            let rate_limited = response.header("x-ratelimit-remaining") == Some("0");
            let raw = response.into_string().unwrap_or_default();
            let message = serde_json::from_str::<ApiMessage>(&raw)
                .map(|m| m.message)
                .unwrap_or(raw);
            classify_status(operation, status, rate_limited, message)
        }
        ureq::Error::Transport(transport) => TrackerError::Transient {
            operation: operation.to_string(),
            message: transport.to_string(),
        },
    }
}

pub(crate) fn classify_status(
    operation: &str,
    status: u16,
    rate_limited: bool,
    message: String,
) -> TrackerError {
    let operation = operation.to_string();
    match status {
        429 | 500..=599 => TrackerError::Transient { operation, message },
        403 if rate_limited => TrackerError::Transient { operation, message },
        409 | 412 => TrackerError::Conflict { operation, message },
        404 => TrackerError::NotFound { operation },
        _ => TrackerError::Rejected {
            operation,
            status,
            message,
        },
    }
}

pub(crate) fn decode(operation: &str, err: impl std::fmt::Display) -> TrackerError {
    TrackerError::Decode {
        operation: operation.to_string(),
        message: err.to_string(),
    }
}
