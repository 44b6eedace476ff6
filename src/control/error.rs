//! Error definitions for the control-plane core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a snapshot could not be enqueued on a proxy's sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushError {
    /// The proxy's queue is at capacity; the update is dropped for it.
    #[error("sink queue full")]
    Full,

    /// The subscribe call owning the sink has already ended.
    #[error("sink closed")]
    Closed,
}

impl PushError {
    /// Label used for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            PushError::Full => "full",
            PushError::Closed => "closed",
        }
    }
}

/// Errors that end a single subscribe session.
///
/// These are reported only to the session's own peer and logs.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Snapshot could not be serialized.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The transport refused the frame.
    #[error("transport error: {0}")]
    Transport(#[from] axum::Error),

    /// The transport did not accept the frame in time.
    #[error("send timed out after {0} ms")]
    Timeout(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(PushError::Full.to_string(), "sink queue full");
        assert_eq!(StreamError::Timeout(250).to_string(), "send timed out after 250 ms");
    }

    #[test]
    fn test_transport_error_keeps_source() {
        use std::error::Error as _;

        let err = StreamError::from(axum::Error::new(std::io::Error::other("connection reset")));
        assert!(err.to_string().contains("connection reset"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_push_error_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&PushError::Closed).unwrap(), "\"closed\"");
    }
}
