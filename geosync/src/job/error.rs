//! Job-level failure taxonomy.

use crate::service::{ExportError, TransportError};
use std::time::Duration;

/// A download job failed.
///
/// Recoverable: the user may retry with a fresh job. Cancellation is
/// deliberately absent here; it is a terminal status, not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Network interruption talking to the service.
    #[error("network failure: {0}")]
    Network(String),

    /// Server rejected the request or reported generation failure.
    #[error("server failure: {0}")]
    Server(String),

    /// Could not write the snapshot to local storage.
    #[error("disk failure: {0}")]
    Disk(String),

    /// Job exceeded its overall deadline.
    #[error("job timed out after {0:?}")]
    Timeout(Duration),

    /// Internal error (e.g. the job task ended without an outcome).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ExportError> for SyncError {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::Transport(t) => match t {
                TransportError::Status { .. } => Self::Server(t.to_string()),
                other => Self::Network(other.to_string()),
            },
            ExportError::Malformed(m) => Self::Server(m),
            ExportError::Generation(g) => Self::Server(g),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_request_maps_to_network() {
        let err: SyncError =
            ExportError::Transport(TransportError::Request("reset".to_string())).into();
        assert!(matches!(err, SyncError::Network(_)));
    }

    #[test]
    fn test_http_status_maps_to_server() {
        let err: SyncError = ExportError::Transport(TransportError::Status {
            status: 500,
            url: "https://h/x".to_string(),
        })
        .into();
        assert!(matches!(err, SyncError::Server(_)));
    }

    #[test]
    fn test_generation_maps_to_server() {
        let err: SyncError = ExportError::Generation("tile store offline".to_string()).into();
        assert_eq!(err, SyncError::Server("tile store offline".to_string()));
    }

    #[test]
    fn test_display() {
        let err = SyncError::Timeout(Duration::from_secs(300));
        assert_eq!(format!("{}", err), "job timed out after 300s");
    }
}
