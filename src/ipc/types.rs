//! IPC message types.
//!
//! Responses reuse [`Response`](crate::handlers::Response); only the request
//! and transport errors live here.

use serde::{Deserialize, Serialize};

/// Request naming the channel to invoke.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelRequest {
    /// Full channel name, e.g. `neptune-process:status`.
    pub channel: String,
}

impl ChannelRequest {
    #[must_use]
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
        }
    }
}

/// Errors that can occur during IPC.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Failed to connect to the supervisor socket.
    #[error("Failed to connect to supervisor: {0}")]
    ConnectionFailed(#[from] std::io::Error),

    /// The supervisor socket does not exist.
    #[error("Supervisor not running (socket not found)")]
    SupervisorNotRunning,

    /// The operation timed out.
    #[error("IPC timeout after {0}ms")]
    Timeout(u64),

    /// Failed to serialize or deserialize a message.
    #[error("Failed to serialize message: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The response from the supervisor was invalid.
    #[error("Invalid response from supervisor")]
    InvalidResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_request_json() {
        let request = ChannelRequest::new("neptune-process:status");
        let serialized = serde_json::to_string(&request).unwrap();
        assert_eq!(serialized, r#"{"channel":"neptune-process:status"}"#);
        assert!(!serialized.contains('\n'));
    }

    #[test]
    fn test_ipc_error_display() {
        let err = IpcError::SupervisorNotRunning;
        assert_eq!(err.to_string(), "Supervisor not running (socket not found)");

        let err = IpcError::Timeout(30_000);
        assert_eq!(err.to_string(), "IPC timeout after 30000ms");
    }
}
