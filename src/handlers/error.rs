//! Boundary error types.

use crate::supervisor::SupervisorError;

/// Errors surfaced by channel handlers.
///
/// Every variant ends up as the `error` string of a failed
/// [`Response`](super::Response); none cross the boundary as a value.
#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    /// The supervisor rejected the operation.
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    /// A process was still alive after shutdown returned.
    #[error("{process} still running after shutdown")]
    StillRunning { process: &'static str },

    /// No handler is registered under the requested channel.
    #[error("No handler registered for channel {0}")]
    UnknownChannel(String),

    /// The handler task panicked or was cancelled.
    #[error("Unknown error")]
    Aborted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supervisor_error_is_transparent() {
        let err = HandlerError::from(SupervisorError::CookieUnavailable {
            reason: "node is not running",
        });
        assert_eq!(err.to_string(), "Cookie unavailable: node is not running");
    }

    #[test]
    fn test_aborted_is_unknown_error() {
        assert_eq!(HandlerError::Aborted.to_string(), "Unknown error");
    }

    #[test]
    fn test_unknown_channel_display() {
        let err = HandlerError::UnknownChannel("neptune-process:bogus".to_string());
        assert_eq!(
            err.to_string(),
            "No handler registered for channel neptune-process:bogus"
        );
    }

    #[test]
    fn test_still_running_display() {
        let err = HandlerError::StillRunning { process: "core" };
        assert_eq!(err.to_string(), "core still running after shutdown");
    }
}
