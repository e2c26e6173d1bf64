//! Supervisor error types.

use std::path::PathBuf;
use std::process::ExitStatus;

use crate::process::{InvalidTransition, SpawnError};

/// Errors raised by supervisor operations.
#[derive(thiserror::Error, Debug)]
pub enum SupervisorError {
    /// A managed process could not be spawned.
    #[error("Failed to start {process}: {source}")]
    Spawn {
        process: String,
        #[source]
        source: SpawnError,
    },

    /// The node did not report ready in time.
    #[error("{process} did not become ready within {timeout_ms}ms")]
    ReadinessTimeout { process: String, timeout_ms: u64 },

    /// The node exited before it became ready.
    #[error("{process} exited during startup ({status})")]
    ExitedDuringStartup { process: String, status: ExitStatus },

    /// No valid cookie is held.
    #[error("Cookie unavailable: {reason}")]
    CookieUnavailable { reason: &'static str },

    /// The cookie file exists but could not be read.
    #[error("Failed to read cookie file {path}: {source}")]
    CookieRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A managed process could not be stopped.
    #[error("Failed to stop {process}: {source}")]
    Terminate {
        process: String,
        #[source]
        source: std::io::Error,
    },

    /// The OS could not report a managed process's state.
    #[error("Failed to query {process}: {source}")]
    Query {
        process: String,
        #[source]
        source: std::io::Error,
    },

    /// A lifecycle transition was rejected.
    #[error("{process}: {source}")]
    InvalidTransition {
        process: String,
        #[source]
        source: InvalidTransition,
    },

    /// A failure with no further information.
    #[error("Unknown error")]
    Unknown,
}
