//! IPC client for supervisor consumers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::config::Config;
use crate::handlers::Response;
use crate::ipc::{ChannelRequest, IpcError, DEFAULT_SOCKET_PATH};

/// Default timeout for IPC operations (30 seconds).
///
/// Enough for status queries. Lifecycle calls against a configured supervisor
/// should use [`IpcClient::for_config`], which covers its readiness window.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// IPC client for invoking supervisor channels.
#[derive(Debug, Clone)]
pub struct IpcClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl IpcClient {
    /// Creates a new IPC client with the default socket path.
    #[must_use]
    pub fn new() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Creates a new IPC client with a custom socket path.
    #[must_use]
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            socket_path: path.as_ref().to_path_buf(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Creates a client for the supervisor described by `config`.
    ///
    /// The timeout is long enough for `initialize` and `restart` to finish.
    #[must_use]
    pub fn for_config(config: &Config) -> Self {
        Self::with_path(&config.socket_path).with_timeout(config.supervisor.request_timeout())
    }

    /// Sets the timeout duration for IPC operations.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the socket path.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Returns the timeout duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Checks if the supervisor is running by verifying the socket file exists.
    #[must_use]
    pub fn is_supervisor_running(&self) -> bool {
        self.socket_path.exists()
    }

    /// Invokes `channel` and waits for its response.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The supervisor is not running ([`IpcError::SupervisorNotRunning`])
    /// - The connection fails ([`IpcError::ConnectionFailed`])
    /// - The operation times out ([`IpcError::Timeout`])
    /// - Message serialization fails ([`IpcError::SerializationError`])
    /// - The response is invalid ([`IpcError::InvalidResponse`])
    pub async fn call(&self, channel: &str) -> Result<Response, IpcError> {
        if !self.is_supervisor_running() {
            return Err(IpcError::SupervisorNotRunning);
        }

        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let request = ChannelRequest::new(channel);

        let result = tokio::time::timeout(self.timeout, async {
            let stream = UnixStream::connect(&self.socket_path).await?;
            let (reader, mut writer) = stream.into_split();

            let mut request_json = serde_json::to_string(&request)?;
            request_json.push('\n');
            writer.write_all(request_json.as_bytes()).await?;
            writer.flush().await?;

            let mut reader = BufReader::new(reader);
            let mut response_line = String::new();
            let bytes_read = reader.read_line(&mut response_line).await?;

            if bytes_read == 0 {
                return Err(IpcError::InvalidResponse);
            }

            let response: Response = serde_json::from_str(response_line.trim())?;
            Ok(response)
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => Err(IpcError::Timeout(timeout_ms)),
        }
    }
}

impl Default for IpcClient {
    fn default() -> Self {
        Self::new()
    }
}
