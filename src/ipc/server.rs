//! IPC server for the supervisor.
//!
//! Accepts channel requests on a Unix domain socket and answers each with
//! the handler's [`Response`].

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::watch;

use crate::handlers::{ChannelRegistry, Response};
use crate::ipc::{ChannelRequest, IpcError, DEFAULT_SOCKET_PATH};

/// IPC server for channel requests.
///
/// The server listens on a Unix domain socket and spawns a handler
/// for each incoming connection.
#[derive(Debug)]
pub struct IpcServer {
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server with a custom socket path.
    #[must_use]
    pub fn new<P: AsRef<Path>>(socket_path: P) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
        }
    }

    /// Creates a new IPC server with the default socket path.
    #[must_use]
    pub fn with_default_path() -> Self {
        Self::new(DEFAULT_SOCKET_PATH)
    }

    /// Returns the socket path.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Starts the server, dispatching every request through `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the socket.
    pub fn serve_registry(
        &self,
        registry: Arc<ChannelRegistry>,
    ) -> Result<ServerHandle, IpcError> {
        self.start(move |request| {
            let registry = Arc::clone(&registry);
            async move { registry.dispatch(&request.channel).await }
        })
    }

    /// Starts the IPC server with the given request handler.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the socket.
    pub fn start<F, Fut>(&self, handler: F) -> Result<ServerHandle, IpcError>
    where
        F: Fn(ChannelRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        // Remove a socket left behind by a previous run
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        let socket_path = self.socket_path.clone();

        tracing::info!(path = %socket_path.display(), "IPC server started");

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handler = Arc::new(handler);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("IPC server shutting down");
                            break;
                        }
                    }

                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, _addr)) => {
                                let handler = Arc::clone(&handler);
                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(stream, handler).await {
                                        tracing::warn!(error = %e, "Connection handler error");
                                    }
                                });
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to accept connection");
                            }
                        }
                    }
                }
            }
        });

        Ok(ServerHandle {
            socket_path: self.socket_path.clone(),
            shutdown_tx,
        })
    }
}

/// Handle for a running IPC server.
///
/// When dropped, the socket file is cleaned up.
#[derive(Debug)]
pub struct ServerHandle {
    socket_path: PathBuf,
    shutdown_tx: watch::Sender<bool>,
}

impl ServerHandle {
    /// Signals the server to shut down.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Returns the socket path.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);

        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                tracing::warn!(
                    path = %self.socket_path.display(),
                    error = %e,
                    "Failed to remove socket file"
                );
            }
        }
    }
}

/// Handles a single connection: one request line, one response line.
async fn handle_connection<F, Fut>(
    stream: tokio::net::UnixStream,
    handler: Arc<F>,
) -> Result<(), IpcError>
where
    F: Fn(ChannelRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Response> + Send,
{
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    let bytes_read = reader.read_line(&mut line).await?;
    if bytes_read == 0 {
        return Ok(());
    }

    // A malformed request still gets an envelope back
    let response = match serde_json::from_str::<ChannelRequest>(line.trim()) {
        Ok(request) => {
            tracing::debug!(channel = %request.channel, "Received channel request");
            handler(request).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Malformed channel request");
            Response::failure(&IpcError::SerializationError(e))
        }
    };

    let mut response_json = serde_json::to_string(&response)?;
    response_json.push('\n');
    writer.write_all(response_json.as_bytes()).await?;
    writer.flush().await?;

    Ok(())
}
