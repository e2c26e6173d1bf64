//! IPC between the supervisor and its consumers.
//!
//! Consumers (the UI shell, scripts, the `call` subcommand) reach the
//! supervisor's channels through a Unix domain socket.
//!
//! # Architecture
//!
//! ```text
//! Consumer                        Supervisor
//!     |                               |
//!     |-- ChannelRequest ------------>|
//!     |                               | (dispatch to registry)
//!     |<-- Response ------------------|
//!     |                               |
//! ```
//!
//! # Protocol
//!
//! Communication uses JSON-line format over Unix domain sockets:
//! - Client sends JSON + newline
//! - Server responds with JSON + newline
//!
//! # Example
//!
//! ```no_run
//! use neptune_supervisor::ipc::IpcClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = IpcClient::new();
//!
//! if client.is_supervisor_running() {
//!     let response = client.call("neptune-process:status").await?;
//!     println!("Supervisor status: {:?}", response.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod server;
pub mod types;

pub use client::IpcClient;
pub use server::{IpcServer, ServerHandle};
pub use types::{ChannelRequest, IpcError};

/// Default socket path for supervisor IPC.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/neptune-supervisor.sock";
