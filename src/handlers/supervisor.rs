//! Supervisor channels: `initialize`, `status`, `shutdown`, `restart`,
//! `get-cookie` and `wallet-data`.
//!
//! The supervisor sits behind one async mutex, so lifecycle transitions from
//! concurrent requests are applied one at a time. `restart` holds the lock
//! across its shutdown and initialize steps.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::{handler, ChannelRegistry, HandlerError, Response, WalletData};
use crate::supervisor::{ProcessManager, CLI, CORE};

/// Prefix shared by every supervisor channel name.
pub const CHANNEL_PREFIX: &str = "neptune-process:";

/// Supervisor handle shared by all handlers.
pub type SharedManager = Arc<Mutex<dyn ProcessManager>>;

/// Operations exposed as channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Initialize,
    Status,
    Shutdown,
    Restart,
    GetCookie,
    WalletData,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Self::Initialize,
        Self::Status,
        Self::Shutdown,
        Self::Restart,
        Self::GetCookie,
        Self::WalletData,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Status => "status",
            Self::Shutdown => "shutdown",
            Self::Restart => "restart",
            Self::GetCookie => "get-cookie",
            Self::WalletData => "wallet-data",
        }
    }

    /// Full channel name, e.g. `neptune-process:get-cookie`.
    #[must_use]
    pub fn channel(self) -> String {
        format!("{CHANNEL_PREFIX}{}", self.as_str())
    }

    /// Parse a bare operation name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start both processes.
pub async fn handle_initialize(manager: &SharedManager) -> Response {
    let mut manager = manager.lock().await;
    manager
        .initialize()
        .await
        .map(|()| Response::ok())
        .map_err(HandlerError::from)
        .into()
}

/// Report the aggregate status.
pub async fn handle_status(manager: &SharedManager) -> Response {
    let mut manager = manager.lock().await;
    manager
        .status()
        .map(|status| Response::ok().with_status(status))
        .map_err(HandlerError::from)
        .into()
}

/// Stop both processes and confirm they are down.
pub async fn handle_shutdown(manager: &SharedManager) -> Response {
    let mut manager = manager.lock().await;
    shutdown_and_confirm(&mut *manager)
        .await
        .map(|()| Response::ok())
        .into()
}

/// Shutdown followed by initialize. Initialize is skipped if shutdown fails.
pub async fn handle_restart(manager: &SharedManager) -> Response {
    let mut manager = manager.lock().await;
    tracing::info!("Restarting supervisor");
    let result = match shutdown_and_confirm(&mut *manager).await {
        Ok(()) => manager.initialize().await.map_err(HandlerError::from),
        Err(e) => Err(e),
    };
    result.map(|()| Response::ok()).into()
}

/// Return the cookie of the running node.
pub async fn handle_get_cookie(manager: &SharedManager) -> Response {
    let mut manager = manager.lock().await;
    manager
        .cookie()
        .map(|cookie| Response::ok().with_cookie(cookie.into_inner()))
        .map_err(HandlerError::from)
        .into()
}

/// Placeholder wallet summary.
pub async fn handle_wallet_data() -> Response {
    Response::ok().with_data(WalletData::placeholder())
}

async fn shutdown_and_confirm(manager: &mut dyn ProcessManager) -> Result<(), HandlerError> {
    manager.shutdown().await?;
    let status = manager.status()?;
    if status.cli.is_running() {
        return Err(HandlerError::StillRunning { process: CLI });
    }
    if status.core.is_running() {
        return Err(HandlerError::StillRunning { process: CORE });
    }
    Ok(())
}

/// Install one handler per [`Operation`] on `registry`.
pub fn register_supervisor_handlers(registry: &ChannelRegistry, manager: &SharedManager) {
    for op in Operation::ALL {
        let manager = Arc::clone(manager);
        let h = handler(move || {
            let manager = Arc::clone(&manager);
            async move {
                match op {
                    Operation::Initialize => handle_initialize(&manager).await,
                    Operation::Status => handle_status(&manager).await,
                    Operation::Shutdown => handle_shutdown(&manager).await,
                    Operation::Restart => handle_restart(&manager).await,
                    Operation::GetCookie => handle_get_cookie(&manager).await,
                    Operation::WalletData => handle_wallet_data().await,
                }
            }
        });
        registry.register(op.channel(), h);
    }
    tracing::info!(count = Operation::ALL.len(), "Supervisor handlers registered");
}

/// Remove the handlers installed by [`register_supervisor_handlers`].
pub fn unregister_supervisor_handlers(registry: &ChannelRegistry) {
    for op in Operation::ALL {
        registry.unregister(&op.channel());
    }
    tracing::info!("Supervisor handlers unregistered");
}
