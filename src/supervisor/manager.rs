//! Lifecycle supervisor for the node and client processes.
//!
//! Startup order is node first, then client: the node must have written its
//! cookie before the client is useful. Shutdown runs in reverse.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::{read_cookie, Cookie, ReadinessProbe, SupervisorError};
use crate::config::SupervisorConfig;
use crate::process::{
    ManagedChild, ProcessBuilder, ProcessState, ProcessStateMachine, ProcessStatus,
};

/// Name of the node process in logs and errors.
pub const CORE: &str = "core";
/// Name of the client process in logs and errors.
pub const CLI: &str = "cli";

/// Aggregate status of both managed processes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorStatus {
    pub core: ProcessStatus,
    pub cli: ProcessStatus,
    /// Both processes have been started since the last shutdown.
    pub initialized: bool,
}

/// Lifecycle operations exposed across the request/response boundary.
#[async_trait]
pub trait ProcessManager: Send {
    /// Start the node, wait for its cookie, then start the client.
    async fn initialize(&mut self) -> Result<(), SupervisorError>;

    /// Current status, refreshed from the OS.
    fn status(&mut self) -> Result<SupervisorStatus, SupervisorError>;

    /// Stop the client, then the node.
    async fn shutdown(&mut self) -> Result<(), SupervisorError>;

    /// The cookie issued by the running node.
    fn cookie(&mut self) -> Result<Cookie, SupervisorError>;
}

/// One managed process: its state machine and live handle.
#[derive(Debug)]
struct Slot {
    machine: ProcessStateMachine,
    child: Option<ManagedChild>,
}

impl Slot {
    fn new(name: &'static str) -> Self {
        Self {
            machine: ProcessStateMachine::new(name),
            child: None,
        }
    }

    fn name(&self) -> &'static str {
        self.machine.name()
    }

    fn transition(&mut self, next: ProcessState) -> Result<(), SupervisorError> {
        self.machine
            .transition(next)
            .map_err(|source| SupervisorError::InvalidTransition {
                process: self.name().to_string(),
                source,
            })
    }

    /// Reap the child if it exited on its own and report the result.
    fn refresh(&mut self) -> Result<ProcessStatus, SupervisorError> {
        if let Some(child) = self.child.as_mut() {
            let exited = child.try_wait().map_err(|source| SupervisorError::Query {
                process: self.machine.name().to_string(),
                source,
            })?;
            if let Some(status) = exited {
                tracing::warn!(process = self.name(), %status, "Process exited unexpectedly");
                self.child = None;
                if status.success() && self.machine.state() == ProcessState::Running {
                    self.transition(ProcessState::Stopped)?;
                } else {
                    self.machine.fail();
                }
            }
        }

        Ok(ProcessStatus {
            state: self.machine.state(),
            pid: self.child.as_ref().and_then(ManagedChild::id),
        })
    }

    fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(ManagedChild::id)
    }

    fn is_running(&self) -> bool {
        self.child.is_some() && self.machine.state() == ProcessState::Running
    }

    fn spawn(&mut self, builder: &ProcessBuilder) -> Result<(), SupervisorError> {
        self.transition(ProcessState::Starting)?;
        match ManagedChild::spawn(builder) {
            Ok(mut child) => {
                child.forward_output();
                self.child = Some(child);
                Ok(())
            }
            Err(source) => {
                self.machine.fail();
                Err(SupervisorError::Spawn {
                    process: self.name().to_string(),
                    source,
                })
            }
        }
    }

    async fn stop(&mut self, timeout: std::time::Duration) -> Result<(), SupervisorError> {
        self.refresh()?;
        let Some(mut child) = self.child.take() else {
            if self.machine.state() == ProcessState::Error {
                self.transition(ProcessState::Stopped)?;
            }
            return Ok(());
        };

        self.transition(ProcessState::Stopping)?;
        tracing::info!(process = self.name(), pid = ?child.id(), "Stopping process");
        match child.graceful_terminate(timeout).await {
            Ok(()) => self.transition(ProcessState::Stopped),
            Err(source) => {
                self.machine.fail();
                self.child = Some(child);
                Err(SupervisorError::Terminate {
                    process: self.name().to_string(),
                    source,
                })
            }
        }
    }
}

/// Cookie together with the pid of the node that wrote it.
#[derive(Debug, Clone)]
struct IssuedCookie {
    cookie: Cookie,
    pid: Option<u32>,
}

/// Supervisor for `neptune-core` and `neptune-cli`.
#[derive(Debug)]
pub struct NeptuneSupervisor {
    config: SupervisorConfig,
    core: Slot,
    cli: Slot,
    cookie: Option<IssuedCookie>,
    initialized: bool,
    status_tx: watch::Sender<SupervisorStatus>,
}

impl NeptuneSupervisor {
    #[must_use]
    pub fn new(config: SupervisorConfig) -> Self {
        let (status_tx, _) = watch::channel(SupervisorStatus::default());
        Self {
            config,
            core: Slot::new(CORE),
            cli: Slot::new(CLI),
            cookie: None,
            initialized: false,
            status_tx,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Receive every status change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SupervisorStatus> {
        self.status_tx.subscribe()
    }

    fn core_builder(&self) -> ProcessBuilder {
        let core = &self.config.core;
        ProcessBuilder::new(CORE, &core.binary)
            .args(core.args.iter().cloned())
            .flag("--network", &self.config.network)
            .flag("--data-dir", self.config.data_dir.display())
            .flag("--rpc-port", self.config.rpc_port)
            .envs(&core.env)
    }

    fn cli_builder(&self) -> ProcessBuilder {
        let cli = &self.config.cli;
        ProcessBuilder::new(CLI, &cli.binary)
            .args(cli.args.iter().cloned())
            .flag("--network", &self.config.network)
            .flag("--data-dir", self.config.data_dir.display())
            .flag("--port", self.config.rpc_port)
            .envs(&cli.env)
    }

    /// Build, publish and return the current status without touching the OS.
    fn snapshot(&self) -> SupervisorStatus {
        let status = SupervisorStatus {
            core: ProcessStatus {
                state: self.core.machine.state(),
                pid: self.core.pid(),
            },
            cli: ProcessStatus {
                state: self.cli.machine.state(),
                pid: self.cli.pid(),
            },
            initialized: self.initialized,
        };
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        status
    }

    fn cookie_is_current(&self) -> bool {
        match &self.cookie {
            Some(issued) => self.core.is_running() && issued.pid == self.core.pid(),
            None => false,
        }
    }

    /// Start the node unless it is already serving a current cookie.
    ///
    /// Returns `true` when a new node was spawned.
    async fn start_core(&mut self) -> Result<bool, SupervisorError> {
        self.core.refresh()?;
        if self.core.is_running() && self.cookie_is_current() {
            tracing::info!(pid = ?self.core.pid(), "Node already running");
            return Ok(false);
        }
        if self.core.child.is_some() {
            // Alive but never became ready; replace it.
            self.core.stop(self.config.terminate_timeout()).await?;
        }

        let probe = ReadinessProbe::from_config(&self.config);
        let stale = read_cookie(probe.cookie_path()).await?;

        let builder = self.core_builder();
        self.core.spawn(&builder)?;
        self.snapshot();

        let ready = match self.core.child.as_mut() {
            Some(child) => probe.wait(child, stale.as_ref()).await,
            None => Err(SupervisorError::Unknown),
        };
        match ready {
            Ok(cookie) => {
                self.cookie = Some(IssuedCookie {
                    cookie,
                    pid: self.core.pid(),
                });
                self.core.transition(ProcessState::Running)?;
                Ok(true)
            }
            Err(e) => {
                tracing::error!(error = %e, "Node failed to become ready");
                self.core.machine.fail();
                self.core.refresh()?;
                Err(e)
            }
        }
    }

    /// Start the client. A client left over from a replaced node is restarted.
    async fn start_cli(&mut self, node_replaced: bool) -> Result<(), SupervisorError> {
        self.cli.refresh()?;
        if self.cli.is_running() {
            if !node_replaced {
                tracing::info!(pid = ?self.cli.pid(), "Client already running");
                return Ok(());
            }
            tracing::info!(pid = ?self.cli.pid(), "Node was replaced, restarting client");
            self.cli.stop(self.config.terminate_timeout()).await?;
        }
        let builder = self.cli_builder();
        self.cli.spawn(&builder)?;
        self.cli.transition(ProcessState::Running)
    }
}

#[async_trait]
impl ProcessManager for NeptuneSupervisor {
    async fn initialize(&mut self) -> Result<(), SupervisorError> {
        tracing::info!(network = %self.config.network, "Initializing supervisor");

        let result = match self.start_core().await {
            Ok(node_replaced) => self.start_cli(node_replaced).await,
            Err(e) => Err(e),
        };
        if result.is_ok() {
            self.initialized = true;
            tracing::info!(
                core_pid = ?self.core.pid(),
                cli_pid = ?self.cli.pid(),
                "Supervisor initialized"
            );
        }
        self.snapshot();
        result
    }

    fn status(&mut self) -> Result<SupervisorStatus, SupervisorError> {
        self.core.refresh()?;
        self.cli.refresh()?;
        if self.cookie.is_some() && !self.cookie_is_current() {
            tracing::debug!("Dropping cookie of exited node");
            self.cookie = None;
        }
        Ok(self.snapshot())
    }

    async fn shutdown(&mut self) -> Result<(), SupervisorError> {
        tracing::info!("Shutting down supervisor");
        let timeout = self.config.terminate_timeout();

        let cli = self.cli.stop(timeout).await;
        let core = self.core.stop(timeout).await;

        self.cookie = None;
        self.initialized = false;
        self.snapshot();

        cli.and(core)
    }

    fn cookie(&mut self) -> Result<Cookie, SupervisorError> {
        self.core.refresh()?;
        if self.cookie_is_current() {
            if let Some(issued) = &self.cookie {
                return Ok(issued.cookie.clone());
            }
        }
        let reason = if self.cookie.take().is_some() {
            "node is not running"
        } else {
            "node has not issued a cookie"
        };
        Err(SupervisorError::CookieUnavailable { reason })
    }
}
