//! Node readiness probing.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::Instant;

use super::{read_cookie, Cookie, CookieSnapshot, SupervisorError};
use crate::config::SupervisorConfig;
use crate::process::ManagedChild;

/// Polls a freshly spawned node until it has written a new cookie and,
/// optionally, accepts RPC connections.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    cookie_path: PathBuf,
    rpc_addr: Option<SocketAddr>,
    poll_interval: Duration,
    timeout: Duration,
}

impl ReadinessProbe {
    #[must_use]
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self {
            cookie_path: config.cookie_file(),
            rpc_addr: config
                .probe_rpc
                .then(|| SocketAddr::from((Ipv4Addr::LOCALHOST, config.rpc_port))),
            poll_interval: config.poll_interval(),
            timeout: config.ready_timeout(),
        }
    }

    #[must_use]
    pub fn cookie_path(&self) -> &PathBuf {
        &self.cookie_path
    }

    /// Wait until `child` is ready and return the cookie it issued.
    ///
    /// A cookie file unchanged since `stale` was taken belongs to a previous
    /// run and is ignored.
    ///
    /// # Errors
    ///
    /// - [`SupervisorError::ExitedDuringStartup`] if the child exits first
    /// - [`SupervisorError::ReadinessTimeout`] if the deadline passes
    /// - [`SupervisorError::CookieRead`] / [`SupervisorError::Query`] on I/O failure
    pub async fn wait(
        &self,
        child: &mut ManagedChild,
        stale: Option<&CookieSnapshot>,
    ) -> Result<Cookie, SupervisorError> {
        let deadline = Instant::now() + self.timeout;

        loop {
            let exited = child.try_wait().map_err(|source| SupervisorError::Query {
                process: child.name().to_string(),
                source,
            })?;
            if let Some(status) = exited {
                return Err(SupervisorError::ExitedDuringStartup {
                    process: child.name().to_string(),
                    status,
                });
            }

            if let Some(snapshot) = read_cookie(&self.cookie_path).await? {
                if stale != Some(&snapshot) && self.rpc_reachable().await {
                    tracing::info!(process = %child.name(), "Node ready");
                    return Ok(snapshot.cookie);
                }
            }

            if Instant::now() >= deadline {
                return Err(SupervisorError::ReadinessTimeout {
                    process: child.name().to_string(),
                    timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn rpc_reachable(&self) -> bool {
        let Some(addr) = self.rpc_addr else {
            return true;
        };
        match tokio::time::timeout(self.poll_interval, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::trace!(%addr, error = %e, "RPC port not accepting yet");
                false
            }
            Err(_) => false,
        }
    }
}
