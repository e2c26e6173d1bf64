//! Configuration types.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default RPC port of `neptune-core`.
pub const DEFAULT_RPC_PORT: u16 = 9799;

/// Slack added on top of the lifecycle timeouts for a client request.
pub const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Configuration for one managed binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BinaryConfig {
    /// Path or name of the executable.
    pub binary: PathBuf,
    /// Extra arguments appended after the supervisor-provided ones.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl BinaryConfig {
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }
}

fn default_core() -> BinaryConfig {
    BinaryConfig::new("neptune-core")
}

fn default_cli() -> BinaryConfig {
    BinaryConfig::new("neptune-cli")
}

fn default_network() -> String {
    "main".to_string()
}

fn default_rpc_port() -> u16 {
    DEFAULT_RPC_PORT
}

fn default_probe_rpc() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("neptune")
}

fn default_ready_timeout_ms() -> u64 {
    60_000
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_terminate_timeout_ms() -> u64 {
    5_000
}

/// Configuration for the process supervisor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// The node process.
    #[serde(default = "default_core")]
    pub core: BinaryConfig,
    /// The companion command-line client.
    #[serde(default = "default_cli")]
    pub cli: BinaryConfig,
    /// Network the node joins (`main`, `testnet`, `regtest`, ...).
    #[serde(default = "default_network")]
    pub network: String,
    /// Root data directory shared by both processes.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// RPC port the node listens on and the client connects to.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,
    /// Require the RPC port to accept connections before the node counts as ready.
    #[serde(default = "default_probe_rpc")]
    pub probe_rpc: bool,
    /// Explicit cookie file location. Derived from `data_dir` and `network` when unset.
    #[serde(default)]
    pub cookie_path: Option<PathBuf>,
    /// How long to wait for the node to become ready.
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    /// Interval between readiness checks.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Grace period between SIGTERM and SIGKILL.
    #[serde(default = "default_terminate_timeout_ms")]
    pub terminate_timeout_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            core: default_core(),
            cli: default_cli(),
            network: default_network(),
            data_dir: default_data_dir(),
            rpc_port: default_rpc_port(),
            probe_rpc: default_probe_rpc(),
            cookie_path: None,
            ready_timeout_ms: default_ready_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            terminate_timeout_ms: default_terminate_timeout_ms(),
        }
    }
}

impl SupervisorConfig {
    /// Location of the node's authentication cookie.
    #[must_use]
    pub fn cookie_file(&self) -> PathBuf {
        self.cookie_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(&self.network).join(".cookie"))
    }

    #[must_use]
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn terminate_timeout(&self) -> Duration {
        Duration::from_millis(self.terminate_timeout_ms)
    }

    /// Upper bound on a single request, long enough for `restart`.
    ///
    /// Restart stops both processes, may stop a node that never became ready,
    /// then waits out the readiness window.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.ready_timeout() + self.terminate_timeout() * 3 + REQUEST_TIMEOUT_MARGIN
    }
}

fn default_socket_path() -> PathBuf {
    PathBuf::from(crate::ipc::DEFAULT_SOCKET_PATH)
}

fn default_autostart() -> bool {
    true
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Socket the request/response boundary listens on.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    /// Initialize the supervisor as soon as `serve` starts.
    #[serde(default = "default_autostart")]
    pub autostart: bool,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            autostart: default_autostart(),
            supervisor: SupervisorConfig::default(),
        }
    }
}
