//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;

use neptune_supervisor::config::{BinaryConfig, SupervisorConfig};
use neptune_supervisor::process::ProcessStatus;
use neptune_supervisor::supervisor::{Cookie, ProcessManager, SupervisorError, SupervisorStatus};

/// A `sh` process that writes `cookie` to `$COOKIE_PATH` and stays alive.
pub fn cookie_writing_node(cookie: &str, cookie_path: &Path) -> BinaryConfig {
    BinaryConfig {
        binary: "sh".into(),
        args: vec![
            "-c".to_string(),
            format!("printf %s '{cookie}' > \"$COOKIE_PATH\"; exec sleep 30"),
        ],
        env: BTreeMap::from([(
            "COOKIE_PATH".to_string(),
            cookie_path.display().to_string(),
        )]),
    }
}

/// Like [`cookie_writing_node`], but every run issues `cookie-<pid>`.
pub fn pid_cookie_node(cookie_path: &Path) -> BinaryConfig {
    BinaryConfig {
        args: vec![
            "-c".to_string(),
            "printf %s \"cookie-$$\" > \"$COOKIE_PATH\"; exec sleep 30".to_string(),
        ],
        ..cookie_writing_node("", cookie_path)
    }
}

/// A `sh` process that runs `script` and ignores supervisor flags.
pub fn shell(script: &str) -> BinaryConfig {
    BinaryConfig {
        binary: "sh".into(),
        args: vec!["-c".to_string(), script.to_string()],
        env: BTreeMap::new(),
    }
}

/// Supervisor config rooted in `dir` with short timeouts and no RPC probe.
pub fn test_config(dir: &Path) -> SupervisorConfig {
    let cookie_path = dir.join(".cookie");
    SupervisorConfig {
        core: cookie_writing_node("test-cookie", &cookie_path),
        cli: shell("exec sleep 30"),
        network: "regtest".to_string(),
        data_dir: dir.to_path_buf(),
        probe_rpc: false,
        cookie_path: Some(cookie_path),
        ready_timeout_ms: 2_000,
        poll_interval_ms: 20,
        terminate_timeout_ms: 1_000,
        ..Default::default()
    }
}

/// Calls recorded by [`MockManager`].
pub type CallLog = Arc<StdMutex<Vec<&'static str>>>;

/// In-memory `ProcessManager` with scripted failures.
#[derive(Default)]
pub struct MockManager {
    pub calls: CallLog,
    pub initialize_error: Option<fn() -> SupervisorError>,
    pub shutdown_error: Option<fn() -> SupervisorError>,
    pub status_error: Option<fn() -> SupervisorError>,
    pub cookie_error: Option<fn() -> SupervisorError>,
    running: bool,
}

impl MockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> CallLog {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ProcessManager for MockManager {
    async fn initialize(&mut self) -> Result<(), SupervisorError> {
        self.record("initialize");
        if let Some(error) = self.initialize_error {
            return Err(error());
        }
        self.running = true;
        Ok(())
    }

    fn status(&mut self) -> Result<SupervisorStatus, SupervisorError> {
        self.record("status");
        if let Some(error) = self.status_error {
            return Err(error());
        }
        if self.running {
            Ok(SupervisorStatus {
                core: ProcessStatus::running(Some(100)),
                cli: ProcessStatus::running(Some(101)),
                initialized: true,
            })
        } else {
            Ok(SupervisorStatus::default())
        }
    }

    async fn shutdown(&mut self) -> Result<(), SupervisorError> {
        self.record("shutdown");
        if let Some(error) = self.shutdown_error {
            return Err(error());
        }
        self.running = false;
        Ok(())
    }

    fn cookie(&mut self) -> Result<Cookie, SupervisorError> {
        self.record("cookie");
        if let Some(error) = self.cookie_error {
            return Err(error());
        }
        Ok(Cookie::new("mock-cookie"))
    }
}

/// Spawn failure caused by `Initialization failed`.
pub fn initialization_failed() -> SupervisorError {
    SupervisorError::Spawn {
        process: "core".to_string(),
        source: std::io::Error::other("Initialization failed").into(),
    }
}
