//! Child process spawning and control.
//!
//! This module provides a builder for configuring the node and client
//! command lines, along with control methods for managing the running
//! process.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

/// Error type for process spawning operations.
#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    /// The binary was not found.
    #[error("Binary not found: {0}")]
    NotFound(PathBuf),
    /// Permission denied when spawning.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpawnError {
    /// Create a `SpawnError` from an I/O error, classifying common cases.
    fn from_io(binary: &PathBuf, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(binary.clone()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(binary.clone()),
            _ => Self::Io(err),
        }
    }
}

/// Builder for a managed process command line.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    name: String,
    binary: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
}

impl ProcessBuilder {
    /// Create a builder for `binary`, logged under `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, binary: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            binary: binary.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// Append a flag followed by its value.
    #[must_use]
    pub fn flag(mut self, flag: &str, value: impl ToString) -> Self {
        self.args.push(flag.to_string());
        self.args.push(value.to_string());
        self
    }

    /// Append raw arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set environment variables for the child.
    #[must_use]
    pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn binary(&self) -> &PathBuf {
        &self.binary
    }

    /// Build the command-line arguments.
    #[must_use]
    pub fn build_args(&self) -> Vec<String> {
        self.args.clone()
    }
}

/// A running child process owned by the supervisor.
#[derive(Debug)]
pub struct ManagedChild {
    name: String,
    child: Child,
}

impl ManagedChild {
    /// Spawn the configured process with piped output.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError` if the process fails to spawn.
    pub fn spawn(builder: &ProcessBuilder) -> Result<Self, SpawnError> {
        let mut cmd = Command::new(&builder.binary);
        cmd.args(builder.build_args())
            .envs(&builder.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| SpawnError::from_io(&builder.binary, e))?;

        tracing::info!(
            process = %builder.name,
            binary = %builder.binary.display(),
            pid = ?child.id(),
            "Spawned process"
        );

        Ok(Self {
            name: builder.name.clone(),
            child,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Forward stdout and stderr lines into the log.
    ///
    /// Can only be done once; later calls are no-ops.
    pub fn forward_output(&mut self) {
        if let Some(stdout) = self.child.stdout.take() {
            tokio::spawn(forward_lines(self.name.clone(), "stdout", stdout));
        }
        if let Some(stderr) = self.child.stderr.take() {
            tokio::spawn(forward_lines(self.name.clone(), "stderr", stderr));
        }
    }

    /// Get the process ID, if still running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Check if the process has exited without blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the process state cannot be queried.
    pub fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Wait for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Forcefully kill the process.
    ///
    /// # Errors
    ///
    /// Returns an error if the kill signal cannot be sent.
    pub async fn kill(&mut self) -> std::io::Result<()> {
        self.child.kill().await
    }

    /// Attempt graceful termination with a timeout.
    ///
    /// On Unix, sends SIGTERM first, then SIGKILL after the timeout.
    /// On other platforms, falls back to immediate kill.
    ///
    /// # Errors
    ///
    /// Returns an error if termination fails.
    pub async fn graceful_terminate(&mut self, timeout: Duration) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            self.graceful_terminate_unix(timeout).await
        }

        #[cfg(not(unix))]
        {
            let _ = timeout;
            self.kill().await
        }
    }

    #[cfg(unix)]
    async fn graceful_terminate_unix(&mut self, timeout: Duration) -> std::io::Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(pid) = self.id() else {
            // Already reaped
            return Ok(());
        };

        let nix_pid = Pid::from_raw(i32::try_from(pid).unwrap_or(i32::MAX));
        if let Err(e) = kill(nix_pid, Signal::SIGTERM) {
            tracing::debug!(process = %self.name, error = %e, "SIGTERM failed");
        }

        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(process = %self.name, %status, "Process exited after SIGTERM");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                tracing::warn!(
                    process = %self.name,
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    "Process ignored SIGTERM, killing"
                );
                self.child.kill().await
            }
        }
    }
}

async fn forward_lines<R>(process: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => tracing::debug!(process = %process, stream, "{line}"),
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(process = %process, stream, error = %e, "Output read error");
                break;
            }
        }
    }
}
