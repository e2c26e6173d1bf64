//! Per-process lifecycle state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle state of one managed process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
    Error,
}

impl ProcessState {
    /// Whether `self -> next` is a legal transition.
    ///
    /// `Error` is reachable from everywhere; a process in `Error` may be
    /// started again or marked stopped once cleaned up.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use ProcessState::{Error, Running, Starting, Stopped, Stopping};

        matches!(
            (self, next),
            (_, Error)
                | (Stopped | Error, Starting)
                | (Starting, Running)
                | (Running | Starting | Error, Stopping)
                | (Stopping | Running | Error, Stopped)
        )
    }
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Reported status of one managed process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStatus {
    pub state: ProcessState,
    /// OS pid while a live child exists.
    pub pid: Option<u32>,
}

impl ProcessStatus {
    #[must_use]
    pub fn stopped() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn running(pid: Option<u32>) -> Self {
        Self {
            state: ProcessState::Running,
            pid,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == ProcessState::Running
    }
}

/// Rejected state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: ProcessState,
    pub to: ProcessState,
}

/// Tracks the lifecycle of one managed process.
#[derive(Debug, Clone)]
pub struct ProcessStateMachine {
    name: &'static str,
    state: ProcessState,
    starts: usize,
}

impl ProcessStateMachine {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: ProcessState::Stopped,
            starts: 0,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Number of times the process reached `Running`.
    #[must_use]
    pub fn starts(&self) -> usize {
        self.starts
    }

    /// Move to `next`, rejecting illegal transitions.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if `next` is not reachable from the current state.
    pub fn transition(&mut self, next: ProcessState) -> Result<(), InvalidTransition> {
        if self.state == next {
            return Ok(());
        }
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(process = self.name, from = %self.state, to = %next, "State transition");
        if next == ProcessState::Running {
            self.starts = self.starts.saturating_add(1);
        }
        self.state = next;
        Ok(())
    }

    /// Record a failure. Always legal.
    pub fn fail(&mut self) {
        tracing::debug!(process = self.name, from = %self.state, "State transition to error");
        self.state = ProcessState::Error;
    }
}
