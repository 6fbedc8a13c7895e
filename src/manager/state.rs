//! Mutable state owned by the sandbox manager.

use std::path::PathBuf;

use crate::sandbox::macos::LogMonitor;
use crate::violation::{violation_channel, ViolationSender, ViolationStream};

/// Lifecycle of the violation monitor.
pub enum MonitorState {
    /// Not started yet; the first wrap call starts it.
    Idle,
    /// Tailing the system log.
    Running(LogMonitor),
    /// Disabled, failed to start, or stopped. Never retried.
    Unavailable,
}

impl MonitorState {
    pub fn is_running(&self) -> bool {
        matches!(self, MonitorState::Running(monitor) if monitor.is_running())
    }
}

/// Internal state for the sandbox manager.
pub struct ManagerState {
    /// Violation monitor.
    pub monitor: MonitorState,

    /// Producer side of the violation channel. Dropped on dispose.
    pub violation_tx: Option<ViolationSender>,

    /// Consumer side, until the caller takes it.
    pub violation_stream: Option<ViolationStream>,

    /// Policy files written by this manager.
    pub policy_files: Vec<PathBuf>,

    /// Whether dispose has run.
    pub disposed: bool,
}

impl Default for ManagerState {
    fn default() -> Self {
        let (tx, stream) = violation_channel();
        Self {
            monitor: MonitorState::Idle,
            violation_tx: Some(tx),
            violation_stream: Some(stream),
            policy_files: Vec::new(),
            disposed: false,
        }
    }
}

impl ManagerState {
    /// Create a new manager state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the state disposed and hand back what must be released outside the lock.
    pub fn begin_dispose(&mut self) -> Option<(MonitorState, Vec<PathBuf>)> {
        if self.disposed {
            return None;
        }

        self.disposed = true;
        self.violation_tx = None;
        let monitor = std::mem::replace(&mut self.monitor, MonitorState::Unavailable);
        Some((monitor, std::mem::take(&mut self.policy_files)))
    }
}
