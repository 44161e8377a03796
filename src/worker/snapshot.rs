//! Immutable views of worker state published to callers.

use crate::capture::{DeviceInput, Position, SessionState};
use crate::orientation::ConnectionSettings;
use serde::Serialize;

/// Running totals of worker operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Transitions into `Running`.
    pub starts: u64,
    /// Transitions out of `Running`.
    pub stops: u64,
    /// Switches that changed the attached camera.
    pub switches: u64,
    /// Switches that reported an error.
    pub switch_failures: u64,
    /// Failed switches where the previous camera was re-attached.
    pub rollbacks: u64,
    /// Captures delivered to callers.
    pub captures: u64,
    /// Captures that failed in hardware.
    pub capture_failures: u64,
    /// Captures refused because the session was not running.
    pub rejected_captures: u64,
}

/// Point-in-time view of the session, published after every command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Lifecycle state of the session.
    pub state: SessionState,
    /// Position of the attached camera, or the last known-good one.
    pub position: Position,
    /// Attached camera, if any.
    pub device: Option<DeviceInput>,
    /// Whether the photo output is attached.
    pub output_attached: bool,
    /// Settings last applied to the preview connection.
    pub preview: Option<ConnectionSettings>,
    /// Settings last applied to the photo output connection.
    pub capture: Option<ConnectionSettings>,
    /// Operation counters.
    pub stats: SessionStats,
    /// Set once the worker has released the hardware.
    pub released: bool,
}

impl SessionSnapshot {
    pub(crate) fn initial(position: Position) -> Self {
        Self {
            state: SessionState::Uninitialized,
            position,
            device: None,
            output_attached: false,
            preview: None,
            capture: None,
            stats: SessionStats::default(),
            released: false,
        }
    }

    /// Whether captures would currently be accepted.
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }
}
