//! Capture session lifecycle states.

use serde::Serialize;
use std::fmt;

/// Lifecycle state of a capture session.
///
/// ```text
/// Uninitialized ──start──▶ Configuring ──ok──▶ Running
///       ▲                      │                  │
///       └──────── failed ──────┘                stop
///       ▲                                         ▼
///       └─────────────── halted ───────────── Stopping
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Not producing frames. Input and output may still be attached.
    Uninitialized,
    /// Inside a start sequence.
    Configuring,
    /// Producing frames; captures are accepted.
    Running,
    /// Inside a stop sequence.
    Stopping,
}

impl SessionState {
    /// Returns true if the lifecycle allows moving from `self` to `to`.
    pub fn can_transition_to(self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (Uninitialized, Configuring)
                | (Stopping, Configuring)
                | (Configuring, Running)
                | (Configuring, Uninitialized)
                | (Running, Stopping)
                | (Stopping, Uninitialized)
        )
    }

    /// Whether captures are accepted in this state.
    #[inline]
    pub fn is_running(self) -> bool {
        self == SessionState::Running
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Configuring => "configuring",
            SessionState::Running => "running",
            SessionState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::SessionState::*;

    #[test]
    fn test_start_path() {
        assert!(Uninitialized.can_transition_to(Configuring));
        assert!(Configuring.can_transition_to(Running));
        assert!(Stopping.can_transition_to(Configuring));
    }

    #[test]
    fn test_stop_path() {
        assert!(Running.can_transition_to(Stopping));
        assert!(Stopping.can_transition_to(Uninitialized));
        assert!(!Running.can_transition_to(Uninitialized));
    }

    #[test]
    fn test_no_shortcuts() {
        assert!(!Uninitialized.can_transition_to(Running));
        assert!(!Running.can_transition_to(Configuring));
        assert!(!Uninitialized.can_transition_to(Stopping));
    }

    #[test]
    fn test_only_running_captures() {
        assert!(Running.is_running());
        for state in [Uninitialized, Configuring, Stopping] {
            assert!(!state.is_running());
        }
    }
}
