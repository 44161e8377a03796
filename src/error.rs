//! Errors reported to callers of the session handle.

use crate::capture::{ConfigError, HardwareError, Position};
use thiserror::Error;

/// Errors returned by session operations.
///
/// None of these are fatal: after any of them the session is either still
/// usable or has been rolled back to its last usable configuration.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No camera exists at the requested position.
    #[error("no camera available at the {position} position")]
    DeviceUnavailable {
        /// Position that was requested.
        position: Position,
    },

    /// The session refused an input or output. `restored` is the position
    /// of the camera still attached afterwards, if any.
    #[error("failed to attach {position} camera: {reason}")]
    AttachFailed {
        /// Position that was requested.
        position: Position,
        /// Position of the camera attached afterwards.
        restored: Option<Position>,
        /// Hardware reason for the refusal.
        reason: String,
    },

    /// A capture was requested while the session was not running.
    #[error("capture requested while the session is not running")]
    NotRunning,

    /// The hardware accepted a capture and then failed it.
    #[error("capture failed: {0}")]
    CaptureFailed(String),

    /// Capture settings failed validation.
    #[error("invalid capture settings: {0}")]
    InvalidSettings(#[from] ConfigError),

    /// A hardware fault outside attach and capture (commit, start).
    #[error("hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// The worker has been released or has exited.
    #[error("camera session has been released")]
    SessionClosed,

    /// The worker thread could not be started.
    #[error("failed to spawn session worker: {0}")]
    Spawn(#[from] std::io::Error),
}

impl SessionError {
    /// Whether the error came from the camera hardware rather than from
    /// how the session was used.
    pub fn is_hardware_fault(&self) -> bool {
        matches!(
            self,
            SessionError::AttachFailed { .. }
                | SessionError::CaptureFailed(_)
                | SessionError::Hardware(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_position() {
        let err = SessionError::DeviceUnavailable {
            position: Position::Front,
        };
        assert_eq!(err.to_string(), "no camera available at the front position");

        let err = SessionError::AttachFailed {
            position: Position::Front,
            restored: Some(Position::Back),
            reason: "busy".into(),
        };
        assert_eq!(err.to_string(), "failed to attach front camera: busy");
    }

    #[test]
    fn test_usage_errors_are_not_hardware_faults() {
        assert!(!SessionError::NotRunning.is_hardware_fault());
        assert!(!SessionError::SessionClosed.is_hardware_fault());
        assert!(SessionError::CaptureFailed("x".into()).is_hardware_fault());
    }
}
