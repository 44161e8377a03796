//! Orientation and mirroring policy for session connections.
//!
//! | Connection | Orientation | Mirrored                 |
//! |------------|-------------|--------------------------|
//! | Preview    | upright     | iff the camera is front  |
//! | Capture    | upright     | never                    |
//!
//! The preview mirrors a front camera so it behaves like a mirror. Saved
//! photos never mirror, so text in frame reads correctly whichever camera
//! took them.

use super::Orientation;
use crate::capture::Position;
use serde::Serialize;

/// The two connections a session drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    /// Live preview rendered to the screen.
    Preview,
    /// Photo output delivering still captures.
    Capture,
}

/// Orientation and mirroring applied to one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionSettings {
    /// Fixed output orientation.
    pub orientation: Orientation,
    /// Horizontal mirroring.
    pub mirrored: bool,
}

/// Returns the settings for `kind` when the camera at `position` is attached.
pub fn connection_settings(kind: ConnectionKind, position: Position) -> ConnectionSettings {
    let mirrored = match kind {
        ConnectionKind::Preview => position == Position::Front,
        ConnectionKind::Capture => false,
    };
    ConnectionSettings {
        orientation: Orientation::Up,
        mirrored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_mirrors_front_only() {
        assert!(connection_settings(ConnectionKind::Preview, Position::Front).mirrored);
        assert!(!connection_settings(ConnectionKind::Preview, Position::Back).mirrored);
    }

    #[test]
    fn test_capture_never_mirrors() {
        for position in [Position::Front, Position::Back] {
            let settings = connection_settings(ConnectionKind::Capture, position);
            assert!(!settings.mirrored);
            assert_eq!(settings.orientation, Orientation::Up);
        }
    }

    #[test]
    fn test_always_upright() {
        for kind in [ConnectionKind::Preview, ConnectionKind::Capture] {
            for position in [Position::Front, Position::Back] {
                assert_eq!(
                    connection_settings(kind, position).orientation,
                    Orientation::Up
                );
            }
        }
    }
}
