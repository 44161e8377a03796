//! Physical camera identity and device discovery.
//!
//! A [`DeviceInput`] is a bound physical camera. Discovery resolves one for
//! a requested [`Position`]; the worker never constructs inputs itself.

use super::HardwareError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the handset a camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// User-facing camera.
    Front,
    /// World-facing camera.
    Back,
}

impl Position {
    /// Returns the position on the other side of the device.
    pub fn opposite(self) -> Self {
        match self {
            Position::Front => Position::Back,
            Position::Back => Position::Front,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::Back
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Front => f.write_str("front"),
            Position::Back => f.write_str("back"),
        }
    }
}

/// Stable identity of a physical camera.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wraps a backend-provided identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A physical camera bound for attachment to a capture session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInput {
    /// Stable device identity.
    pub device_id: DeviceId,
    /// Side of the handset the device faces.
    pub position: Position,
    /// Human readable device name.
    #[serde(default)]
    pub name: String,
}

impl DeviceInput {
    /// Creates an input for the given device.
    pub fn new(device_id: impl Into<String>, position: Position, name: impl Into<String>) -> Self {
        Self {
            device_id: DeviceId::new(device_id),
            position,
            name: name.into(),
        }
    }

    /// Returns true if both inputs refer to the same physical device.
    #[inline]
    pub fn same_device(&self, other: &DeviceInput) -> bool {
        self.device_id == other.device_id
    }
}

/// Resolves physical cameras by position.
///
/// `Ok(None)` means no camera exists for the position. `Err` means a camera
/// exists but an input could not be created for it (busy, permission
/// revoked, driver fault).
pub trait DeviceDiscovery: Send + 'static {
    /// Resolves the default device for `position`.
    fn resolve(&mut self, position: Position) -> Result<Option<DeviceInput>, HardwareError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_position() {
        assert_eq!(Position::Front.opposite(), Position::Back);
        assert_eq!(Position::Back.opposite(), Position::Front);
        assert_eq!(Position::default(), Position::Back);
    }

    #[test]
    fn test_same_device_ignores_name() {
        let a = DeviceInput::new("cam-0", Position::Back, "Wide");
        let b = DeviceInput::new("cam-0", Position::Back, "Wide (renamed)");
        let c = DeviceInput::new("cam-1", Position::Front, "Wide");

        assert!(a.same_device(&b));
        assert!(!a.same_device(&c));
    }

    #[test]
    fn test_position_serde_lowercase() {
        let input: DeviceInput =
            toml::from_str("device_id = \"cam-1\"\nposition = \"front\"\n").unwrap();
        assert_eq!(input.position, Position::Front);
        assert_eq!(input.device_id.as_str(), "cam-1");
        assert!(input.name.is_empty());
    }
}
