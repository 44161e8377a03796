//! Session and capture configuration.
//!
//! Everything here is plain data loaded from TOML. Validation happens on
//! load and again before every capture request is dispatched.

use super::{DeviceInput, Position};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Flash behaviour for a still capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    /// Never fire.
    #[default]
    Off,
    /// Always fire.
    On,
    /// Fire when the scene is dark.
    Auto,
}

/// Trade-off between capture latency and image quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPrioritization {
    /// Lowest latency.
    Speed,
    /// Hardware default.
    #[default]
    Balanced,
    /// Best image quality.
    Quality,
}

/// Per-request still capture settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Flash behaviour.
    pub flash: FlashMode,
    /// Latency/quality trade-off passed to the hardware.
    pub quality: QualityPrioritization,
    /// Longest edge of the delivered frame in pixels. `None` keeps the
    /// sensor resolution.
    pub max_dimension: Option<u32>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            flash: FlashMode::Off,
            quality: QualityPrioritization::Balanced,
            max_dimension: None,
        }
    }
}

impl CaptureSettings {
    /// Creates settings that cap the delivered frame size.
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: Some(max_dimension),
            ..Default::default()
        }
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dimension == Some(0) {
            return Err(ConfigError::InvalidMaxDimension);
        }
        Ok(())
    }
}

/// Configuration of the session worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Camera attached by the first `start()`.
    pub default_position: Position,
    /// Attach the photo output with full sensor resolution enabled.
    pub high_resolution_capture: bool,
    /// Name of the worker thread.
    pub worker_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_position: Position::Back,
            high_resolution_capture: true,
            worker_name: "camera-session".to_string(),
        }
    }
}

impl SessionConfig {
    /// Creates a configuration starting on the given camera.
    pub fn with_default_position(position: Position) -> Self {
        Self {
            default_position: position,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_name.trim().is_empty() {
            return Err(ConfigError::EmptyWorkerName);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// `max_dimension` was zero.
    #[error("max_dimension must be at least 1 pixel")]
    InvalidMaxDimension,
    /// `worker_name` was blank.
    #[error("worker thread name must not be empty")]
    EmptyWorkerName,
    /// Two devices share an id.
    #[error("duplicate device id in device list: {0}")]
    DuplicateDevice(String),
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// Worker settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Settings used for every capture the driver takes.
    #[serde(default)]
    pub capture: CaptureSettings,
    /// Simulated cameras for the driver binary.
    #[serde(default = "default_devices")]
    pub devices: Vec<DeviceInput>,
    /// Metrics exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            capture: CaptureSettings::default(),
            devices: default_devices(),
            metrics: MetricsConfig::default(),
        }
    }
}

fn default_devices() -> Vec<DeviceInput> {
    vec![
        DeviceInput::new("back-wide-0", Position::Back, "Back Wide Camera"),
        DeviceInput::new("front-0", Position::Front, "Front Camera"),
    ]
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Metrics server port (0 to disable).
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { port: 9090 }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;
        self.capture.validate()?;
        for (i, device) in self.devices.iter().enumerate() {
            if self.devices[..i]
                .iter()
                .any(|other| other.same_device(device))
            {
                return Err(ConfigError::DuplicateDevice(device.device_id.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.default_position, Position::Back);
    }

    #[test]
    fn test_zero_max_dimension_invalid() {
        let settings = CaptureSettings::with_max_dimension(0);
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidMaxDimension)
        ));
    }

    #[test]
    fn test_parse_full_file() {
        let text = r#"
            [session]
            default_position = "front"

            [capture]
            flash = "auto"
            quality = "speed"
            max_dimension = 1024

            [[devices]]
            device_id = "front-0"
            position = "front"
            name = "Selfie"

            [metrics]
            port = 0
        "#;

        let config = FileConfig::from_toml(text).unwrap();
        assert_eq!(config.session.default_position, Position::Front);
        assert!(config.session.high_resolution_capture);
        assert_eq!(config.capture.flash, FlashMode::Auto);
        assert_eq!(config.capture.quality, QualityPrioritization::Speed);
        assert_eq!(config.capture.max_dimension, Some(1024));
        assert_eq!(config.devices.len(), 1);
        assert_eq!(config.metrics.port, 0);
    }

    #[test]
    fn test_missing_devices_uses_defaults() {
        let config = FileConfig::from_toml("").unwrap();
        assert_eq!(config.devices.len(), 2);
    }

    #[test]
    fn test_duplicate_devices_rejected() {
        let text = r#"
            [[devices]]
            device_id = "cam"
            position = "front"

            [[devices]]
            device_id = "cam"
            position = "back"
        "#;
        assert!(matches!(
            FileConfig::from_toml(text),
            Err(ConfigError::DuplicateDevice(id)) if id == "cam"
        ));
    }

    #[test]
    fn test_malformed_file() {
        assert!(matches!(
            FileConfig::from_toml("session = 3"),
            Err(ConfigError::ParseError(_))
        ));
    }
}
