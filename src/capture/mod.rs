//! Camera hardware abstraction.
//!
//! This module describes the physical side of the coordinator: device
//! identity and discovery, the session resource with its single input and
//! output, the pixel buffers it produces, and configuration. Nothing here
//! is thread-aware; serialization is the worker's job.

mod config;
mod device;
mod frame;
mod mock;
mod session;
mod state;

pub use config::{
    CaptureSettings, ConfigError, FileConfig, FlashMode, MetricsConfig, QualityPrioritization,
    SessionConfig,
};
pub use device::{DeviceDiscovery, DeviceId, DeviceInput, Position};
pub use frame::{CapturedFrame, Frame, PixelFormat, RawPhoto};
pub use mock::{MockBackend, MockStats, StaticDiscovery};
pub use session::{CaptureSession, HardwareError, PhotoOutput, PhotoReply, SessionBackend};
pub use state::SessionState;
