//! Camera Capture Session Coordinator
//!
//! Owns one camera capture session and serializes every operation on it:
//! starting, stopping, switching between the front and back cameras, and
//! taking still photos. Captured stills are always delivered upright and
//! unmirrored, whatever the hardware did.
//!
//! # Architecture
//!
//! All session work happens on one worker thread:
//!
//! ```text
//! SessionHandle ──commands──▶ SessionWorker ──▶ CaptureSession<B: SessionBackend>
//!      ▲                          │   │
//!      └──── oneshot replies ─────┘   └──▶ DeviceDiscovery
//!      └──── watch: position, snapshot
//! ```
//!
//! # Design Principles
//!
//! - **One owner**: only the worker touches the session, so configuration
//!   blocks never interleave
//! - **FIFO**: operations run in the order they were submitted
//! - **Roll back, don't break**: a failed switch leaves the previous camera
//!   attached whenever the hardware allows it
//! - **Normalize on delivery**: stills are rotated and unmirrored from their
//!   EXIF orientation before they reach the caller
//!
//! # Example
//!
//! ```no_run
//! use camera_session::{
//!     capture::{CaptureSettings, MockBackend, SessionConfig, StaticDiscovery},
//!     SessionWorker,
//! };
//!
//! # async fn demo() -> Result<(), camera_session::SessionError> {
//! let handle = SessionWorker::spawn(
//!     MockBackend::new(),
//!     StaticDiscovery::front_and_back(),
//!     SessionConfig::default(),
//! )?;
//!
//! handle.start().await?;
//! let photo = handle.capture_photo(CaptureSettings::default()).await?;
//! assert!(!photo.mirrored());
//!
//! let position = handle.switch_camera().await?;
//! println!("now using the {position} camera");
//!
//! handle.release().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod metrics;
pub mod orientation;
pub mod worker;

mod error;

// Re-export commonly used types at crate root
pub use capture::{
    CaptureSettings, CapturedFrame, DeviceDiscovery, DeviceInput, Frame, MockBackend, Position,
    SessionBackend, SessionConfig, SessionState, StaticDiscovery,
};
pub use error::SessionError;
pub use orientation::Orientation;
pub use worker::{SessionHandle, SessionSnapshot, SessionWorker};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
