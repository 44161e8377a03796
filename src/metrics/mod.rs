//! Prometheus metrics exporter for session monitoring.
//!
//! Metrics are derived from the [`SessionSnapshot`](crate::worker::SessionSnapshot)
//! the worker publishes, so exporting never touches the worker itself.
//!
//! # Metrics Exposed
//!
//! ## Session Gauges
//! - `camera_session_running` - 1 while the session is running
//! - `camera_session_front_facing` - 1 while the front camera is active
//! - `camera_session_input_attached` - 1 while a camera is attached
//!
//! ## Counters
//! - `camera_session_starts_total`, `camera_session_stops_total`
//! - `camera_session_switches_total`, `camera_session_switch_failures_total`,
//!   `camera_session_rollbacks_total`
//! - `camera_session_captures_total`, `camera_session_capture_failures_total`,
//!   `camera_session_rejected_captures_total`
//!
//! # Example
//!
//! ```no_run
//! use camera_session::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     running: true,
//!     captures: 3,
//!     ..Default::default()
//! };
//!
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
