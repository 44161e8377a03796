//! Serialized ownership of the capture session.
//!
//! A [`SessionWorker`] runs on its own thread and is the only code that
//! touches the [`CaptureSession`](crate::capture::CaptureSession). Callers
//! talk to it through a [`SessionHandle`]: operations are queued in call
//! order and each resolves exactly once.

mod actor;
mod handle;
mod orchestrator;
mod snapshot;
mod switch;

pub use actor::SessionWorker;
pub use handle::{Pending, SessionHandle};
pub use orchestrator::PendingCaptureRequest;
pub use snapshot::{SessionSnapshot, SessionStats};
