//! Capture session resource and the hardware seam beneath it.
//!
//! [`SessionBackend`] is what a platform camera stack implements. The
//! [`CaptureSession`] wrapper adds the bookkeeping the coordinator relies
//! on: lifecycle state, the single attached input and output, and the
//! settings last applied to each connection.

use super::{CaptureSettings, DeviceInput, RawPhoto, SessionState};
use crate::orientation::{ConnectionKind, ConnectionSettings};
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors reported by the camera hardware.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HardwareError {
    /// The session refused the input.
    #[error("session rejected input: {0}")]
    InputRejected(String),
    /// The session refused the photo output.
    #[error("session rejected output: {0}")]
    OutputRejected(String),
    /// The device itself reported a fault.
    #[error("device fault: {0}")]
    DeviceFault(String),
    /// A configuration block could not be committed.
    #[error("failed to commit configuration: {0}")]
    CommitFailed(String),
    /// The hardware did not start running.
    #[error("failed to start session: {0}")]
    StartFailed(String),
    /// A still capture failed after it was accepted.
    #[error("capture failed: {0}")]
    CaptureFailed(String),
}

/// The photo sink attached to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoOutput {
    /// Whether the sink is configured for full sensor resolution.
    pub high_resolution: bool,
}

/// Single-use completion for one capture request.
///
/// Completing consumes the reply, so a backend can deliver at most one
/// result per request. Dropping it without completing is reported to the
/// orchestrator as a failed capture.
#[derive(Debug)]
pub struct PhotoReply {
    request_id: u64,
    tx: oneshot::Sender<Result<RawPhoto, HardwareError>>,
}

pub(crate) type PhotoReceiver = oneshot::Receiver<Result<RawPhoto, HardwareError>>;

impl PhotoReply {
    pub(crate) fn channel(request_id: u64) -> (Self, PhotoReceiver) {
        let (tx, rx) = oneshot::channel();
        (Self { request_id, tx }, rx)
    }

    /// Identifier of the request being answered.
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Delivers the capture result.
    pub fn complete(self, result: Result<RawPhoto, HardwareError>) {
        if self.tx.send(result).is_err() {
            tracing::debug!(request_id = self.request_id, "Capture result had no receiver");
        }
    }
}

/// Platform camera stack driven by a [`CaptureSession`].
///
/// Every method is called from the session worker thread only, one call at
/// a time. Calls may block.
pub trait SessionBackend: Send + 'static {
    /// Opens a configuration block. Changes become visible at commit.
    fn begin_configuration(&mut self);

    /// Closes the configuration block and applies the changes.
    fn commit_configuration(&mut self) -> Result<(), HardwareError>;

    /// Whether the session would accept `input` right now.
    fn can_add_input(&self, input: &DeviceInput) -> bool;

    /// Attaches `input` to the session.
    fn add_input(&mut self, input: &DeviceInput) -> Result<(), HardwareError>;

    /// Detaches `input` from the session.
    fn remove_input(&mut self, input: &DeviceInput);

    /// Attaches the photo sink.
    fn add_output(&mut self, output: &PhotoOutput) -> Result<(), HardwareError>;

    /// Detaches the photo sink.
    fn remove_output(&mut self, output: &PhotoOutput);

    /// Applies orientation and mirroring to one connection.
    ///
    /// Hardware may treat the mirror flag on the capture connection as a
    /// hint; the orchestrator re-normalizes every photo regardless.
    fn configure_connection(&mut self, kind: ConnectionKind, settings: ConnectionSettings);

    /// Starts the flow of frames.
    fn start_running(&mut self) -> Result<(), HardwareError>;

    /// Halts the flow of frames.
    fn stop_running(&mut self);

    /// Issues a still capture. The result goes through `reply`, possibly
    /// from another thread.
    fn capture_photo(&mut self, settings: &CaptureSettings, reply: PhotoReply);
}

/// The hardware resource plus the state the coordinator tracks for it.
pub struct CaptureSession<B> {
    backend: B,
    state: SessionState,
    configuring: bool,
    attached_input: Option<DeviceInput>,
    attached_output: Option<PhotoOutput>,
    preview: Option<ConnectionSettings>,
    capture: Option<ConnectionSettings>,
}

impl<B: SessionBackend> CaptureSession<B> {
    /// Wraps a backend with nothing attached.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: SessionState::Uninitialized,
            configuring: false,
            attached_input: None,
            attached_output: None,
            preview: None,
            capture: None,
        }
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The attached camera, if any.
    #[inline]
    pub fn attached_input(&self) -> Option<&DeviceInput> {
        self.attached_input.as_ref()
    }

    /// The attached photo sink, if any.
    #[inline]
    pub fn attached_output(&self) -> Option<&PhotoOutput> {
        self.attached_output.as_ref()
    }

    /// Settings last applied to the live preview connection.
    #[inline]
    pub fn preview_connection(&self) -> Option<ConnectionSettings> {
        self.preview
    }

    /// Settings last applied to the photo output connection.
    #[inline]
    pub fn capture_connection(&self) -> Option<ConnectionSettings> {
        self.capture
    }

    pub(crate) fn transition(&mut self, to: SessionState) {
        debug_assert!(
            self.state.can_transition_to(to),
            "invalid session transition {:?} -> {:?}",
            self.state,
            to
        );
        tracing::trace!(from = ?self.state, to = ?to, "Session state transition");
        self.state = to;
    }

    /// Runs `f` inside a begin/commit configuration block.
    ///
    /// The block is always committed. A commit failure is reported only if
    /// `f` itself succeeded.
    pub(crate) fn configure<T, E>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<HardwareError>,
    {
        debug_assert!(!self.configuring, "nested configuration block");
        self.configuring = true;
        self.backend.begin_configuration();

        let result = f(self);

        self.configuring = false;
        let committed = self.backend.commit_configuration();
        match (result, committed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), _) => Err(e),
        }
    }

    pub(crate) fn add_input(&mut self, input: &DeviceInput) -> Result<(), HardwareError> {
        if !self.backend.can_add_input(input) {
            return Err(HardwareError::InputRejected(format!(
                "cannot add {} ({})",
                input.device_id, input.position
            )));
        }
        self.backend.add_input(input)
    }

    pub(crate) fn remove_input(&mut self, input: &DeviceInput) {
        self.backend.remove_input(input);
    }

    pub(crate) fn set_attached_input(&mut self, input: Option<DeviceInput>) {
        self.attached_input = input;
    }

    pub(crate) fn take_attached_input(&mut self) -> Option<DeviceInput> {
        self.attached_input.take()
    }

    /// Attaches the photo sink unless one is already attached. Returns
    /// whether a new sink was attached.
    pub(crate) fn ensure_output(&mut self, output: PhotoOutput) -> Result<bool, HardwareError> {
        if self.attached_output.is_some() {
            return Ok(false);
        }
        self.backend.add_output(&output)?;
        self.attached_output = Some(output);
        Ok(true)
    }

    pub(crate) fn detach_output(&mut self) {
        if let Some(output) = self.attached_output.take() {
            self.backend.remove_output(&output);
        }
    }

    pub(crate) fn apply_connection(&mut self, kind: ConnectionKind, settings: ConnectionSettings) {
        self.backend.configure_connection(kind, settings);
        match kind {
            ConnectionKind::Preview => self.preview = Some(settings),
            ConnectionKind::Capture => self.capture = Some(settings),
        }
    }

    pub(crate) fn start_running(&mut self) -> Result<(), HardwareError> {
        self.backend.start_running()
    }

    pub(crate) fn stop_running(&mut self) {
        self.backend.stop_running();
    }

    pub(crate) fn capture_photo(&mut self, settings: &CaptureSettings, reply: PhotoReply) {
        self.backend.capture_photo(settings, reply);
    }
}

impl<B> std::fmt::Debug for CaptureSession<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("state", &self.state)
            .field("attached_input", &self.attached_input)
            .field("attached_output", &self.attached_output)
            .field("preview", &self.preview)
            .field("capture", &self.capture)
            .finish()
    }
}
