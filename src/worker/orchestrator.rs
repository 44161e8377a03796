//! Still capture orchestration.
//!
//! One request is in flight at a time. The hardware answers through a
//! single-use [`PhotoReply`], so a result can only ever reach the request
//! that asked for it.

use crate::capture::{
    CaptureSession, CaptureSettings, CapturedFrame, Frame, PhotoReply, RawPhoto, SessionBackend,
};
use crate::orientation::{downscale, normalize};
use crate::SessionError;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// A capture request awaiting its hardware result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCaptureRequest {
    /// Identifier echoed back in the delivered frame.
    pub id: u64,
    /// When the request was issued to the hardware.
    pub requested_at: DateTime<Utc>,
    /// Settings the capture was issued with.
    pub settings: CaptureSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OrchestratorState {
    Idle,
    AwaitingResult(PendingCaptureRequest),
}

#[derive(Debug)]
pub(crate) struct CaptureOrchestrator {
    state: OrchestratorState,
    next_request_id: u64,
}

impl CaptureOrchestrator {
    pub(crate) fn new() -> Self {
        Self {
            state: OrchestratorState::Idle,
            next_request_id: 1,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &OrchestratorState {
        &self.state
    }

    /// Issues one capture and blocks the worker thread until it completes.
    pub(crate) fn capture<B: SessionBackend>(
        &mut self,
        session: &mut CaptureSession<B>,
        settings: CaptureSettings,
    ) -> Result<CapturedFrame, SessionError> {
        if !session.state().is_running() {
            return Err(SessionError::NotRunning);
        }
        settings.validate()?;
        let input = session
            .attached_input()
            .cloned()
            .ok_or_else(|| SessionError::CaptureFailed("no camera attached".into()))?;

        debug_assert_eq!(self.state, OrchestratorState::Idle);
        let request = PendingCaptureRequest {
            id: self.next_request_id,
            requested_at: Utc::now(),
            settings,
        };
        self.next_request_id += 1;

        let (reply, rx) = PhotoReply::channel(request.id);
        self.state = OrchestratorState::AwaitingResult(request.clone());
        debug!(request_id = request.id, position = %input.position, "Capture issued");
        session.capture_photo(&request.settings, reply);

        let outcome = rx.blocking_recv();
        self.state = OrchestratorState::Idle;

        let raw = match outcome {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(SessionError::CaptureFailed(e.to_string())),
            Err(_) => {
                return Err(SessionError::CaptureFailed(
                    "capture completion was dropped".into(),
                ))
            }
        };

        let frame = self.normalize_raw(raw, &request)?;
        debug!(
            request_id = request.id,
            width = frame.width(),
            height = frame.height(),
            latency_ms = (Utc::now() - request.requested_at).num_milliseconds(),
            "Capture normalized"
        );
        Ok(CapturedFrame::normalized(
            frame,
            input.position,
            input.device_id,
            request.id,
        ))
    }

    fn normalize_raw(
        &self,
        raw: RawPhoto,
        request: &PendingCaptureRequest,
    ) -> Result<Frame, SessionError> {
        if raw.frame.width() == 0 || raw.frame.height() == 0 || !raw.frame.is_valid() {
            return Err(SessionError::CaptureFailed(format!(
                "malformed pixel buffer: {:?}",
                raw.frame
            )));
        }
        if raw.orientation.is_mirrored() {
            warn!(
                request_id = request.id,
                orientation = ?raw.orientation,
                "Hardware returned a mirrored photo, unmirroring"
            );
        }

        let upright = normalize(&raw.frame, raw.orientation);
        Ok(match request.settings.max_dimension {
            Some(max) => downscale(&upright, max),
            None => upright,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{MockBackend, PhotoOutput, Position, SessionState, StaticDiscovery};
    use crate::orientation::Orientation;
    use crate::worker::switch::switch_input;

    fn running_session(position: Position) -> (CaptureSession<MockBackend>, MockBackend) {
        let backend = MockBackend::new();
        let probe = backend.clone();
        let mut session = CaptureSession::new(backend);
        let mut discovery = StaticDiscovery::front_and_back();
        switch_input(&mut session, &mut discovery, position).unwrap();
        session
            .ensure_output(PhotoOutput {
                high_resolution: true,
            })
            .unwrap();
        session.transition(SessionState::Configuring);
        session.start_running().unwrap();
        session.transition(SessionState::Running);
        (session, probe)
    }

    fn assert_upright_scene(captured: &CapturedFrame, width: u32, height: u32) {
        assert_eq!(captured.frame(), &MockBackend::scene(width, height));
        assert_eq!(captured.orientation(), Orientation::Up);
        assert!(!captured.mirrored());
    }

    #[test]
    fn test_not_running_is_rejected_before_hardware() {
        let backend = MockBackend::new();
        let probe = backend.clone();
        let mut session = CaptureSession::new(backend);
        let mut orchestrator = CaptureOrchestrator::new();

        let err = orchestrator
            .capture(&mut session, CaptureSettings::default())
            .unwrap_err();
        assert!(matches!(err, SessionError::NotRunning));
        assert_eq!(probe.stats().captures, 0);
    }

    #[test]
    fn test_capture_normalizes_rotation() {
        let (mut session, _probe) = running_session(Position::Back);
        let mut orchestrator = CaptureOrchestrator::new();

        let captured = orchestrator
            .capture(&mut session, CaptureSettings::default())
            .unwrap();
        assert_upright_scene(&captured, 8, 6);
        assert_eq!(captured.position(), Position::Back);
        assert_eq!(orchestrator.state(), &OrchestratorState::Idle);
    }

    #[test]
    fn test_front_capture_is_unmirrored_even_if_hardware_mirrors() {
        let (mut session, probe) = running_session(Position::Front);
        probe.set_ignore_capture_mirroring(true);
        let mut orchestrator = CaptureOrchestrator::new();

        let captured = orchestrator
            .capture(&mut session, CaptureSettings::default())
            .unwrap();
        assert_upright_scene(&captured, 8, 6);
        assert_eq!(captured.position(), Position::Front);
    }

    #[test]
    fn test_request_ids_increase() {
        let (mut session, _probe) = running_session(Position::Back);
        let mut orchestrator = CaptureOrchestrator::new();

        let first = orchestrator
            .capture(&mut session, CaptureSettings::default())
            .unwrap();
        let second = orchestrator
            .capture(&mut session, CaptureSettings::default())
            .unwrap();
        assert!(second.request_id() > first.request_id());
    }

    #[test]
    fn test_hardware_failure_returns_to_idle() {
        let (mut session, probe) = running_session(Position::Back);
        probe.fail_next_capture("sensor timeout");
        let mut orchestrator = CaptureOrchestrator::new();

        let err = orchestrator
            .capture(&mut session, CaptureSettings::default())
            .unwrap_err();
        assert!(matches!(err, SessionError::CaptureFailed(ref r) if r.contains("sensor timeout")));
        assert_eq!(orchestrator.state(), &OrchestratorState::Idle);

        // No automatic retry: exactly one hardware capture was issued.
        assert_eq!(probe.stats().captures, 1);
    }

    #[test]
    fn test_dropped_completion_is_a_failure() {
        let (mut session, probe) = running_session(Position::Back);
        probe.drop_next_capture();
        let mut orchestrator = CaptureOrchestrator::new();

        assert!(matches!(
            orchestrator.capture(&mut session, CaptureSettings::default()),
            Err(SessionError::CaptureFailed(_))
        ));
    }

    #[test]
    fn test_late_completion_from_other_thread() {
        let (mut session, probe) = running_session(Position::Back);
        probe.set_completion_delay(Some(std::time::Duration::from_millis(20)));
        let mut orchestrator = CaptureOrchestrator::new();

        let captured = orchestrator
            .capture(&mut session, CaptureSettings::default())
            .unwrap();
        assert_upright_scene(&captured, 8, 6);
    }

    #[test]
    fn test_max_dimension_downscales() {
        let (mut session, _probe) = running_session(Position::Back);
        let mut orchestrator = CaptureOrchestrator::new();

        let captured = orchestrator
            .capture(&mut session, CaptureSettings::with_max_dimension(4))
            .unwrap();
        assert_eq!((captured.frame().width(), captured.frame().height()), (4, 3));
        // Decimation keeps upright coordinates: pixel (1, 1) samples scene (2, 2).
        assert_eq!(captured.frame().pixel(1, 1), &[2, 2, 0xAB]);
    }

    #[test]
    fn test_empty_frame_is_a_failure() {
        let (mut session, probe) = running_session(Position::Back);
        probe.set_sensor_orientation(Orientation::Up);
        probe.set_scene_size(0, 10);
        let mut orchestrator = CaptureOrchestrator::new();

        let result = orchestrator.capture(&mut session, CaptureSettings::with_max_dimension(4));
        assert!(matches!(result, Err(SessionError::CaptureFailed(_))));
        assert_eq!(orchestrator.state(), &OrchestratorState::Idle);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let (mut session, probe) = running_session(Position::Back);
        let mut orchestrator = CaptureOrchestrator::new();

        assert!(matches!(
            orchestrator.capture(&mut session, CaptureSettings::with_max_dimension(0)),
            Err(SessionError::InvalidSettings(_))
        ));
        assert_eq!(probe.stats().captures, 0);
    }
}
