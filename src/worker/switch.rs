//! Input resolution and attachment with rollback.
//!
//! Some sessions refuse to hold two inputs even inside a configuration
//! block. Switching therefore tries the direct attach first, then detaches
//! the old input and retries, and finally re-attaches the old input so the
//! session keeps a working camera. The momentary empty slot is only safe
//! because all of this runs on the worker thread.

use crate::capture::{CaptureSession, DeviceDiscovery, DeviceInput, Position, SessionBackend};
use crate::orientation::{connection_settings, ConnectionKind};
use crate::SessionError;
use tracing::{debug, info, warn};

/// Result of a successful switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SwitchOutcome {
    /// The resolved device was already attached.
    Unchanged(DeviceInput),
    /// A different device is now attached.
    Switched(DeviceInput),
}

impl SwitchOutcome {
    pub(crate) fn input(&self) -> &DeviceInput {
        match self {
            SwitchOutcome::Unchanged(input) | SwitchOutcome::Switched(input) => input,
        }
    }
}

/// Resolves a device for `position`.
///
/// `current` is reported as the restored position if resolution fails,
/// since nothing has been touched yet.
pub(crate) fn resolve_input<D: DeviceDiscovery>(
    discovery: &mut D,
    position: Position,
    current: Option<Position>,
) -> Result<DeviceInput, SessionError> {
    match discovery.resolve(position) {
        Ok(Some(input)) => {
            debug!(position = %position, device_id = %input.device_id, "Resolved camera");
            Ok(input)
        }
        Ok(None) => Err(SessionError::DeviceUnavailable { position }),
        Err(e) => Err(SessionError::AttachFailed {
            position,
            restored: current,
            reason: e.to_string(),
        }),
    }
}

/// Applies the orientation policy for `position` to both connections.
pub(crate) fn apply_orientation_policy<B: SessionBackend>(
    session: &mut CaptureSession<B>,
    position: Position,
) {
    for kind in [ConnectionKind::Preview, ConnectionKind::Capture] {
        session.apply_connection(kind, connection_settings(kind, position));
    }
}

/// Replaces the attached input with the default device at `to`.
pub(crate) fn switch_input<B: SessionBackend, D: DeviceDiscovery>(
    session: &mut CaptureSession<B>,
    discovery: &mut D,
    to: Position,
) -> Result<SwitchOutcome, SessionError> {
    let previous = session.attached_input().cloned();
    let next = resolve_input(discovery, to, previous.as_ref().map(|p| p.position))?;

    if let Some(previous) = &previous {
        if previous.same_device(&next) {
            debug!(device_id = %next.device_id, "Camera already attached");
            return Ok(SwitchOutcome::Unchanged(next));
        }
    }

    if let Err(e) = session.configure(|s| attach_replacing(s, previous.as_ref(), &next)) {
        // A commit can fail after the new input was adopted.
        let adopted = session
            .attached_input()
            .is_some_and(|input| input.same_device(&next));
        if !adopted {
            return Err(e);
        }
        return Err(revert_switch(session, previous.as_ref(), &next, e));
    }

    info!(
        from = ?previous.as_ref().map(|p| p.position),
        to = %next.position,
        device_id = %next.device_id,
        "Switched camera"
    );
    Ok(SwitchOutcome::Switched(next))
}

fn attach_replacing<B: SessionBackend>(
    session: &mut CaptureSession<B>,
    previous: Option<&DeviceInput>,
    next: &DeviceInput,
) -> Result<(), SessionError> {
    let rejected = match session.add_input(next) {
        Ok(()) => {
            if let Some(previous) = previous {
                session.remove_input(previous);
            }
            adopt(session, next);
            return Ok(());
        }
        Err(e) => e,
    };

    let Some(previous) = previous else {
        return Err(SessionError::AttachFailed {
            position: next.position,
            restored: None,
            reason: rejected.to_string(),
        });
    };

    debug!(reason = %rejected, "Session refused second input, detaching current camera first");
    session.remove_input(previous);

    let failed = match session.add_input(next) {
        Ok(()) => {
            adopt(session, next);
            return Ok(());
        }
        Err(e) => e,
    };

    warn!(
        position = %next.position,
        reason = %failed,
        "Camera attach failed, restoring previous camera"
    );
    match session.add_input(previous) {
        Ok(()) => {
            adopt(session, previous);
            Err(SessionError::AttachFailed {
                position: next.position,
                restored: Some(previous.position),
                reason: failed.to_string(),
            })
        }
        Err(rollback) => {
            warn!(reason = %rollback, "Previous camera could not be restored");
            session.set_attached_input(None);
            Err(SessionError::AttachFailed {
                position: next.position,
                restored: None,
                reason: format!("{failed}; rollback failed: {rollback}"),
            })
        }
    }
}

/// Puts `previous` back after a switch whose configuration failed to commit.
fn revert_switch<B: SessionBackend>(
    session: &mut CaptureSession<B>,
    previous: Option<&DeviceInput>,
    next: &DeviceInput,
    cause: SessionError,
) -> SessionError {
    warn!(
        position = %next.position,
        error = %cause,
        "Switch did not commit, restoring previous camera"
    );

    let reverted: Result<Option<Position>, SessionError> = session.configure(|s| {
        s.remove_input(next);
        s.set_attached_input(None);
        let Some(previous) = previous else {
            return Ok(None);
        };
        match s.add_input(previous) {
            Ok(()) => {
                adopt(s, previous);
                Ok(Some(previous.position))
            }
            Err(e) => {
                warn!(reason = %e, "Previous camera could not be restored");
                Ok(None)
            }
        }
    });

    let restored = match reverted {
        Ok(restored) => restored,
        Err(e) => {
            warn!(error = %e, "Failed to commit switch rollback");
            session.attached_input().map(|input| input.position)
        }
    };
    SessionError::AttachFailed {
        position: next.position,
        restored,
        reason: cause.to_string(),
    }
}

fn adopt<B: SessionBackend>(session: &mut CaptureSession<B>, input: &DeviceInput) {
    session.set_attached_input(Some(input.clone()));
    apply_orientation_policy(session, input.position);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{DeviceId, MockBackend, StaticDiscovery};

    fn session_on_back() -> (CaptureSession<MockBackend>, MockBackend, StaticDiscovery) {
        let backend = MockBackend::new();
        let probe = backend.clone();
        let mut discovery = StaticDiscovery::front_and_back();
        let mut session = CaptureSession::new(backend);
        switch_input(&mut session, &mut discovery, Position::Back).unwrap();
        (session, probe, discovery)
    }

    #[test]
    fn test_direct_switch() {
        let (mut session, probe, mut discovery) = session_on_back();

        let outcome = switch_input(&mut session, &mut discovery, Position::Front).unwrap();
        assert!(matches!(outcome, SwitchOutcome::Switched(_)));
        assert_eq!(outcome.input().position, Position::Front);
        assert_eq!(probe.attached_inputs().len(), 1);
        assert!(session.preview_connection().unwrap().mirrored);
        assert!(!session.capture_connection().unwrap().mirrored);
    }

    #[test]
    fn test_same_device_is_not_reattached() {
        let (mut session, probe, mut discovery) = session_on_back();
        let before = probe.stats();

        let outcome = switch_input(&mut session, &mut discovery, Position::Back).unwrap();
        assert!(matches!(outcome, SwitchOutcome::Unchanged(_)));
        assert_eq!(probe.stats(), before);
    }

    #[test]
    fn test_detach_then_retry_when_single_input_only() {
        let (mut session, probe, mut discovery) = session_on_back();
        probe.set_single_input_only(true);

        switch_input(&mut session, &mut discovery, Position::Front).unwrap();
        let attached = probe.attached_inputs();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].position, Position::Front);
    }

    #[test]
    fn test_rollback_restores_previous() {
        let (mut session, probe, mut discovery) = session_on_back();
        probe.set_single_input_only(true);
        probe.fail_input(&DeviceId::new("front-0"));

        let err = switch_input(&mut session, &mut discovery, Position::Front).unwrap_err();
        assert!(matches!(
            err,
            SessionError::AttachFailed {
                position: Position::Front,
                restored: Some(Position::Back),
                ..
            }
        ));
        assert_eq!(session.attached_input().unwrap().position, Position::Back);
        assert_eq!(probe.attached_inputs()[0].position, Position::Back);
        assert!(!session.preview_connection().unwrap().mirrored);
    }

    #[test]
    fn test_failed_rollback_leaves_no_input() {
        let (mut session, probe, mut discovery) = session_on_back();
        probe.set_single_input_only(true);
        probe.fail_input(&DeviceId::new("front-0"));
        probe.fail_input(&DeviceId::new("back-0"));

        let err = switch_input(&mut session, &mut discovery, Position::Front).unwrap_err();
        assert!(matches!(err, SessionError::AttachFailed { restored: None, .. }));
        assert!(session.attached_input().is_none());
        assert!(probe.attached_inputs().is_empty());
    }

    #[test]
    fn test_commit_failure_reverts_switch() {
        let (mut session, probe, mut discovery) = session_on_back();
        probe.fail_next_commit("bus reset");

        let err = switch_input(&mut session, &mut discovery, Position::Front).unwrap_err();
        match err {
            SessionError::AttachFailed {
                position,
                restored,
                reason,
            } => {
                assert_eq!(position, Position::Front);
                assert_eq!(restored, Some(Position::Back));
                assert!(reason.contains("bus reset"));
            }
            other => panic!("expected AttachFailed, got {:?}", other),
        }

        assert_eq!(session.attached_input().unwrap().position, Position::Back);
        let attached = probe.attached_inputs();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].position, Position::Back);
        assert!(!session.preview_connection().unwrap().mirrored);
    }

    #[test]
    fn test_commit_failure_before_first_input_leaves_none() {
        let backend = MockBackend::new();
        let probe = backend.clone();
        let mut discovery = StaticDiscovery::front_and_back();
        let mut session = CaptureSession::new(backend);
        probe.fail_next_commit("bus reset");

        let err = switch_input(&mut session, &mut discovery, Position::Front).unwrap_err();
        assert!(matches!(err, SessionError::AttachFailed { restored: None, .. }));
        assert!(session.attached_input().is_none());
        assert!(probe.attached_inputs().is_empty());
    }

    #[test]
    fn test_missing_device_leaves_session_untouched() {
        let (mut session, probe, mut discovery) = session_on_back();
        discovery.remove_position(Position::Front);
        let before = probe.stats();

        let err = switch_input(&mut session, &mut discovery, Position::Front).unwrap_err();
        assert!(matches!(
            err,
            SessionError::DeviceUnavailable {
                position: Position::Front
            }
        ));
        assert_eq!(probe.stats(), before);
        assert_eq!(session.attached_input().unwrap().position, Position::Back);
    }

    #[test]
    fn test_broken_device_reports_attach_failed() {
        let (mut session, _probe, mut discovery) = session_on_back();
        discovery.mark_broken(&DeviceId::new("front-0"));

        let err = switch_input(&mut session, &mut discovery, Position::Front).unwrap_err();
        assert!(matches!(
            err,
            SessionError::AttachFailed {
                restored: Some(Position::Back),
                ..
            }
        ));
    }
}
