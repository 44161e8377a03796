//! The session worker thread.
//!
//! Commands arrive on an unbounded channel and are executed one at a time,
//! in submission order, on a dedicated thread that exclusively owns the
//! [`CaptureSession`]. Results go back through per-command oneshot
//! channels; state goes out through watch channels after every command.

use super::orchestrator::CaptureOrchestrator;
use super::snapshot::{SessionSnapshot, SessionStats};
use super::switch::{apply_orientation_policy, resolve_input, switch_input, SwitchOutcome};
use super::SessionHandle;
use crate::capture::{
    CaptureSession, CaptureSettings, CapturedFrame, DeviceDiscovery, DeviceInput, PhotoOutput,
    Position, SessionBackend, SessionConfig, SessionState,
};
use crate::SessionError;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

pub(crate) type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Work submitted to the session worker.
#[derive(Debug)]
pub(crate) enum Command {
    Start(Reply<Position>),
    Stop(Reply<()>),
    SwitchCamera(Reply<Position>),
    Capture {
        settings: CaptureSettings,
        reply: Reply<CapturedFrame>,
    },
    Release(Reply<()>),
}

/// Owner of the capture session and everything attached to it.
pub struct SessionWorker<B, D> {
    session: CaptureSession<B>,
    discovery: D,
    orchestrator: CaptureOrchestrator,
    config: SessionConfig,
    /// Position of the last known-good input.
    position: Position,
    stats: SessionStats,
    released: bool,
    position_tx: watch::Sender<Position>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl<B: SessionBackend, D: DeviceDiscovery> SessionWorker<B, D> {
    /// Starts a worker thread that owns `backend` and returns its handle.
    ///
    /// Nothing is attached until the first `start()` or `switch_camera()`.
    pub fn spawn(
        backend: B,
        discovery: D,
        config: SessionConfig,
    ) -> Result<SessionHandle, SessionError> {
        config.validate()?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (position_tx, position_rx) = watch::channel(config.default_position);
        let (snapshot_tx, snapshot_rx) =
            watch::channel(SessionSnapshot::initial(config.default_position));

        let worker = Self {
            session: CaptureSession::new(backend),
            discovery,
            orchestrator: CaptureOrchestrator::new(),
            position: config.default_position,
            config,
            stats: SessionStats::default(),
            released: false,
            position_tx,
            snapshot_tx,
        };

        std::thread::Builder::new()
            .name(worker.config.worker_name.clone())
            .spawn(move || worker.run(commands_rx))?;

        Ok(SessionHandle::new(commands_tx, position_rx, snapshot_rx))
    }

    fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        info!(
            default_position = %self.config.default_position,
            "Session worker started"
        );

        while let Some(command) = commands.blocking_recv() {
            if !self.handle(command) {
                break;
            }
        }

        // Every handle dropped without an explicit release.
        if !self.released {
            self.release();
            self.publish();
        }
        info!("Session worker exited");
    }

    /// Executes one command. Returns false once the session is released.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Start(reply) => {
                let result = self.start();
                self.respond("start", reply, result);
            }
            Command::Stop(reply) => {
                let result = self.stop();
                self.respond("stop", reply, result);
            }
            Command::SwitchCamera(reply) => {
                let result = self.switch_camera();
                self.respond("switch_camera", reply, result);
            }
            Command::Capture { settings, reply } => {
                let result = self.capture(settings);
                self.respond("capture_photo", reply, result);
            }
            Command::Release(reply) => {
                self.release();
                self.respond("release", reply, Ok(()));
                return false;
            }
        }
        true
    }

    /// Publishes the new state before replying, so a caller that awaited
    /// the result observes the state it produced.
    fn respond<T>(&mut self, operation: &str, reply: Reply<T>, result: Result<T, SessionError>) {
        if let Err(e) = &result {
            debug!(operation, error = %e, "Operation failed");
        }
        self.publish();
        if reply.send(result).is_err() {
            debug!(operation, "Caller stopped waiting for result");
        }
    }

    fn start(&mut self) -> Result<Position, SessionError> {
        if self.session.state() == SessionState::Running {
            debug!("Session already running");
            return Ok(self.position);
        }

        self.session.transition(SessionState::Configuring);
        let mut added = Attachments::default();
        let result = self.configure_for_start(&mut added).and_then(|position| {
            self.session.start_running()?;
            Ok(position)
        });

        match result {
            Ok(position) => {
                self.session.transition(SessionState::Running);
                self.position = position;
                self.stats.starts += 1;
                info!(position = %position, "Session running");
                Ok(position)
            }
            Err(e) => {
                self.undo_start(added);
                self.session.transition(SessionState::Uninitialized);
                warn!(error = %e, "Session failed to start");
                Err(e)
            }
        }
    }

    fn configure_for_start(&mut self, added: &mut Attachments) -> Result<Position, SessionError> {
        let default_position = self.config.default_position;
        let output = PhotoOutput {
            high_resolution: self.config.high_resolution_capture,
        };
        let discovery = &mut self.discovery;

        self.session.configure(|s| {
            if s.attached_input().is_none() {
                let input = resolve_input(discovery, default_position, None)?;
                s.add_input(&input).map_err(|e| SessionError::AttachFailed {
                    position: input.position,
                    restored: None,
                    reason: e.to_string(),
                })?;
                s.set_attached_input(Some(input.clone()));
                added.input = Some(input);
            }

            let position = match s.attached_input() {
                Some(input) => input.position,
                None => default_position,
            };

            match s.ensure_output(output) {
                Ok(attached) => added.output = attached,
                Err(e) => {
                    // A pre-attached input survives; one attached above is undone.
                    let restored = match added.input {
                        Some(_) => None,
                        None => s.attached_input().map(|input| input.position),
                    };
                    return Err(SessionError::AttachFailed {
                        position,
                        restored,
                        reason: e.to_string(),
                    });
                }
            }

            apply_orientation_policy(s, position);
            Ok(position)
        })
    }

    /// Detaches whatever a failed `start()` attached.
    fn undo_start(&mut self, added: Attachments) {
        if added.input.is_none() && !added.output {
            return;
        }
        let undone: Result<(), SessionError> = self.session.configure(|s| {
            if added.output {
                s.detach_output();
            }
            if let Some(input) = &added.input {
                s.remove_input(input);
                s.set_attached_input(None);
            }
            Ok(())
        });
        if let Err(e) = undone {
            warn!(error = %e, "Failed to commit start rollback");
        }
    }

    fn stop(&mut self) -> Result<(), SessionError> {
        if self.session.state() != SessionState::Running {
            debug!(state = %self.session.state(), "Session not running, nothing to stop");
            return Ok(());
        }

        self.session.transition(SessionState::Stopping);
        self.session.stop_running();
        self.session.transition(SessionState::Uninitialized);
        self.stats.stops += 1;
        info!("Session stopped");
        Ok(())
    }

    fn switch_camera(&mut self) -> Result<Position, SessionError> {
        let current = self
            .session
            .attached_input()
            .map(|input| input.position)
            .unwrap_or(self.position);
        let target = current.opposite();

        match switch_input(&mut self.session, &mut self.discovery, target) {
            Ok(outcome) => {
                if let SwitchOutcome::Switched(_) = &outcome {
                    self.stats.switches += 1;
                }
                self.position = outcome.input().position;
                Ok(self.position)
            }
            Err(e) => {
                self.stats.switch_failures += 1;
                if let SessionError::AttachFailed {
                    restored: Some(_), ..
                } = &e
                {
                    self.stats.rollbacks += 1;
                }
                // Last known-good position: whatever is attached now, else
                // the position before the attempt.
                if let Some(input) = self.session.attached_input() {
                    self.position = input.position;
                }
                warn!(target = %target, error = %e, "Camera switch failed");
                Err(e)
            }
        }
    }

    fn capture(&mut self, settings: CaptureSettings) -> Result<CapturedFrame, SessionError> {
        match self.orchestrator.capture(&mut self.session, settings) {
            Ok(frame) => {
                self.stats.captures += 1;
                Ok(frame)
            }
            Err(SessionError::NotRunning) => {
                self.stats.rejected_captures += 1;
                Err(SessionError::NotRunning)
            }
            Err(e) => {
                self.stats.capture_failures += 1;
                warn!(error = %e, "Capture failed");
                Err(e)
            }
        }
    }

    /// Stops the hardware and detaches everything. Idempotent.
    fn release(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.stop() {
            warn!(error = %e, "Failed to stop session during release");
        }

        let released: Result<(), SessionError> = self.session.configure(|s| {
            if let Some(input) = s.take_attached_input() {
                s.remove_input(&input);
            }
            s.detach_output();
            Ok(())
        });
        if let Err(e) = released {
            warn!(error = %e, "Failed to commit session release");
        }

        self.released = true;
        info!("Session released");
    }

    fn publish(&mut self) {
        let position = self.position;
        self.position_tx.send_if_modified(|current| {
            if *current == position {
                return false;
            }
            *current = position;
            true
        });

        let snapshot = SessionSnapshot {
            state: self.session.state(),
            position,
            device: self.session.attached_input().cloned(),
            output_attached: self.session.attached_output().is_some(),
            preview: self.session.preview_connection(),
            capture: self.session.capture_connection(),
            stats: self.stats.clone(),
            released: self.released,
        };
        self.snapshot_tx.send_replace(snapshot);
    }
}

#[derive(Debug, Default)]
struct Attachments {
    input: Option<DeviceInput>,
    output: bool,
}
