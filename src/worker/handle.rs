//! Caller-side handle to a session worker.

use super::actor::{Command, Reply};
use super::snapshot::SessionSnapshot;
use crate::capture::{CaptureSettings, CapturedFrame, Position};
use crate::SessionError;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot, watch};

/// Cloneable handle to a running session worker.
///
/// Every operation is enqueued when the method is called, not when the
/// returned future is first polled, so call order is execution order.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    position: watch::Receiver<Position>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        position: watch::Receiver<Position>,
        snapshot: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self {
            commands,
            position,
            snapshot,
        }
    }

    /// Starts the session, attaching the default camera on first use.
    /// Resolves to the active position. Idempotent.
    pub fn start(&self) -> Pending<Position> {
        self.submit(Command::Start)
    }

    /// Stops the session without detaching its camera. Idempotent.
    pub fn stop(&self) -> Pending<()> {
        self.submit(Command::Stop)
    }

    /// Switches to the camera on the other side. Resolves to the new
    /// position.
    pub fn switch_camera(&self) -> Pending<Position> {
        self.submit(Command::SwitchCamera)
    }

    /// Takes one still photo.
    pub fn capture_photo(&self, settings: CaptureSettings) -> Pending<CapturedFrame> {
        self.submit(|reply| Command::Capture { settings, reply })
    }

    /// Stops the session, detaches the camera and output, and ends the
    /// worker. Later operations fail with [`SessionError::SessionClosed`].
    pub fn release(&self) -> Pending<()> {
        self.submit(Command::Release)
    }

    /// Observable position of the active camera.
    pub fn current_position(&self) -> watch::Receiver<Position> {
        self.position.clone()
    }

    /// Position of the active camera right now.
    pub fn position(&self) -> Position {
        *self.position.borrow()
    }

    /// Observable session snapshot, updated after every operation.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Whether the worker has gone away.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn submit<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Pending<T> {
        let (tx, rx) = oneshot::channel();
        match self.commands.send(command(tx)) {
            Ok(()) => Pending {
                inner: PendingInner::Waiting(rx),
            },
            Err(_) => Pending {
                inner: PendingInner::Failed(Some(SessionError::SessionClosed)),
            },
        }
    }
}

/// Result of an operation already queued on the worker.
///
/// Dropping it does not cancel the operation.
#[must_use = "the operation runs regardless; await it to observe the result"]
#[derive(Debug)]
pub struct Pending<T> {
    inner: PendingInner<T>,
}

#[derive(Debug)]
enum PendingInner<T> {
    Waiting(oneshot::Receiver<Result<T, SessionError>>),
    Failed(Option<SessionError>),
}

impl<T> Unpin for Pending<T> {}

impl<T> Future for Pending<T> {
    type Output = Result<T, SessionError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            PendingInner::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or_else(|_| Err(SessionError::SessionClosed))),
            PendingInner::Failed(error) => {
                Poll::Ready(Err(error.take().unwrap_or(SessionError::SessionClosed)))
            }
        }
    }
}
