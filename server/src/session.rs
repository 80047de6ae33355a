use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use system::{MessageWriter, SessionId, SystemError, WireMessage};
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closed,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Active,
            _ => Self::Closed,
        }
    }
}

/// Server side of one participant's connection.
pub struct Session {
    id: SessionId,
    state: AtomicU8,
    writer: MessageWriter<BoxedWriter>,
    write_timeout: Duration,
    closed: CancellationToken,
}

impl Session {
    pub(crate) fn new(id: SessionId, writer: BoxedWriter, write_timeout: Duration) -> Self {
        Self {
            id,
            state: AtomicU8::new(SessionState::Connecting as u8),
            writer: MessageWriter::new(writer),
            write_timeout,
            closed: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    pub(crate) fn activate(&self) -> bool {
        self.state
            .compare_exchange(
                SessionState::Connecting as u8,
                SessionState::Active as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Moves the session to `Closed`. Only the first caller gets `true`, so
    /// cleanup runs once even when the read and write paths fail together.
    pub(crate) fn close(&self) -> bool {
        let previous = self
            .state
            .swap(SessionState::Closed as u8, Ordering::AcqRel);
        self.closed.cancel();
        previous != SessionState::Closed as u8
    }

    /// Resolves once the session has been closed from anywhere.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    pub async fn send(&self, message: &WireMessage) -> Result<(), SystemError> {
        self.send_encoded(&system::encode(message)).await
    }

    pub(crate) async fn send_encoded(&self, frame: &[u8]) -> Result<(), SystemError> {
        if self.is_closed() {
            return Err(not_connected(self.id));
        }
        tokio::select! {
            result = tokio::time::timeout(self.write_timeout, self.writer.send_encoded(frame)) => {
                result.map_err(|_| {
                    SystemError::PeerUnreachable(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("write to session {} timed out", self.id),
                    ))
                })?
            }
            _ = self.closed.cancelled() => Err(not_connected(self.id)),
        }
    }

    pub(crate) async fn shutdown(&self) {
        if let Err(err) = self.writer.shutdown().await {
            log::debug!("Session {} shutdown: {}", self.id, err);
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

pub(crate) fn not_connected(id: SessionId) -> SystemError {
    SystemError::PeerUnreachable(std::io::Error::new(
        std::io::ErrorKind::NotConnected,
        format!("session {} is closed", id),
    ))
}
