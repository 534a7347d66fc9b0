// crates/server/src/hub/session.rs
//! Observer session handle.

use std::fmt;

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Outbound frames a session may have queued before it counts as stalled.
pub const SESSION_BUFFER: usize = 64;

/// Unique identifier for an attached observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a frame could not be handed to a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("session {0} is closed")]
    Closed(SessionId),

    #[error("session {0} is not draining its outbound queue")]
    Backlogged(SessionId),
}

impl DeliveryError {
    pub fn session(&self) -> SessionId {
        match self {
            DeliveryError::Closed(id) | DeliveryError::Backlogged(id) => *id,
        }
    }
}

/// Receiving half of a session, drained by the socket writer task.
pub type SessionOutbox = mpsc::Receiver<String>;

/// Sending half of one observer's duplex channel.
///
/// Cloning is cheap; every clone feeds the same outbox.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    label: String,
    tx: mpsc::Sender<String>,
}

impl Session {
    /// Create a session and the outbox its writer task drains.
    pub fn open(label: impl Into<String>) -> (Self, SessionOutbox) {
        Self::with_capacity(label, SESSION_BUFFER)
    }

    pub fn with_capacity(label: impl Into<String>, capacity: usize) -> (Self, SessionOutbox) {
        let (tx, rx) = mpsc::channel(capacity);
        let session = Self {
            id: SessionId::new(),
            label: label.into(),
            tx,
        };
        (session, rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Queue a frame without waiting.
    pub fn send(&self, frame: &str) -> Result<(), DeliveryError> {
        self.tx.try_send(frame.to_owned()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Backlogged(self.id),
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed(self.id),
        })
    }
}
