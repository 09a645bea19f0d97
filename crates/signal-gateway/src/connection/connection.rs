//! Individual WebSocket connection
//!
//! Represents a single WebSocket connection and its state.

use super::ConnectionHandle;
use parking_lot::RwLock;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique identifier of one transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a new random connection ID
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Read loop running
    Open,
    /// Read loop finished; terminal
    Closed,
}

/// A single WebSocket connection
///
/// Holds the only strong sender of the connection's outbound queue. Once the
/// `Connection` is dropped the writer drains what is queued and stops, and
/// every [`ConnectionHandle`] to it stops resolving.
pub struct Connection {
    /// Unique connection ID
    id: ConnectionId,

    /// Outbound queue to the WebSocket writer
    sender: mpsc::Sender<String>,

    /// Current connection state
    state: RwLock<ConnectionState>,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    /// Create a new open connection around its outbound queue
    #[must_use]
    pub fn new(sender: mpsc::Sender<String>) -> Self {
        Self {
            id: ConnectionId::generate(),
            sender,
            state: RwLock::new(ConnectionState::Open),
            created_at: Instant::now(),
        }
    }

    /// Get the connection ID
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Non-owning handle for routing to this connection
    pub fn handle(&self) -> ConnectionHandle {
        ConnectionHandle::new(self.id, self.sender.downgrade())
    }

    /// Get the current state
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Check if the read loop is still running
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Move to `Closed`
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn close(&self) -> bool {
        let mut state = self.state.write();
        let was_open = *state == ConnectionState::Open;
        *state = ConnectionState::Closed;
        was_open
    }

    /// Get connection age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("created_at", &self.created_at)
            .finish()
    }
}
