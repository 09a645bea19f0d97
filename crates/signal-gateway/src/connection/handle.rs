//! Non-owning connection handle

use super::ConnectionId;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

/// Forwarding failure
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ForwardError {
    /// The recipient's connection has already terminated
    #[error("connection {0} is gone")]
    Disconnected(ConnectionId),
}

/// Weak reference to a live connection's outbound queue
///
/// Used for lookup, delivery and matching during cleanup. Holding a handle
/// never keeps a connection open.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::WeakSender<String>,
}

impl ConnectionHandle {
    pub(crate) fn new(id: ConnectionId, sender: mpsc::WeakSender<String>) -> Self {
        Self { id, sender }
    }

    /// ID of the connection this handle points to
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Check whether the connection can still accept payloads
    pub fn is_alive(&self) -> bool {
        self.sender
            .upgrade()
            .is_some_and(|sender| !sender.is_closed())
    }

    /// Queue a payload for delivery to the connection
    ///
    /// Waits for queue space if the recipient is slow. Fails only if the
    /// connection is gone.
    pub async fn send(&self, payload: String) -> Result<(), ForwardError> {
        let sender = self
            .sender
            .upgrade()
            .ok_or(ForwardError::Disconnected(self.id))?;

        sender
            .send(payload)
            .await
            .map_err(|_| ForwardError::Disconnected(self.id))
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}
