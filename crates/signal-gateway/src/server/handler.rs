//! WebSocket handler
//!
//! Owns one connection's lifecycle: a sequential read loop feeding the
//! dispatcher, a writer task draining the outbound queue, and the cleanup
//! that releases the connection's registration on every exit path.

use crate::connection::{Connection, ConnectionId};
use crate::handlers::MessageDispatcher;
use crate::registry::Registry;
use crate::router::DropReason;
use crate::server::RelayState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Why a connection's read loop ended
#[derive(Debug)]
pub enum CloseReason {
    /// Peer sent a close frame
    ClientClosed,
    /// Inbound stream ended without a close frame
    StreamEnded,
    /// Reading from the socket failed
    TransportError(axum::Error),
    /// Writing to the socket failed, so the connection is unusable
    WriterStopped,
}

impl CloseReason {
    /// Whether this is an orderly shutdown rather than a failure
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::ClientClosed | Self::StreamEnded)
    }
}

/// Releases a connection's registration when dropped
///
/// Dropping runs on normal return, early return and unwinding alike, so a
/// connection can never leave a registration behind.
struct RegistrationGuard {
    registry: Arc<Registry>,
    connection_id: ConnectionId,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        if let Some(identity) = self.registry.remove_by_connection(self.connection_id) {
            tracing::info!(
                device_id = %identity,
                connection_id = %self.connection_id,
                "Device unregistered"
            );
        }
    }
}

/// WebSocket relay handler
pub async fn relay_handler(
    State(state): State<RelayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let max_message_size = state.config().socket.max_message_size;
    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| handle_socket(state, socket))
}

/// Serve an upgraded WebSocket until it closes
pub async fn handle_socket(state: RelayState, socket: WebSocket) {
    let (tx, rx) = mpsc::channel::<String>(state.config().socket.outbound_buffer);
    let connection = Connection::new(tx);
    let connection_id = connection.id();
    let guard = RegistrationGuard {
        registry: state.shared_registry(),
        connection_id,
    };

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    let (ws_sink, ws_stream) = socket.split();
    let mut send_task = tokio::spawn(write_loop(ws_sink, rx, connection_id));

    let reason = tokio::select! {
        reason = read_loop(&state, &connection, ws_stream) => reason,
        _ = &mut send_task => CloseReason::WriterStopped,
    };

    connection.close();
    let age = connection.age();
    drop(guard);
    // Last strong sender: the writer flushes what is queued, then closes the socket.
    drop(connection);

    if reason.is_expected() {
        tracing::info!(
            connection_id = %connection_id,
            reason = ?reason,
            age = ?age,
            "WebSocket connection closed"
        );
    } else {
        tracing::warn!(
            connection_id = %connection_id,
            reason = ?reason,
            age = ?age,
            "WebSocket connection failed"
        );
    }
}

/// Process inbound frames in order until the connection ends
async fn read_loop(
    state: &RelayState,
    connection: &Connection,
    mut stream: SplitStream<WebSocket>,
) -> CloseReason {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                MessageDispatcher::dispatch(state, connection, text).await;
            }
            Ok(Message::Binary(data)) => {
                tracing::debug!(
                    connection_id = %connection.id(),
                    bytes = data.len(),
                    reason = %DropReason::Malformed,
                    "Dropping binary message"
                );
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // Pong is handled automatically by axum
                tracing::trace!(connection_id = %connection.id(), "Ping/pong received");
            }
            Ok(Message::Close(frame)) => {
                tracing::debug!(
                    connection_id = %connection.id(),
                    code = ?frame.as_ref().map(|f| f.code),
                    "Client closed connection"
                );
                return CloseReason::ClientClosed;
            }
            Err(e) => return CloseReason::TransportError(e),
        }
    }

    CloseReason::StreamEnded
}

/// Drain the outbound queue into the socket
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<String>,
    connection_id: ConnectionId,
) {
    while let Some(payload) = rx.recv().await {
        if let Err(e) = sink.send(Message::Text(payload)).await {
            tracing::warn!(
                connection_id = %connection_id,
                error = %e,
                "Failed to send message to WebSocket"
            );
            break;
        }
    }

    let _ = sink.close().await;
}
