//! Inbound message handlers
//!
//! Decodes each text frame, routes it, and carries out the resulting action.

mod forward;
mod register;

pub use forward::ForwardHandler;
pub use register::RegisterHandler;

use crate::connection::Connection;
use crate::protocol::{Envelope, Identity};
use crate::router::{Action, DropReason, EnvelopeRouter};
use crate::server::RelayState;

/// Result of handling one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The connection is now registered under `identity`
    Registered { identity: Identity },
    /// The payload was queued for `recipient_id`
    Forwarded { recipient_id: Identity },
    /// The message was discarded
    Dropped(DropReason),
}

/// Dispatch incoming client messages to appropriate handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle one text frame received on `connection`
    ///
    /// Never fails: every problem with a single message ends in
    /// [`Outcome::Dropped`] and the connection carries on.
    pub async fn dispatch(state: &RelayState, connection: &Connection, text: String) -> Outcome {
        let envelope = match Envelope::decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(
                    connection_id = %connection.id(),
                    error = %e,
                    reason = %DropReason::Malformed,
                    "Dropping message"
                );
                return Outcome::Dropped(DropReason::Malformed);
            }
        };

        tracing::trace!(
            connection_id = %connection.id(),
            envelope = %envelope,
            "Received envelope"
        );

        let type_name = envelope.type_name().to_string();

        match EnvelopeRouter::route(state.registry(), envelope) {
            Action::RegisterIdentity { identity, metadata } => {
                RegisterHandler::handle(state, connection, identity, metadata)
            }
            Action::Forward {
                recipient_id,
                recipient,
                payload,
            } => ForwardHandler::handle(connection, recipient_id, &recipient, payload).await,
            Action::Drop(reason) => {
                if reason == DropReason::UnknownType {
                    tracing::info!(
                        connection_id = %connection.id(),
                        envelope_type = %type_name,
                        reason = %reason,
                        "Dropping message"
                    );
                } else {
                    tracing::debug!(
                        connection_id = %connection.id(),
                        envelope_type = %type_name,
                        reason = %reason,
                        "Dropping message"
                    );
                }
                Outcome::Dropped(reason)
            }
        }
    }
}
