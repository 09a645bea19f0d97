//! Forward handler

use super::Outcome;
use crate::connection::{Connection, ConnectionHandle};
use crate::protocol::Identity;
use crate::router::DropReason;

/// Handler for directed envelopes
pub struct ForwardHandler;

impl ForwardHandler {
    /// Queue `payload` for `recipient`
    ///
    /// A recipient that disconnected between lookup and delivery is a drop,
    /// not an error for the sender; its own handler cleans up its
    /// registration.
    pub async fn handle(
        sender: &Connection,
        recipient_id: Identity,
        recipient: &ConnectionHandle,
        payload: String,
    ) -> Outcome {
        match recipient.send(payload).await {
            Ok(()) => {
                tracing::trace!(
                    connection_id = %sender.id(),
                    recipient_id = %recipient_id,
                    recipient_connection_id = %recipient.id(),
                    "Envelope forwarded"
                );
                Outcome::Forwarded { recipient_id }
            }
            Err(e) => {
                tracing::debug!(
                    connection_id = %sender.id(),
                    recipient_id = %recipient_id,
                    error = %e,
                    reason = %DropReason::RecipientGone,
                    "Dropping message"
                );
                Outcome::Dropped(DropReason::RecipientGone)
            }
        }
    }
}
