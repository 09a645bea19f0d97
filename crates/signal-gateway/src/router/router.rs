//! Routing rule
//!
//! Pure function of the envelope and the registry's current contents.

use super::{Action, DropReason};
use crate::protocol::{Envelope, EnvelopeKind};
use crate::registry::Registry;

/// Stateless envelope router
pub struct EnvelopeRouter;

impl EnvelopeRouter {
    /// Route a decoded envelope
    ///
    /// Register envelopes become [`Action::RegisterIdentity`]; the caller
    /// applies it with its own connection. Directed envelopes are forwarded
    /// as the exact text received, or dropped if the recipient cannot be
    /// resolved.
    pub fn route(registry: &Registry, envelope: Envelope) -> Action {
        let (kind, payload) = envelope.into_parts();

        match kind {
            EnvelopeKind::Register {
                device_id,
                metadata,
            } => Action::RegisterIdentity {
                identity: device_id,
                metadata,
            },
            EnvelopeKind::Signal {
                recipient_id: None,
                ..
            } => Action::Drop(DropReason::MissingRecipient),
            EnvelopeKind::Signal {
                recipient_id: Some(recipient_id),
                ..
            } => match registry.lookup(&recipient_id) {
                Some(recipient) => Action::Forward {
                    recipient_id,
                    recipient,
                    payload,
                },
                None => Action::Drop(DropReason::UnknownRecipient),
            },
            EnvelopeKind::Unknown { .. } => Action::Drop(DropReason::UnknownType),
        }
    }
}
