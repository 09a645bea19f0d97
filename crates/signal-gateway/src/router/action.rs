//! Routing decisions

use crate::connection::ConnectionHandle;
use crate::protocol::{Identity, RegistrationMetadata};
use std::fmt;

/// What to do with one inbound envelope
#[derive(Debug)]
pub enum Action {
    /// Register the source connection under `identity`
    RegisterIdentity {
        identity: Identity,
        metadata: RegistrationMetadata,
    },
    /// Deliver `payload` unchanged to `recipient`
    Forward {
        recipient_id: Identity,
        recipient: ConnectionHandle,
        payload: String,
    },
    /// Discard the envelope
    Drop(DropReason),
}

/// Why an envelope was not delivered
///
/// None of these are reported to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Payload could not be decoded as an envelope
    Malformed,
    /// `type` is not one the relay handles
    UnknownType,
    /// Directed envelope without `recipientId`
    MissingRecipient,
    /// `recipientId` is not registered
    UnknownRecipient,
    /// Recipient was registered but its connection went away before delivery
    RecipientGone,
}

impl DropReason {
    /// Short label for logs
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::UnknownType => "unknown_type",
            Self::MissingRecipient => "missing_recipient",
            Self::UnknownRecipient => "unknown_recipient",
            Self::RecipientGone => "recipient_gone",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
