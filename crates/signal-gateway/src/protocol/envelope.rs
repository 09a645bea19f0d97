//! Envelope format
//!
//! Every WebSocket text frame carries one JSON object:
//!
//! ```json
//! {"type": "offer", "recipientId": "Y", "sdp": "..."}
//! ```
//!
//! Only the routing fields (`type`, `deviceId`, `recipientId`, and `url` on
//! register) are read. Everything else is opaque and the original text is
//! kept so it can be forwarded byte for byte.

use super::Identity;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Field names used on the wire
mod field {
    pub const TYPE: &str = "type";
    pub const DEVICE_ID: &str = "deviceId";
    pub const RECIPIENT_ID: &str = "recipientId";
    pub const URL: &str = "url";
}

/// Negotiation message types the relay forwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalType {
    /// SDP offer
    Offer,
    /// SDP answer
    Answer,
    /// ICE candidate
    Candidate,
}

impl SignalType {
    /// Wire name of this type
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Candidate => "candidate",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "offer" => Some(Self::Offer),
            "answer" => Some(Self::Answer),
            "candidate" => Some(Self::Candidate),
            _ => None,
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Auxiliary data supplied with a registration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationMetadata {
    /// Where the client says it can be reached, if it said so
    pub url: Option<String>,
}

/// Decoded routing view of an envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// `{"type":"register","deviceId":...}`
    Register {
        device_id: Identity,
        metadata: RegistrationMetadata,
    },
    /// `{"type":"offer"|"answer"|"candidate","recipientId":...}`
    Signal {
        signal: SignalType,
        recipient_id: Option<Identity>,
    },
    /// Well-formed envelope with a `type` the relay does not handle
    Unknown { kind: String },
}

/// Reasons an inbound payload is not a usable envelope
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload is not valid JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Payload is JSON but not an object
    #[error("envelope is not a JSON object")]
    NotAnObject,

    /// `type` is absent
    #[error("missing field `type`")]
    MissingType,

    /// A routing field has the wrong JSON type
    #[error("field `{0}` must be a string")]
    InvalidField(&'static str),

    /// Register envelope without a usable `deviceId`
    #[error("register envelope requires a non-empty `deviceId`")]
    MissingDeviceId,
}

/// An inbound envelope: the text as received plus its routing view
#[derive(Debug, Clone)]
pub struct Envelope {
    kind: EnvelopeKind,
    raw: String,
}

impl Envelope {
    /// Decode a text payload
    ///
    /// The payload is kept untouched; [`Envelope::into_raw`] returns exactly
    /// the bytes that were passed in.
    pub fn decode(raw: impl Into<String>) -> Result<Self, DecodeError> {
        let raw = raw.into();
        let value: Value = serde_json::from_str(&raw)?;
        let Value::Object(object) = value else {
            return Err(DecodeError::NotAnObject);
        };

        let kind = match object.get(field::TYPE) {
            None | Some(Value::Null) => return Err(DecodeError::MissingType),
            Some(Value::String(kind)) => kind.as_str(),
            Some(_) => return Err(DecodeError::InvalidField(field::TYPE)),
        };

        let kind = if kind == "register" {
            let device_id = string_field(&object, field::DEVICE_ID)?
                .filter(|id| !id.is_empty())
                .ok_or(DecodeError::MissingDeviceId)?;

            // Metadata is advisory; an unusable url is ignored rather than rejected.
            let url = object
                .get(field::URL)
                .and_then(Value::as_str)
                .map(str::to_string);

            EnvelopeKind::Register {
                device_id: Identity::from(device_id),
                metadata: RegistrationMetadata { url },
            }
        } else if let Some(signal) = SignalType::parse(kind) {
            EnvelopeKind::Signal {
                signal,
                recipient_id: string_field(&object, field::RECIPIENT_ID)?.map(Identity::from),
            }
        } else {
            EnvelopeKind::Unknown {
                kind: kind.to_string(),
            }
        };

        Ok(Self { kind, raw })
    }

    /// Routing view of this envelope
    #[must_use]
    pub fn kind(&self) -> &EnvelopeKind {
        &self.kind
    }

    /// The payload exactly as received
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Take the payload exactly as received
    #[must_use]
    pub fn into_raw(self) -> String {
        self.raw
    }

    /// Split into routing view and payload
    #[must_use]
    pub fn into_parts(self) -> (EnvelopeKind, String) {
        (self.kind, self.raw)
    }

    /// The `type` value, for logging
    #[must_use]
    pub fn type_name(&self) -> &str {
        match &self.kind {
            EnvelopeKind::Register { .. } => "register",
            EnvelopeKind::Signal { signal, .. } => signal.as_str(),
            EnvelopeKind::Unknown { kind } => kind,
        }
    }
}

/// Read an optional string field; `null` counts as absent
fn string_field<'a>(
    object: &'a Map<String, Value>,
    name: &'static str,
) -> Result<Option<&'a str>, DecodeError> {
    match object.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(_) => Err(DecodeError::InvalidField(name)),
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EnvelopeKind::Register { device_id, .. } => {
                write!(f, "Envelope(type=register, deviceId={device_id})")
            }
            EnvelopeKind::Signal {
                signal,
                recipient_id: Some(recipient),
            } => write!(f, "Envelope(type={signal}, recipientId={recipient})"),
            EnvelopeKind::Signal { signal, .. } => write!(f, "Envelope(type={signal})"),
            EnvelopeKind::Unknown { kind } => write!(f, "Envelope(type={kind})"),
        }
    }
}
