//! Relay protocol definitions
//!
//! Defines the envelope format exchanged over the WebSocket and the identity
//! type clients register under.

mod envelope;
mod identity;

pub use envelope::{DecodeError, Envelope, EnvelopeKind, RegistrationMetadata, SignalType};
pub use identity::Identity;
