//! # signal-gateway
//!
//! WebSocket signaling relay. Clients register under a device identifier and
//! exchange negotiation envelopes (offers, answers, candidates) addressed to
//! each other; the relay forwards each envelope verbatim to its recipient.

pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod server;

pub use server::{create_app, run, RelayState};
