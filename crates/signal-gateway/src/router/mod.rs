//! Envelope routing
//!
//! Decides what an inbound envelope means for the registry and for delivery.

mod action;
mod router;

pub use action::{Action, DropReason};
pub use router::EnvelopeRouter;
