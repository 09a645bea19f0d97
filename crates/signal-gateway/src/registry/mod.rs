//! Connection registry
//!
//! The directory half of the relay: which live connection answers to which
//! identity.

mod registry;

pub use registry::{Registered, Registration, Registry};
