//! Register handler

use super::Outcome;
use crate::connection::Connection;
use crate::protocol::{Identity, RegistrationMetadata};
use crate::server::RelayState;

/// Handler for register envelopes
pub struct RegisterHandler;

impl RegisterHandler {
    /// Register `connection` under `identity`, replacing any previous owner
    pub fn handle(
        state: &RelayState,
        connection: &Connection,
        identity: Identity,
        metadata: RegistrationMetadata,
    ) -> Outcome {
        let registered = state
            .registry()
            .register(identity.clone(), connection.handle(), metadata);

        if let Some(previous) = registered.replaced {
            tracing::info!(
                device_id = %identity,
                connection_id = %connection.id(),
                previous_connection_id = %previous,
                "Identity taken over by new connection"
            );
        } else {
            tracing::info!(
                device_id = %identity,
                connection_id = %connection.id(),
                "Device registered"
            );
        }

        Outcome::Registered { identity }
    }
}
