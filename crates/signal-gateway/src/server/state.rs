//! Relay state
//!
//! Application state for the relay server.

use crate::registry::Registry;
use signal_common::RelayConfig;
use std::sync::Arc;

/// Relay application state
///
/// Cloned into every connection task; all clones share one registry.
#[derive(Clone)]
pub struct RelayState {
    /// Identity to connection registry
    registry: Arc<Registry>,
    /// Relay configuration
    config: Arc<RelayConfig>,
}

impl RelayState {
    /// Create state with a fresh, empty registry
    pub fn new(config: RelayConfig) -> Self {
        Self::with_registry(Registry::new_shared(), config)
    }

    /// Create state around an existing registry
    pub fn with_registry(registry: Arc<Registry>, config: RelayConfig) -> Self {
        Self {
            registry,
            config: Arc::new(config),
        }
    }

    /// Get the registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Get a shared reference to the registry
    pub fn shared_registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get the relay configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

impl std::fmt::Debug for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayState")
            .field("registry", &self.registry)
            .field("config", &"RelayConfig")
            .finish()
    }
}
