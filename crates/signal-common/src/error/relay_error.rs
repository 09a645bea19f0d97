//! Relay error types
//!
//! Process-level failures. Per-message problems (malformed envelopes,
//! unknown recipients) never become a `RelayError`; they are dropped where
//! they occur.

use crate::config::ConfigError;
use std::fmt;

/// Relay-wide error type
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    // Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    // Listener errors
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // Server errors
    #[error("Server error: {0}")]
    Server(#[source] std::io::Error),
}

impl RelayError {
    /// Get a stable error code for logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Bind { .. } => "BIND_ERROR",
            Self::Server(_) => "SERVER_ERROR",
        }
    }

    /// Create a bind error for an address
    pub fn bind(addr: impl fmt::Display, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.to_string(),
            source,
        }
    }
}

/// Result type alias for relay operations
pub type RelayResult<T> = Result<T, RelayError>;
