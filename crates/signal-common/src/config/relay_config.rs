//! Relay configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Main relay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub socket: SocketConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Listening endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Per-connection WebSocket limits
#[derive(Debug, Clone, Deserialize)]
pub struct SocketConfig {
    /// Largest inbound message accepted by the transport, in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Capacity of each connection's outbound queue
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "signal-relay".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8765
}

fn default_max_message_size() -> usize {
    1024 * 1024
}

fn default_outbound_buffer() -> usize {
    64
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                env: default_env(),
            },
            server: ServerConfig::default(),
            socket: SocketConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables
    ///
    /// Every variable is optional; a variable that is set but cannot be
    /// parsed is an error rather than being silently replaced by its default.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let env = match lookup("APP_ENV") {
            Some(raw) => Environment::parse(&raw)
                .ok_or(ConfigError::InvalidValue("APP_ENV", raw))?,
            None => default_env(),
        };

        let config = Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env,
            },
            server: ServerConfig {
                host: lookup("RELAY_HOST").unwrap_or_else(default_host),
                port: parse_var(&lookup, "RELAY_PORT")?.unwrap_or_else(default_port),
            },
            socket: SocketConfig {
                max_message_size: parse_var(&lookup, "RELAY_MAX_MESSAGE_SIZE")?
                    .unwrap_or_else(default_max_message_size),
                outbound_buffer: parse_var(&lookup, "RELAY_OUTBOUND_BUFFER")?
                    .unwrap_or_else(default_outbound_buffer),
            },
        };

        if config.socket.outbound_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "RELAY_OUTBOUND_BUFFER",
                "must be greater than zero".to_string(),
            ));
        }

        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
