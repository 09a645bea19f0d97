//! Configuration structs

mod relay_config;

pub use relay_config::{
    AppSettings, ConfigError, Environment, RelayConfig, ServerConfig, SocketConfig,
};
