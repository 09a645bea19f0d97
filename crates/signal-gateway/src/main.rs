//! Signaling relay entry point
//!
//! Run with:
//! ```bash
//! cargo run -p signal-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use signal_common::{try_init_tracing_with_config, RelayConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load configuration first: the environment decides the log format
    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(&TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        name = %config.app.name,
        env = ?config.app.env,
        address = %config.server.address(),
        "Starting signaling relay"
    );

    if let Err(e) = signal_gateway::run(config).await {
        error!(error = %e, code = e.error_code(), "Relay failed");
        std::process::exit(1);
    }
}
