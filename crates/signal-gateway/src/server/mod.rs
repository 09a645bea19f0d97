//! Relay server setup
//!
//! Provides the WebSocket listener configuration and routes.

mod handler;
mod state;

pub use handler::{handle_socket, relay_handler, CloseReason};
pub use state::RelayState;

use axum::{routing::get, Router};
use signal_common::{RelayConfig, RelayError, RelayResult};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Create the relay router
///
/// The WebSocket endpoint answers on both `/` and `/ws`.
pub fn create_router() -> Router<RelayState> {
    Router::new()
        .route("/", get(relay_handler))
        .route("/ws", get(relay_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: RelayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the listening endpoint
pub async fn bind(address: &str) -> RelayResult<TcpListener> {
    TcpListener::bind(address)
        .await
        .map_err(|e| RelayError::bind(address, e))
}

/// Serve `app` on `listener` until SIGINT/SIGTERM
pub async fn run_server(app: Router, listener: TcpListener) -> RelayResult<()> {
    let addr = listener.local_addr().map_err(RelayError::Server)?;
    tracing::info!("Signaling relay listening on ws://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, stopping relay");
        })
        .await
        .map_err(RelayError::Server)
}

/// Run the complete relay with configuration
pub async fn run(config: RelayConfig) -> RelayResult<()> {
    let listener = bind(&config.server.address()).await?;
    let state = RelayState::new(config);

    run_server(create_app(state), listener).await
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
