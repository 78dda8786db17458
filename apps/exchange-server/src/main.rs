//! ECDH Exchange Server
//!
//! Answers key exchanges over HTTP and WebSocket and opens/seals messages
//! with the per-session derived key.

mod config;
mod error;
mod routes;
mod state;
mod ws;

use std::time::Duration;

use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use config::ServerConfig;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("exchange_server=debug".parse()?)
                .add_directive("crypto_session=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let config = ServerConfig::parse();
    info!("Starting ECDH exchange server");

    let state = AppState::new(config.max_sessions).with_session_ttl(config.session_ttl());
    spawn_session_sweeper(state.clone());

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(config.cors_layer()?);

    let addr = config.bind_addr();
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Periodically drop HTTP sessions that clients abandoned without a DELETE
fn spawn_session_sweeper(state: AppState) {
    let period = (state.session_ttl() / 2).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let evicted = state.evict_idle();
            if evicted > 0 {
                debug!("Evicted {} idle sessions", evicted);
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
