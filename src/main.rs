//! Othello session server entry point.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use othello_server::server::{create_app, AppState, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            host,
            ai_min_latency_ms,
            oracle_timeout_ms,
            board_size,
            weights,
        } => {
            let port = port
                .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
                .unwrap_or(7860);

            let config = ServerConfig {
                default_size: board_size,
                ai_min_latency: Duration::from_millis(ai_min_latency_ms),
                oracle_timeout: Duration::from_millis(oracle_timeout_ms),
                weights_path: weights,
            };

            info!(port, %host, "Starting Othello session server");
            let state = Arc::new(AppState::new(config));
            let app = create_app(state);

            let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
            info!("Server ready at http://{}:{}/", host, port);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            info!("Server shut down gracefully");
            Ok(())
        }
    }
}

/// Completes when a shutdown signal is received.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Shutdown signal received, stopping server");
}
