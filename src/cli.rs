//! Command-line interface for othello_server.

use clap::{Parser, Subcommand};

/// Othello game session server with a deterministic move oracle
#[derive(Parser, Debug)]
#[command(name = "othello_server")]
#[command(about = "Othello session server for the browser frontend", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP game server
    Serve {
        /// Port to bind to; falls back to the PORT environment
        /// variable, then 7860
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Minimum AI move response time in milliseconds
        #[arg(long, default_value = "500")]
        ai_min_latency_ms: u64,

        /// Oracle call timeout in milliseconds
        #[arg(long, default_value = "10000")]
        oracle_timeout_ms: u64,

        /// Default board side length for fresh sessions
        #[arg(long, default_value = "8")]
        board_size: usize,

        /// Path to a JSON oracle weight table (flat array of n*n
        /// integers). When unreadable, AI moves degrade to errors
        /// instead of crashing the server.
        #[arg(long)]
        weights: Option<std::path::PathBuf>,
    },
}
