//! Othello session server library.
//!
//! Mediates a turn-based Othello match between a human player and a
//! deterministic move oracle.
//!
//! # Architecture
//!
//! - **games::othello**: the rules engine (legal moves, flips, terminal
//!   detection, canonical form, orientation transform)
//! - **oracle**: the move-selection seam and its deterministic
//!   heuristic implementation
//! - **session**: the state machine — history stack, undo, turn
//!   alternation, game-end evaluation, session store
//! - **server**: the axum REST surface the frontend talks to

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod games;
pub mod oracle;
pub mod server;
pub mod session;

// Crate-level exports - error taxonomy
pub use error::GameError;

// Crate-level exports - game types
pub use games::othello::{Board, Coord, Move, Outcome, Player, Rules};

// Crate-level exports - oracle
pub use oracle::{HeuristicOracle, MoveOracle};

// Crate-level exports - session management
pub use session::{GameSession, GameStatus, HistoryStack, MoveCandidate, SessionManager, Snapshot};

// Crate-level exports - server types
pub use server::{AppState, ServerConfig, SessionView, create_app};
