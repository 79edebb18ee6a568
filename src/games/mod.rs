//! Game implementations.

/// Othello rules engine and domain types.
pub mod othello;
