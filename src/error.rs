//! Error taxonomy for session operations.
//!
//! Every variant is local and recoverable: the session is left untouched
//! on each rejection path and the caller receives the unchanged state.

use derive_more::{Display, Error};

/// A rejected session operation.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum GameError {
    /// A human move was submitted while the oracle is to move.
    #[display("Not your turn")]
    NotYourTurn,
    /// A move was submitted after the game reached a terminal state.
    #[display("Game is already over")]
    GameAlreadyOver,
    /// A coordinate move was missing a field and was not flagged as a
    /// pass, or a coordinate fell outside the board.
    #[display("Invalid move coordinates")]
    InvalidCoordinates,
    /// The move is not in the legal set for the current position.
    #[display("Illegal move")]
    IllegalMove,
    /// An AI move was requested while the human is to move.
    #[display("Not AI turn")]
    NotAITurn,
    /// No undoable move pair exists beyond the initial snapshot.
    #[display("Cannot undo further: only the initial state remains")]
    UndoUnavailable,
    /// The move oracle failed to initialize; the session still serves
    /// state queries and human-side operations.
    #[display("Move oracle unavailable: {_0}")]
    OracleUnavailable(#[error(not(source))] String),
    /// The oracle call exceeded the operation timeout. Retryable; the
    /// session is unchanged.
    #[display("Move oracle timed out")]
    OracleTimeout,
}
