mod rules;
mod types;

pub use rules::{Outcome, Rules};
pub use types::{Board, Coord, Move, Player};
