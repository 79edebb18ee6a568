//! Move oracle: the search-and-evaluate engine the session consults for
//! AI turns.
//!
//! The session layer only depends on the [`MoveOracle`] trait; the
//! shipped implementation is a deterministic one-ply positional
//! evaluator. A configured weight table that fails to load degrades to
//! an unavailable oracle rather than crashing the server.

use crate::games::othello::{Board, Player, Rules};
use derive_more::{Display, Error};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Selects actions for the oracle side.
///
/// `canonical` is normalized so the side to move is always `+1`
/// (the maximizing side). `temperature` controls exploration; the
/// session controller always passes `0.0`, the fully deterministic
/// highest-evaluated action.
pub trait MoveOracle: Send + Sync {
    /// Returns the chosen action index in `[0, n * n]`.
    fn select_action(&self, canonical: &Board, temperature: f64) -> usize;
}

/// Failure to construct an oracle from a weight table.
#[derive(Debug, Display, Error)]
pub enum WeightsError {
    /// The weight file could not be read.
    #[display("failed to read weight table: {_0}")]
    Io(std::io::Error),
    /// The weight file is not a JSON array of integers.
    #[display("failed to parse weight table: {_0}")]
    Parse(serde_json::Error),
    /// The table length does not match the board area.
    #[display("weight table has {found} entries, expected {expected}")]
    Dimension {
        /// Expected entry count (`n * n`).
        expected: usize,
        /// Entries actually present.
        found: usize,
    },
}

/// Deterministic one-ply oracle scoring successor positions with a
/// positional weight table.
#[derive(Debug, Clone)]
pub struct HeuristicOracle {
    rules: Rules,
    weights: Vec<i32>,
}

impl HeuristicOracle {
    /// Creates an oracle with the built-in weight table for an `n`x`n`
    /// board: corners dominate, corner-adjacent squares are penalized,
    /// edges are mildly favored.
    pub fn new(n: usize) -> Self {
        Self {
            rules: Rules::new(n),
            weights: default_weights(n),
        }
    }

    /// Creates an oracle with an explicit weight table of `n * n`
    /// entries in row-major order.
    pub fn with_weights(n: usize, weights: Vec<i32>) -> Result<Self, WeightsError> {
        if weights.len() != n * n {
            return Err(WeightsError::Dimension {
                expected: n * n,
                found: weights.len(),
            });
        }
        Ok(Self {
            rules: Rules::new(n),
            weights,
        })
    }

    /// Loads a JSON weight table (a flat array of `n * n` integers)
    /// from `path`.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_weights_file(n: usize, path: impl AsRef<Path>) -> Result<Self, WeightsError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(WeightsError::Io)?;
        let weights: Vec<i32> = serde_json::from_str(&raw).map_err(WeightsError::Parse)?;
        let oracle = Self::with_weights(n, weights)?;
        info!(n, "loaded oracle weight table");
        Ok(oracle)
    }

    /// Scores the position reached by playing `action` as the `+1` side
    /// on the canonical board.
    fn score(&self, canonical: &Board, action: usize) -> i64 {
        if action == self.rules.pass_action() {
            // A pass is only in the legal set when nothing else is.
            return i64::MIN;
        }
        let (next, _) = self.rules.apply(canonical, Player::Human, action);
        let n = next.size();
        let mut score = 0i64;
        for r in 0..n {
            for c in 0..n {
                score += i64::from(next.get(r, c)) * i64::from(self.weights[r * n + c]);
            }
        }
        score
    }
}

impl MoveOracle for HeuristicOracle {
    /// Argmax over the legal set; ties break toward the lowest action
    /// index, so selection is deterministic at every temperature.
    fn select_action(&self, canonical: &Board, _temperature: f64) -> usize {
        let legal = self.rules.legal_actions(canonical, Player::Human);
        let mut best = legal[0];
        let mut best_score = self.score(canonical, best);
        for &action in &legal[1..] {
            let score = self.score(canonical, action);
            if score > best_score {
                best = action;
                best_score = score;
            }
        }
        debug!(action = best, score = best_score, "oracle selected action");
        best
    }
}

/// Built-in positional weights for an `n`x`n` board.
fn default_weights(n: usize) -> Vec<i32> {
    let edge = |i: usize| i == 0 || i == n - 1;
    let near_edge = |i: usize| i == 1 || i == n - 2;
    let mut weights = vec![1; n * n];
    for r in 0..n {
        for c in 0..n {
            let weight = match (edge(r), edge(c)) {
                (true, true) => 100,
                (true, false) | (false, true) if near_edge(c) || near_edge(r) => -20,
                (true, false) | (false, true) => 10,
                (false, false) if near_edge(r) && near_edge(c) => -50,
                (false, false) => 1,
            };
            weights[r * n + c] = weight;
        }
    }
    weights
}
