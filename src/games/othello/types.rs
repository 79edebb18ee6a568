//! Core domain types for Othello.

use serde::{Deserialize, Serialize};

/// A player in the game.
///
/// Serialized as a signed integer to match the wire format consumed by
/// the frontend: `+1` for the human, `-1` for the move oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Player {
    /// Human player (`+1` discs).
    Human,
    /// AI move oracle (`-1` discs).
    Oracle,
}

impl Player {
    /// Returns the signed cell value this player's discs carry.
    pub fn value(self) -> i8 {
        match self {
            Player::Human => 1,
            Player::Oracle => -1,
        }
    }

    /// Returns the opponent player.
    pub fn opponent(self) -> Self {
        match self {
            Player::Human => Player::Oracle,
            Player::Oracle => Player::Human,
        }
    }
}

impl From<Player> for i8 {
    fn from(player: Player) -> Self {
        player.value()
    }
}

impl TryFrom<i8> for Player {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Player::Human),
            -1 => Ok(Player::Oracle),
            other => Err(format!("invalid player value: {other}")),
        }
    }
}

/// A board coordinate, `x` = row and `y` = column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coord {
    /// Row index in `[0, n)`.
    pub x: usize,
    /// Column index in `[0, n)`.
    pub y: usize,
}

/// A move: either a coordinate placement or an explicit pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Place a disc at the coordinate.
    Place(Coord),
    /// Pass the turn (only legal when no placement is).
    Pass,
}

impl Move {
    /// Encodes this move as an action index on an `n`x`n` board.
    ///
    /// Coordinate `(r, c)` maps to `r * n + c`; `Pass` maps to `n * n`.
    pub fn to_action(self, n: usize) -> usize {
        match self {
            Move::Place(coord) => coord.x * n + coord.y,
            Move::Pass => n * n,
        }
    }

    /// Decodes an action index back into a move.
    ///
    /// Returns `None` if the index exceeds the pass sentinel `n * n`.
    pub fn from_action(action: usize, n: usize) -> Option<Self> {
        if action == n * n {
            Some(Move::Pass)
        } else if action < n * n {
            Some(Move::Place(Coord {
                x: action / n,
                y: action % n,
            }))
        } else {
            None
        }
    }
}

/// An `n`x`n` grid of signed cells.
///
/// Cell values are `0` (empty), `+1` (human disc) or `-1` (oracle disc).
/// Row 0 is the top row in the internal convention; presentation flips
/// rows exactly once at the response boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    n: usize,
    cells: Vec<i8>,
}

impl Board {
    /// Creates an empty board of side length `n`.
    pub fn empty(n: usize) -> Self {
        Self {
            n,
            cells: vec![0; n * n],
        }
    }

    /// Returns the side length.
    pub fn size(&self) -> usize {
        self.n
    }

    /// Returns the cell value at `(r, c)`.
    pub fn get(&self, r: usize, c: usize) -> i8 {
        self.cells[r * self.n + c]
    }

    /// Sets the cell value at `(r, c)`.
    pub fn set(&mut self, r: usize, c: usize, value: i8) {
        self.cells[r * self.n + c] = value;
    }

    /// Counts the discs belonging to `player`.
    pub fn count(&self, player: Player) -> usize {
        let value = player.value();
        self.cells.iter().filter(|&&cell| cell == value).count()
    }

    /// Returns the raw cells in row-major order.
    pub fn cells(&self) -> &[i8] {
        &self.cells
    }

    /// Returns the board as nested rows, for serialization.
    pub fn rows(&self) -> Vec<Vec<i8>> {
        self.cells.chunks(self.n).map(|row| row.to_vec()).collect()
    }
}
