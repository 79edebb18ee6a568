//! Othello rules engine: legal move generation, move application,
//! terminal detection and board normalization.
//!
//! All operations are pure over `(board, player)`; the session layer owns
//! the mutable state and calls in here for every transition.

use super::types::{Board, Move, Player};
use tracing::instrument;

/// The eight flip directions as `(dr, dc)` offsets.
const DIRECTIONS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Terminal outcome relative to the player passed to
/// [`Rules::terminal_result`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Both sides hold the same number of discs.
    Draw,
    /// The queried player holds more discs.
    Win,
    /// The queried player holds fewer discs.
    Loss,
}

/// Rules engine for a fixed board size.
#[derive(Debug, Clone)]
pub struct Rules {
    n: usize,
}

impl Rules {
    /// Creates a rules engine for an `n`x`n` board.
    pub fn new(n: usize) -> Self {
        debug_assert!(n >= 4 && n % 2 == 0, "board side must be even and >= 4");
        Self { n }
    }

    /// Returns the board side length.
    pub fn size(&self) -> usize {
        self.n
    }

    /// Returns the action index reserved for the pass move.
    pub fn pass_action(&self) -> usize {
        self.n * self.n
    }

    /// Builds the standard starting position: four discs around the
    /// center, human to the north-east/south-west diagonal.
    pub fn initial_board(&self) -> Board {
        let mut board = Board::empty(self.n);
        let mid = self.n / 2;
        board.set(mid - 1, mid, 1);
        board.set(mid, mid - 1, 1);
        board.set(mid - 1, mid - 1, -1);
        board.set(mid, mid, -1);
        board
    }

    /// Returns the legal action indices for `player`, sorted ascending.
    ///
    /// The pass sentinel `n * n` is included iff no coordinate move is
    /// legal.
    pub fn legal_actions(&self, board: &Board, player: Player) -> Vec<usize> {
        let mut actions = Vec::new();
        for r in 0..self.n {
            for c in 0..self.n {
                if self.captures(board, player, r, c) {
                    actions.push(r * self.n + c);
                }
            }
        }
        if actions.is_empty() {
            actions.push(self.pass_action());
        }
        actions
    }

    /// Checks whether `action` is legal for `player` on `board`.
    pub fn is_legal(&self, board: &Board, player: Player, action: usize) -> bool {
        match Move::from_action(action, self.n) {
            Some(Move::Pass) => !self.has_coordinate_move(board, player),
            Some(Move::Place(coord)) => self.captures(board, player, coord.x, coord.y),
            None => false,
        }
    }

    /// Applies `action` for `player`, returning the successor board and
    /// the player to move next. The input board is left untouched.
    ///
    /// The caller must have validated legality; applying an illegal
    /// placement flips nothing but still places the disc.
    #[instrument(skip(self, board), fields(n = self.n))]
    pub fn apply(&self, board: &Board, player: Player, action: usize) -> (Board, Player) {
        let mut next = board.clone();
        if let Some(Move::Place(coord)) = Move::from_action(action, self.n) {
            let value = player.value();
            next.set(coord.x, coord.y, value);
            for (dr, dc) in DIRECTIONS {
                for (r, c) in self.bracketed_run(board, player, coord.x, coord.y, dr, dc) {
                    next.set(r, c, value);
                }
            }
        }
        (next, player.opponent())
    }

    /// Returns the terminal outcome for `player`, or `None` while either
    /// side still has a coordinate move.
    pub fn terminal_result(&self, board: &Board, player: Player) -> Option<Outcome> {
        if self.has_coordinate_move(board, player)
            || self.has_coordinate_move(board, player.opponent())
        {
            return None;
        }
        let own = board.count(player) as isize;
        let other = board.count(player.opponent()) as isize;
        Some(match own.cmp(&other) {
            std::cmp::Ordering::Equal => Outcome::Draw,
            std::cmp::Ordering::Greater => Outcome::Win,
            std::cmp::Ordering::Less => Outcome::Loss,
        })
    }

    /// Returns the canonical form of `board` for `player`: every cell is
    /// multiplied by the player's sign, so the side to move always sees
    /// itself as `+1`.
    pub fn canonical_form(&self, board: &Board, player: Player) -> Board {
        let value = player.value();
        let mut canonical = board.clone();
        for r in 0..self.n {
            for c in 0..self.n {
                canonical.set(r, c, board.get(r, c) * value);
            }
        }
        canonical
    }

    /// Reverses the row order of `board`. Involutory: applying it twice
    /// reproduces the input.
    pub fn flip_vertical(board: &Board) -> Board {
        let n = board.size();
        let mut flipped = board.clone();
        for r in 0..n {
            for c in 0..n {
                flipped.set(r, c, board.get(n - 1 - r, c));
            }
        }
        flipped
    }

    fn has_coordinate_move(&self, board: &Board, player: Player) -> bool {
        (0..self.n).any(|r| (0..self.n).any(|c| self.captures(board, player, r, c)))
    }

    /// Checks whether placing at `(r, c)` captures in any direction.
    fn captures(&self, board: &Board, player: Player, r: usize, c: usize) -> bool {
        board.get(r, c) == 0
            && DIRECTIONS
                .iter()
                .any(|&(dr, dc)| !self.bracketed_run(board, player, r, c, dr, dc).is_empty())
    }

    /// Walks from `(r, c)` along `(dr, dc)` and returns the run of
    /// opponent discs bracketed by one of `player`'s own discs, or an
    /// empty vector when the run is unbracketed.
    fn bracketed_run(
        &self,
        board: &Board,
        player: Player,
        r: usize,
        c: usize,
        dr: isize,
        dc: isize,
    ) -> Vec<(usize, usize)> {
        let own = player.value();
        let mut run = Vec::new();
        let mut r = r as isize + dr;
        let mut c = c as isize + dc;
        while r >= 0 && r < self.n as isize && c >= 0 && c < self.n as isize {
            match board.get(r as usize, c as usize) {
                cell if cell == own => return run,
                0 => break,
                _ => run.push((r as usize, c as usize)),
            }
            r += dr;
            c += dc;
        }
        Vec::new()
    }
}
