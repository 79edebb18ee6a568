//! Game session management: board ownership, turn alternation, the
//! undo-capable history stack and the session store.
//!
//! One [`GameSession`] owns one board and one history stack. Snapshots
//! are independent copies, so later board mutation can never corrupt
//! history. Boards are always stored unflipped (row 0 = top); the
//! presentation boundary applies the vertical flip exactly once.

use crate::error::GameError;
use crate::games::othello::{Board, Coord, Move, Player, Rules};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Unique identifier for a game session.
pub type SessionId = String;

/// An immutable `(board, player-to-move)` pair stored for undo.
#[derive(Debug, Clone)]
pub struct Snapshot {
    board: Board,
    to_move: Player,
}

impl Snapshot {
    fn new(board: Board, to_move: Player) -> Self {
        Self { board, to_move }
    }

    /// The board at the time of capture.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The player to move at the time of capture.
    pub fn to_move(&self) -> Player {
        self.to_move
    }
}

/// Ordered sequence of snapshots, oldest first.
///
/// Holds at least one snapshot from creation until reset. Push happens
/// exactly once per committed move; rejected moves never push.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    snapshots: Vec<Snapshot>,
}

impl HistoryStack {
    fn new(initial: Snapshot) -> Self {
        Self {
            snapshots: vec![initial],
        }
    }

    fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    fn reset(&mut self, initial: Snapshot) {
        self.snapshots.clear();
        self.snapshots.push(initial);
    }

    /// Number of snapshots currently held.
    pub fn depth(&self) -> usize {
        self.snapshots.len()
    }

    fn top(&self) -> &Snapshot {
        self.snapshots.last().expect("history stack is never empty")
    }

    /// Pops for one undo operation and returns the snapshot to restore.
    ///
    /// Branches on depth `L`:
    /// - `L < 2`: nothing beyond the initial snapshot, rejected.
    /// - `L == 2`: pop one (an oracle move committed right after game
    ///   start, with no human move to pair with).
    /// - `L >= 3`: pop two, undoing the oracle reply and the human move
    ///   that provoked it as one atomic unit.
    ///
    /// Nothing is popped on the rejection path.
    fn pop_for_undo(&mut self) -> Result<&Snapshot, GameError> {
        match self.snapshots.len() {
            0 | 1 => Err(GameError::UndoUnavailable),
            2 => {
                self.snapshots.pop();
                Ok(self.top())
            }
            _ => {
                self.snapshots.pop();
                self.snapshots.pop();
                Ok(self.top())
            }
        }
    }
}

/// Terminal status derived by the game-end evaluator.
///
/// The winner is recomputed from absolute disc counts rather than taken
/// from the rules engine's outcome label, so an adapter with different
/// tie-break conventions cannot flip the reported winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// The game continues.
    Ongoing,
    /// The game ended.
    Finished {
        /// Winning player, `None` for a draw.
        winner: Option<Player>,
        /// Human disc count.
        human_discs: usize,
        /// Oracle disc count.
        oracle_discs: usize,
    },
}

impl GameStatus {
    /// Whether the game has ended.
    pub fn is_over(&self) -> bool {
        matches!(self, GameStatus::Finished { .. })
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Ongoing => write!(f, "Ongoing"),
            GameStatus::Finished {
                winner,
                human_discs,
                oracle_discs,
            } => match winner {
                Some(Player::Human) => write!(
                    f,
                    "Game Over: Human (O) Wins! Score: {human_discs} vs {oracle_discs}"
                ),
                Some(Player::Oracle) => write!(
                    f,
                    "Game Over: AI (X) Wins! Score: {human_discs} vs {oracle_discs}"
                ),
                None => write!(
                    f,
                    "Game Over: Draw. Score: {human_discs} vs {oracle_discs}"
                ),
            },
        }
    }
}

/// A human move candidate as submitted by the caller, before any
/// validation. Coordinates are in display orientation.
#[derive(Debug, Clone, Copy)]
pub struct MoveCandidate {
    /// Row, if provided.
    pub x: Option<usize>,
    /// Column, if provided.
    pub y: Option<usize>,
    /// Whether the caller explicitly flagged a pass.
    pub pass: bool,
}

/// A single match between the human and the move oracle.
///
/// Every state-mutating operation either commits fully (board, player,
/// history and last-move all updated) or rejects with the session
/// byte-for-byte unchanged.
#[derive(Debug, Clone)]
pub struct GameSession {
    id: SessionId,
    rules: Rules,
    board: Board,
    to_move: Player,
    last_move: Option<Coord>,
    history: HistoryStack,
    first_player: Player,
}

impl GameSession {
    /// Creates a session with a fresh `size`x`size` game.
    #[instrument]
    pub fn new(id: SessionId, size: usize, first_player: Player) -> Self {
        info!(session_id = %id, size, ?first_player, "Creating new game session");
        let rules = Rules::new(size);
        let board = rules.initial_board();
        let history = HistoryStack::new(Snapshot::new(board.clone(), first_player));
        Self {
            id,
            rules,
            board,
            to_move: first_player,
            last_move: None,
            history,
            first_player,
        }
    }

    /// Resets to a fresh game, rebuilding the rules engine only when the
    /// size changed. History collapses to a single initial snapshot.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn reset(&mut self, size: usize, first_player: Player) {
        if size != self.rules.size() {
            info!(
                old = self.rules.size(),
                new = size,
                "Board size changed, rebuilding rules"
            );
            self.rules = Rules::new(size);
        }
        self.board = self.rules.initial_board();
        self.to_move = first_player;
        self.first_player = first_player;
        self.last_move = None;
        self.history
            .reset(Snapshot::new(self.board.clone(), first_player));
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Board side length.
    pub fn size(&self) -> usize {
        self.rules.size()
    }

    /// Current board, internal orientation.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Player to move.
    pub fn to_move(&self) -> Player {
        self.to_move
    }

    /// Last committed coordinate move in display orientation, `None`
    /// after a pass, an undo or a new game.
    pub fn last_move(&self) -> Option<Coord> {
        self.last_move
    }

    /// Which player moved first in the current game.
    pub fn first_player(&self) -> Player {
        self.first_player
    }

    /// Current history depth: 1 + committed moves since the last reset.
    pub fn history_depth(&self) -> usize {
        self.history.depth()
    }

    /// Derives the terminal status and score differential.
    pub fn status(&self) -> GameStatus {
        match self.rules.terminal_result(&self.board, self.to_move) {
            None => GameStatus::Ongoing,
            Some(_) => {
                let human_discs = self.board.count(Player::Human);
                let oracle_discs = self.board.count(Player::Oracle);
                let winner = match human_discs.cmp(&oracle_discs) {
                    std::cmp::Ordering::Equal => None,
                    std::cmp::Ordering::Greater => Some(Player::Human),
                    std::cmp::Ordering::Less => Some(Player::Oracle),
                };
                GameStatus::Finished {
                    winner,
                    human_discs,
                    oracle_discs,
                }
            }
        }
    }

    /// Legal coordinate moves for the player to move, display
    /// orientation. Excludes the pass sentinel.
    pub fn legal_coordinate_moves(&self) -> Vec<Coord> {
        let n = self.rules.size();
        self.rules
            .legal_actions(&self.board, self.to_move)
            .into_iter()
            .filter_map(|action| match Move::from_action(action, n) {
                Some(Move::Place(coord)) => Some(self.to_display(coord)),
                _ => None,
            })
            .collect()
    }

    /// Whether a pass is the only legal move and the game continues.
    pub fn pass_available(&self) -> bool {
        self.rules
            .is_legal(&self.board, self.to_move, self.rules.pass_action())
            && !self.status().is_over()
    }

    /// Whether the oracle is to move.
    pub fn oracle_to_move(&self) -> bool {
        self.to_move == Player::Oracle
    }

    /// Canonical board for the oracle's evaluation.
    ///
    /// Only meaningful when the oracle is to move; callers guard with
    /// [`GameSession::oracle_to_move`].
    pub fn canonical_board(&self) -> Board {
        self.rules.canonical_form(&self.board, Player::Oracle)
    }

    /// Executes a human move candidate.
    ///
    /// Rejection order: `NotYourTurn`, `GameAlreadyOver`,
    /// `InvalidCoordinates`, `IllegalMove`. No rejection path mutates
    /// the session.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn human_move(&mut self, candidate: MoveCandidate) -> Result<(), GameError> {
        if self.to_move != Player::Human {
            warn!("Human move submitted out of turn");
            return Err(GameError::NotYourTurn);
        }
        if self.status().is_over() {
            warn!("Human move submitted after game end");
            return Err(GameError::GameAlreadyOver);
        }
        let mv = self.translate(candidate)?;
        let action = self.to_internal_action(mv);
        if !self.rules.is_legal(&self.board, Player::Human, action) {
            warn!(action, "Illegal human move rejected");
            return Err(GameError::IllegalMove);
        }

        self.commit(Player::Human, action, mv);
        info!(action, depth = self.history.depth(), "Human move committed");
        Ok(())
    }

    /// Applies an oracle-selected action.
    ///
    /// The caller obtains `action` from the move oracle evaluated on
    /// [`GameSession::canonical_board`]. Rejects with `NotAITurn` when
    /// the oracle is not to move and `GameAlreadyOver` on a terminal
    /// position; an out-of-contract oracle choice surfaces as
    /// `OracleUnavailable` without mutating the session.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn apply_oracle_action(&mut self, action: usize) -> Result<(), GameError> {
        if self.to_move != Player::Oracle {
            warn!("AI move requested on human turn");
            return Err(GameError::NotAITurn);
        }
        if self.status().is_over() {
            warn!("AI move requested after game end");
            return Err(GameError::GameAlreadyOver);
        }
        if !self.rules.is_legal(&self.board, Player::Oracle, action) {
            warn!(action, "Oracle selected an illegal action");
            return Err(GameError::OracleUnavailable(format!(
                "oracle selected illegal action {action}"
            )));
        }

        let n = self.rules.size();
        let mv = match Move::from_action(action, n) {
            Some(Move::Place(coord)) => Move::Place(self.to_display(coord)),
            _ => Move::Pass,
        };
        self.commit(Player::Oracle, action, mv);
        info!(action, depth = self.history.depth(), "Oracle move committed");
        Ok(())
    }

    /// Reverts one human+oracle move pair, or one oracle move in the
    /// oracle-moved-first edge case. Clears the last move; undo does not
    /// reconstruct prior move coordinates.
    #[instrument(skip(self), fields(session_id = %self.id, depth = self.history.depth()))]
    pub fn undo(&mut self) -> Result<(), GameError> {
        let restored = self.history.pop_for_undo()?;
        self.board = restored.board().clone();
        self.to_move = restored.to_move();
        self.last_move = None;
        info!(depth = self.history.depth(), "Undo committed");
        Ok(())
    }

    /// Validates candidate shape and bounds. Ordering matters: a flagged
    /// pass never reports `InvalidCoordinates`.
    fn translate(&self, candidate: MoveCandidate) -> Result<Move, GameError> {
        if candidate.pass {
            return Ok(Move::Pass);
        }
        match (candidate.x, candidate.y) {
            (Some(x), Some(y)) if x < self.rules.size() && y < self.rules.size() => {
                Ok(Move::Place(Coord { x, y }))
            }
            _ => Err(GameError::InvalidCoordinates),
        }
    }

    /// Maps a display-oriented move to an internal action index.
    fn to_internal_action(&self, mv: Move) -> usize {
        let n = self.rules.size();
        match mv {
            Move::Pass => self.rules.pass_action(),
            Move::Place(coord) => (n - 1 - coord.x) * n + coord.y,
        }
    }

    /// Maps an internal coordinate to display orientation. Involutory,
    /// the mirror of [`GameSession::to_internal_action`].
    fn to_display(&self, coord: Coord) -> Coord {
        Coord {
            x: self.rules.size() - 1 - coord.x,
            y: coord.y,
        }
    }

    /// Applies a validated action and pushes exactly one snapshot.
    fn commit(&mut self, player: Player, action: usize, display_move: Move) {
        let (board, next) = self.rules.apply(&self.board, player, action);
        self.board = board;
        self.to_move = next;
        self.last_move = match display_move {
            Move::Place(coord) => Some(coord),
            Move::Pass => None,
        };
        self.history
            .push(Snapshot::new(self.board.clone(), self.to_move));
    }
}

/// Session store keyed by [`SessionId`], one lock per session.
///
/// The map lock is held only for lookups; each session carries its own
/// async mutex so mutations on one session never serialize another.
#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    sessions: Arc<StdMutex<HashMap<SessionId, Arc<Mutex<GameSession>>>>>,
}

impl SessionManager {
    /// Creates an empty session store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `id`, creating a fresh game with the
    /// given defaults when absent.
    #[instrument(skip(self))]
    pub fn get_or_create(
        &self,
        id: &str,
        default_size: usize,
        default_first: Player,
    ) -> Arc<Mutex<GameSession>> {
        let mut sessions = self.sessions.lock().expect("session map lock poisoned");
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                debug!(session_id = id, "Creating session on first use");
                Arc::new(Mutex::new(GameSession::new(
                    id.to_string(),
                    default_size,
                    default_first,
                )))
            })
            .clone()
    }
}
