//! REST API for the game session controller.
//!
//! Route-for-route mirror of the frontend contract: `new`, `human_move`,
//! `ai_move`, `undo_move` plus a read-only `state` query and a health
//! probe. Boards cross this boundary in display orientation (row 0 =
//! bottom); internally everything stays unflipped. Errors carry the
//! unchanged history depth so the caller can resynchronize.

use crate::error::GameError;
use crate::games::othello::{Board, Coord, Player, Rules};
use crate::oracle::{HeuristicOracle, MoveOracle};
use crate::session::{GameSession, MoveCandidate, SessionManager};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, instrument, warn};

/// Session id used when the caller does not name one.
const DEFAULT_SESSION: &str = "default";

/// Server configuration, resolved from CLI flags and environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Default board side for fresh sessions.
    pub default_size: usize,
    /// Minimum wall-clock duration of an AI move response.
    pub ai_min_latency: Duration,
    /// Operation-level timeout on a single oracle call.
    pub oracle_timeout: Duration,
    /// Optional JSON weight table for the oracle; a missing or invalid
    /// file degrades AI moves to `OracleUnavailable`.
    pub weights_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_size: 8,
            ai_min_latency: Duration::from_millis(500),
            oracle_timeout: Duration::from_secs(10),
            weights_path: None,
        }
    }
}

/// Shared application state.
pub struct AppState {
    sessions: SessionManager,
    config: ServerConfig,
    /// A fixed oracle serving every board size, set via
    /// [`AppState::with_oracle`]. Takes precedence over the cache.
    oracle_override: Option<Arc<dyn MoveOracle>>,
    /// Oracle per board size, built lazily; failures are cached so a
    /// broken weight table is reported once per size, not re-read per
    /// request.
    oracles: StdMutex<HashMap<usize, Result<Arc<dyn MoveOracle>, String>>>,
}

impl AppState {
    /// Creates state with an empty session store.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            sessions: SessionManager::new(),
            config,
            oracle_override: None,
            oracles: StdMutex::new(HashMap::new()),
        }
    }

    /// Creates state that serves every AI move from `oracle`, bypassing
    /// the per-size weight-table construction. This is the seam for
    /// swapping in alternative [`MoveOracle`] implementations.
    pub fn with_oracle(config: ServerConfig, oracle: Arc<dyn MoveOracle>) -> Self {
        Self {
            sessions: SessionManager::new(),
            config,
            oracle_override: Some(oracle),
            oracles: StdMutex::new(HashMap::new()),
        }
    }

    /// Returns the oracle for an `n`x`n` board, constructing it on
    /// first use.
    fn oracle_for(&self, n: usize) -> Result<Arc<dyn MoveOracle>, GameError> {
        if let Some(oracle) = &self.oracle_override {
            return Ok(oracle.clone());
        }
        let mut oracles = self.oracles.lock().expect("oracle cache lock poisoned");
        oracles
            .entry(n)
            .or_insert_with(|| build_oracle(&self.config, n))
            .clone()
            .map_err(GameError::OracleUnavailable)
    }
}

fn build_oracle(config: &ServerConfig, n: usize) -> Result<Arc<dyn MoveOracle>, String> {
    match &config.weights_path {
        Some(path) => match HeuristicOracle::from_weights_file(n, path) {
            Ok(oracle) => Ok(Arc::new(oracle)),
            Err(e) => {
                warn!(n, error = %e, "Oracle weight table failed to load, AI moves disabled");
                Err(e.to_string())
            }
        },
        None => Ok(Arc::new(HeuristicOracle::new(n))),
    }
}

/// Builds the application router. Separated from serving for tests.
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/game/new", post(new_game))
        .route("/api/game/human_move", post(human_move))
        .route("/api/game/ai_move", post(ai_move))
        .route("/api/game/undo_move", post(undo_move))
        .route("/api/game/state", get(game_state))
        .layer(cors)
        .with_state(state)
}

// ─── Wire types ──────────────────────────────────────────────

/// Request body for `POST /api/game/new`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NewGameRequest {
    /// Board side length, defaults to the server's configured size.
    pub size: Option<usize>,
    /// `+1` for human first (default), `-1` for oracle first. Any value
    /// other than `-1` selects the human.
    pub first_player: Option<i8>,
    /// Session to reset; omitted means the default session.
    pub session_id: Option<String>,
}

/// Request body for `POST /api/game/human_move`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct HumanMoveRequest {
    /// Row in display orientation.
    pub x: Option<usize>,
    /// Column.
    pub y: Option<usize>,
    /// `"pass"` to play the pass move instead of coordinates.
    pub action: Option<String>,
    /// Target session; omitted means the default session.
    pub session_id: Option<String>,
}

/// Request body for `ai_move` and `undo_move`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SessionRequest {
    /// Target session; omitted means the default session.
    pub session_id: Option<String>,
}

/// Query parameters for `GET /api/game/state`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StateQuery {
    /// Target session; omitted means the default session.
    pub session_id: Option<String>,
}

/// Snapshot of a session as presented to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    /// Board rows in display orientation (row 0 = bottom of the
    /// internal board).
    pub board: Vec<Vec<i8>>,
    /// Legal coordinate moves for the player to move, display
    /// orientation.
    pub legal_moves: Vec<Coord>,
    /// Whether the only legal move is a pass.
    pub can_pass: bool,
    /// Player to move: `+1` human, `-1` oracle.
    pub current_player: i8,
    /// Last committed coordinate move, `None` after a pass, undo or
    /// new game.
    pub last_move: Option<Coord>,
    /// Human-readable game status.
    pub status: String,
    /// History depth: 1 + committed moves since the last new game.
    pub history_length: usize,
}

impl SessionView {
    /// Renders a session, applying the orientation flip exactly once.
    pub fn from_session(session: &GameSession) -> Self {
        let display: Board = Rules::flip_vertical(session.board());
        Self {
            board: display.rows(),
            legal_moves: session.legal_coordinate_moves(),
            can_pass: session.pass_available(),
            current_player: session.to_move().value(),
            last_move: session.last_move(),
            status: session.status().to_string(),
            history_length: session.history_depth(),
        }
    }
}

/// Error response: the rejection message plus the unchanged depth.
#[derive(Debug)]
pub struct ApiError {
    error: GameError,
    history_length: usize,
}

impl ApiError {
    fn new(error: GameError, history_length: usize) -> Self {
        Self {
            error,
            history_length,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self.error {
            GameError::OracleUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GameError::OracleTimeout => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.error.to_string(),
            "history_length": self.history_length,
        });
        (self.status_code(), Json(body)).into_response()
    }
}

// ─── Handlers ────────────────────────────────────────────────

async fn health() -> &'static str {
    "ok"
}

/// Starts a fresh game, performing one oracle move first when the
/// oracle is the first player.
#[instrument(skip(state, req), fields(session_id = req.session_id.as_deref().unwrap_or(DEFAULT_SESSION)))]
async fn new_game(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewGameRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let start = Instant::now();
    let size = req.size.unwrap_or(state.config.default_size);
    let first_player = match req.first_player {
        Some(-1) => Player::Oracle,
        _ => Player::Human,
    };
    let session_id = req.session_id.as_deref().unwrap_or(DEFAULT_SESSION);

    info!(size, ?first_player, "Starting new game");
    let session = state
        .sessions
        .get_or_create(session_id, size, Player::Human);
    let mut guard = session.lock().await;
    guard.reset(size, first_player);

    let oracle_moved = if first_player == Player::Oracle && !guard.status().is_over() {
        oracle_step(&state, &mut guard).await?;
        true
    } else {
        false
    };

    let view = SessionView::from_session(&guard);
    drop(guard);
    if oracle_moved {
        enforce_latency_floor(start, state.config.ai_min_latency).await;
    }
    Ok(Json(view))
}

/// Executes a human move.
#[instrument(skip(state, req), fields(session_id = req.session_id.as_deref().unwrap_or(DEFAULT_SESSION)))]
async fn human_move(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HumanMoveRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let session_id = req.session_id.as_deref().unwrap_or(DEFAULT_SESSION);
    let session = state
        .sessions
        .get_or_create(session_id, state.config.default_size, Player::Human);
    let mut guard = session.lock().await;

    let candidate = MoveCandidate {
        x: req.x,
        y: req.y,
        pass: req.action.as_deref() == Some("pass"),
    };
    let depth = guard.history_depth();
    guard
        .human_move(candidate)
        .map_err(|e| ApiError::new(e, depth))?;
    Ok(Json(SessionView::from_session(&guard)))
}

/// Triggers one oracle move. The response is never emitted before the
/// configured latency floor, measured from entry.
#[instrument(skip(state, req), fields(session_id = req.session_id.as_deref().unwrap_or(DEFAULT_SESSION)))]
async fn ai_move(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let start = Instant::now();
    let session_id = req.session_id.as_deref().unwrap_or(DEFAULT_SESSION);
    let session = state
        .sessions
        .get_or_create(session_id, state.config.default_size, Player::Human);
    let mut guard = session.lock().await;

    oracle_step(&state, &mut guard).await?;

    let view = SessionView::from_session(&guard);
    drop(guard);
    enforce_latency_floor(start, state.config.ai_min_latency).await;
    Ok(Json(view))
}

/// Reverts one human+oracle move pair (or the lone first oracle move).
#[instrument(skip(state, req), fields(session_id = req.session_id.as_deref().unwrap_or(DEFAULT_SESSION)))]
async fn undo_move(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let session_id = req.session_id.as_deref().unwrap_or(DEFAULT_SESSION);
    let session = state
        .sessions
        .get_or_create(session_id, state.config.default_size, Player::Human);
    let mut guard = session.lock().await;

    let depth = guard.history_depth();
    guard.undo().map_err(|e| ApiError::new(e, depth))?;
    Ok(Json(SessionView::from_session(&guard)))
}

/// Read-only session snapshot, served under the session lock.
#[instrument(skip(state, query), fields(session_id = query.session_id.as_deref().unwrap_or(DEFAULT_SESSION)))]
async fn game_state(
    State(state): State<Arc<AppState>>,
    axum::extract::Query(query): axum::extract::Query<StateQuery>,
) -> Json<SessionView> {
    let session_id = query.session_id.as_deref().unwrap_or(DEFAULT_SESSION);
    let session = state
        .sessions
        .get_or_create(session_id, state.config.default_size, Player::Human);
    let guard = session.lock().await;
    Json(SessionView::from_session(&guard))
}

// ─── Oracle orchestration ────────────────────────────────────

/// Runs the turn guard, oracle call and state transition for one AI
/// move. The oracle runs off the async runtime under a timeout; on
/// timeout or failure the session is untouched and the call can be
/// retried.
async fn oracle_step(state: &AppState, session: &mut GameSession) -> Result<(), ApiError> {
    let depth = session.history_depth();
    let fail = |e: GameError| ApiError::new(e, depth);

    if !session.oracle_to_move() {
        return Err(fail(GameError::NotAITurn));
    }
    if session.status().is_over() {
        return Err(fail(GameError::GameAlreadyOver));
    }
    let oracle = state.oracle_for(session.size()).map_err(fail)?;
    let canonical = session.canonical_board();
    let action = invoke_oracle(oracle, canonical, state.config.oracle_timeout)
        .await
        .map_err(fail)?;
    session.apply_oracle_action(action).map_err(fail)?;
    Ok(())
}

/// Invokes the oracle on a blocking thread with an operation timeout.
/// Temperature is always 0: fully deterministic selection.
async fn invoke_oracle(
    oracle: Arc<dyn MoveOracle>,
    canonical: Board,
    timeout: Duration,
) -> Result<usize, GameError> {
    let task = tokio::task::spawn_blocking(move || oracle.select_action(&canonical, 0.0));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(action)) => Ok(action),
        Ok(Err(join_err)) => Err(GameError::OracleUnavailable(format!(
            "oracle task failed: {join_err}"
        ))),
        Err(_) => {
            warn!("Oracle call exceeded timeout");
            Err(GameError::OracleTimeout)
        }
    }
}

/// Blocks the response (never the session lock) until the latency floor
/// is reached. The oracle is never re-run.
async fn enforce_latency_floor(start: Instant, floor: Duration) {
    let elapsed = start.elapsed();
    if elapsed < floor {
        tokio::time::sleep(floor - elapsed).await;
    }
}
