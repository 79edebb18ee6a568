//! Router-level tests for the REST surface, including the AI latency
//! floor.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use othello_server::{create_app, AppState, Board, MoveOracle, ServerConfig, SessionView};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceExt;

/// Short floor keeps the latency tests fast but measurable.
const TEST_FLOOR: Duration = Duration::from_millis(150);

fn test_app() -> Router {
    let config = ServerConfig {
        ai_min_latency: TEST_FLOOR,
        ..ServerConfig::default()
    };
    create_app(Arc::new(AppState::new(config)))
}

async fn post_json(app: &Router, uri: &str, json: serde_json::Value) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn view(body: &str) -> SessionView {
    serde_json::from_str(body).expect("response should be a SessionView")
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_new_game_defaults() {
    let app = test_app();
    let (status, body) = post_json(&app, "/api/game/new", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let view = view(&body);
    assert_eq!(view.history_length, 1);
    assert_eq!(view.current_player, 1);
    assert_eq!(view.legal_moves.len(), 4);
    assert_eq!(view.status, "Ongoing");
    assert_eq!(view.last_move, None);
    assert!(!view.can_pass);

    // 8x8 display-oriented board with the standard center discs.
    assert_eq!(view.board.len(), 8);
    assert!(view.board.iter().all(|row| row.len() == 8));
    assert_eq!(view.board[3][3], 1);
    assert_eq!(view.board[3][4], -1);
    assert_eq!(view.board[4][3], -1);
    assert_eq!(view.board[4][4], 1);
}

#[tokio::test]
async fn test_oracle_first_game_moves_before_returning() {
    let app = test_app();
    let start = Instant::now();
    let (status, body) = post_json(
        &app,
        "/api/game/new",
        serde_json::json!({"first_player": -1}),
    )
    .await;
    let elapsed = start.elapsed();

    assert_eq!(status, StatusCode::OK);
    let view = view(&body);
    assert_eq!(view.history_length, 2);
    assert_eq!(view.current_player, 1);
    assert!(view.last_move.is_some());
    assert!(
        elapsed >= TEST_FLOOR,
        "AI move returned below the latency floor: {elapsed:?}"
    );
}

#[tokio::test]
async fn test_human_move_then_ai_move() {
    let app = test_app();
    let (_, body) = post_json(&app, "/api/game/new", serde_json::json!({})).await;
    let opening = view(&body).legal_moves[0];

    let (status, body) = post_json(
        &app,
        "/api/game/human_move",
        serde_json::json!({"x": opening.x, "y": opening.y}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let after_human = view(&body);
    assert_eq!(after_human.history_length, 2);
    assert_eq!(after_human.current_player, -1);
    assert_eq!(after_human.last_move, Some(opening));

    let start = Instant::now();
    let (status, body) = post_json(&app, "/api/game/ai_move", serde_json::json!({})).await;
    let elapsed = start.elapsed();

    assert_eq!(status, StatusCode::OK);
    let after_ai = view(&body);
    assert_eq!(after_ai.history_length, 3);
    assert_eq!(after_ai.current_player, 1);
    assert!(
        elapsed >= TEST_FLOOR,
        "AI move returned below the latency floor: {elapsed:?}"
    );
}

#[tokio::test]
async fn test_illegal_move_reports_error_and_depth() {
    let app = test_app();
    post_json(&app, "/api/game/new", serde_json::json!({})).await;

    let (status, body) = post_json(
        &app,
        "/api/game/human_move",
        serde_json::json!({"x": 0, "y": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let err: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(err["error"], "Illegal move");
    assert_eq!(err["history_length"], 1);
}

#[tokio::test]
async fn test_partial_coordinates_rejected() {
    let app = test_app();
    post_json(&app, "/api/game/new", serde_json::json!({})).await;

    let (status, body) =
        post_json(&app, "/api/game/human_move", serde_json::json!({"x": 2})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let err: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(err["error"], "Invalid move coordinates");
}

#[tokio::test]
async fn test_ai_move_on_human_turn_rejected() {
    let app = test_app();
    post_json(&app, "/api/game/new", serde_json::json!({})).await;

    let (status, body) = post_json(&app, "/api/game/ai_move", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let err: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(err["error"], "Not AI turn");
    assert_eq!(err["history_length"], 1);

    // The rejection did not mutate the session.
    let (_, body) = get(&app, "/api/game/state").await;
    assert_eq!(view(&body).history_length, 1);
}

#[tokio::test]
async fn test_undo_unavailable_on_fresh_game() {
    let app = test_app();
    post_json(&app, "/api/game/new", serde_json::json!({})).await;

    let (status, body) = post_json(&app, "/api/game/undo_move", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let err: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(err["history_length"], 1);
}

#[tokio::test]
async fn test_undo_reverts_move_pair() {
    let app = test_app();
    let (_, body) = post_json(&app, "/api/game/new", serde_json::json!({})).await;
    let fresh = view(&body);
    let opening = fresh.legal_moves[0];

    post_json(
        &app,
        "/api/game/human_move",
        serde_json::json!({"x": opening.x, "y": opening.y}),
    )
    .await;
    post_json(&app, "/api/game/ai_move", serde_json::json!({})).await;

    let (status, body) = post_json(&app, "/api/game/undo_move", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let restored = view(&body);
    assert_eq!(restored.history_length, 1);
    assert_eq!(restored.board, fresh.board);
    assert_eq!(restored.current_player, 1);
    assert_eq!(restored.last_move, None);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let app = test_app();
    post_json(
        &app,
        "/api/game/new",
        serde_json::json!({"session_id": "a"}),
    )
    .await;
    post_json(
        &app,
        "/api/game/new",
        serde_json::json!({"session_id": "b"}),
    )
    .await;

    let (_, body) = post_json(&app, "/api/game/new", serde_json::json!({"session_id": "a"})).await;
    let opening = view(&body).legal_moves[0];
    post_json(
        &app,
        "/api/game/human_move",
        serde_json::json!({"session_id": "a", "x": opening.x, "y": opening.y}),
    )
    .await;

    let (_, body) = get(&app, "/api/game/state?session_id=a").await;
    assert_eq!(view(&body).history_length, 2);
    let (_, body) = get(&app, "/api/game/state?session_id=b").await;
    assert_eq!(view(&body).history_length, 1);
}

/// Oracle that stalls longer than any reasonable operation timeout.
struct StallingOracle(Duration);

impl MoveOracle for StallingOracle {
    fn select_action(&self, canonical: &Board, _temperature: f64) -> usize {
        std::thread::sleep(self.0);
        canonical.size() * canonical.size()
    }
}

#[tokio::test]
async fn test_oracle_timeout_maps_to_gateway_timeout() {
    let config = ServerConfig {
        ai_min_latency: Duration::ZERO,
        oracle_timeout: Duration::from_millis(50),
        ..ServerConfig::default()
    };
    let app = create_app(Arc::new(AppState::with_oracle(
        config,
        Arc::new(StallingOracle(Duration::from_millis(500))),
    )));

    let (_, body) = post_json(&app, "/api/game/new", serde_json::json!({})).await;
    let opening = view(&body).legal_moves[0];
    post_json(
        &app,
        "/api/game/human_move",
        serde_json::json!({"x": opening.x, "y": opening.y}),
    )
    .await;

    let (status, body) = post_json(&app, "/api/game/ai_move", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    let err: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(err["error"], "Move oracle timed out");
    assert_eq!(err["history_length"], 2);

    // Retryable: the session is untouched and still awaits the oracle.
    let (_, body) = get(&app, "/api/game/state").await;
    let after = view(&body);
    assert_eq!(after.history_length, 2);
    assert_eq!(after.current_player, -1);
}

#[tokio::test]
async fn test_missing_weight_table_degrades_to_unavailable() {
    let config = ServerConfig {
        ai_min_latency: TEST_FLOOR,
        weights_path: Some("/nonexistent/weights.json".into()),
        ..ServerConfig::default()
    };
    let app = create_app(Arc::new(AppState::new(config)));

    // State queries and human moves still work.
    let (status, body) = post_json(&app, "/api/game/new", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let opening = view(&body).legal_moves[0];
    let (status, _) = post_json(
        &app,
        "/api/game/human_move",
        serde_json::json!({"x": opening.x, "y": opening.y}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // AI turns degrade to an explicit error, session untouched.
    let (status, body) = post_json(&app, "/api/game/ai_move", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let err: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(
        err["error"]
            .as_str()
            .unwrap()
            .starts_with("Move oracle unavailable"),
        "unexpected error: {}",
        err["error"]
    );
    assert_eq!(err["history_length"], 2);

    let (_, body) = get(&app, "/api/game/state").await;
    assert_eq!(view(&body).history_length, 2);
}
