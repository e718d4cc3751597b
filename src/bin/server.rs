use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use compass_hunt_server::action_log::JsonLinesActionLog;
use compass_hunt_server::constants::ACTION_QUEUE_CAPACITY;
use compass_hunt_server::reward::LoggingRewardDispatcher;
use compass_hunt_server::server_protocol::{parse_play_request, parse_start_request};
use compass_hunt_server::server_utils::ServerConfig;
use compass_hunt_server::service::{spawn_game_service, GameHandle, GameService, SubmitError};
use compass_hunt_server::types::{MoveOutcome, PlayerId};
use log::{error, info, warn};
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env().map_err(anyhow::Error::msg)?;
    let action_log = JsonLinesActionLog::new(config.action_log_path.clone());
    let service = GameService::start(config.treasures.clone(), action_log, LoggingRewardDispatcher)
        .with_context(|| {
            format!(
                "failed to replay action log {}",
                config.action_log_path.display()
            )
        })?;

    {
        let engine = service.engine();
        let treasures: Vec<String> = engine
            .treasures_remaining()
            .map(|cell| format!("({}, {})", cell.x, cell.y))
            .collect();
        let winners: Vec<PlayerId> = engine.winners().iter().map(|win| win.player_id).collect();
        info!("[server] treasures left: [{}]", treasures.join(", "));
        info!("[server] winners: {winners:?}");
    }

    let handle = spawn_game_service(service, ACTION_QUEUE_CAPACITY);
    let app = build_router(handle);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    info!("[server] listening on :{}", config.port);
    axum::serve(listener, app).await.context("server stopped")?;
    Ok(())
}

fn build_router(handle: GameHandle) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/state", get(state_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route("/players/{player_id}", get(player_handler))
        .route("/start", post(start_handler))
        .route("/play", post(play_handler))
        .with_state(handle)
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn state_handler(State(handle): State<GameHandle>) -> (StatusCode, Json<Value>) {
    match handle.snapshot().await {
        Some(snapshot) => reply(
            StatusCode::OK,
            json!({
                "generatedAt": now_iso(),
                "snapshot": snapshot,
            }),
        ),
        None => unavailable(),
    }
}

async fn leaderboard_handler(State(handle): State<GameHandle>) -> (StatusCode, Json<Value>) {
    match handle.leaderboard().await {
        Some(entries) => reply(
            StatusCode::OK,
            json!({
                "generatedAt": now_iso(),
                "entries": entries,
            }),
        ),
        None => unavailable(),
    }
}

async fn player_handler(
    State(handle): State<GameHandle>,
    Path(player_id): Path<PlayerId>,
) -> (StatusCode, Json<Value>) {
    match handle.player(player_id).await {
        Some(player) => reply(StatusCode::OK, json!({ "player": player })),
        None => unavailable(),
    }
}

async fn start_handler(State(handle): State<GameHandle>, body: String) -> (StatusCode, Json<Value>) {
    let Some(player_id) = parse_start_request(&body) else {
        return bad_request("expected {\"playerId\": <id>}");
    };
    let Some(player) = handle.player(player_id).await else {
        return unavailable();
    };
    let status = if player.game_over { "game_over" } else { "playing" };
    if !player.game_over {
        info!("[server] player {player_id} is playing");
    }
    reply(
        StatusCode::OK,
        json!({
            "status": status,
            "player": player,
        }),
    )
}

async fn play_handler(State(handle): State<GameHandle>, body: String) -> (StatusCode, Json<Value>) {
    let Some(request) = parse_play_request(&body) else {
        return bad_request("expected {\"playerId\", \"steer\" | \"buttonIndex\"}");
    };

    match handle.submit(request, server_timestamp()).await {
        Ok(result) => {
            let outcome = result.outcome();
            match outcome {
                MoveOutcome::Found => info!("[server] player {} won!", request.player_id),
                MoveOutcome::RoundLost { lives_remaining } => info!(
                    "[server] player {} lost! {lives_remaining} lives left.",
                    request.player_id
                ),
                MoveOutcome::GameOver => {
                    info!("[server] player {} lost! Game over.", request.player_id)
                }
                MoveOutcome::Continue => {}
            }
            reply(
                StatusCode::OK,
                json!({
                    "outcome": outcome,
                    "result": result,
                }),
            )
        }
        Err(submit_error) => {
            let status = submit_error_status(&submit_error);
            if status.is_server_error() {
                error!("[server] rejected play from {}: {submit_error}", request.player_id);
            } else {
                warn!("[server] rejected play from {}: {submit_error}", request.player_id);
            }
            reply(status, json!({ "error": submit_error.to_string() }))
        }
    }
}

fn submit_error_status(error: &SubmitError) -> StatusCode {
    match error {
        SubmitError::GameOver { .. } => StatusCode::CONFLICT,
        SubmitError::Log(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SubmitError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn reply(status: StatusCode, body: Value) -> (StatusCode, Json<Value>) {
    (status, Json(body))
}

fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    reply(StatusCode::BAD_REQUEST, json!({ "error": message }))
}

fn unavailable() -> (StatusCode, Json<Value>) {
    reply(
        StatusCode::SERVICE_UNAVAILABLE,
        json!({ "error": "game service is not running" }),
    )
}

fn server_timestamp() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_hunt_server::action_log::ActionLogError;

    #[test]
    fn submit_errors_map_to_http_statuses() {
        assert_eq!(
            submit_error_status(&SubmitError::GameOver {
                player_id: 1,
                lives_remaining: 0
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            submit_error_status(&SubmitError::Unavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
        let log_error = SubmitError::Log(ActionLogError::Io {
            path: "actions.jsonl".into(),
            source: std::io::Error::other("disk full"),
        });
        assert_eq!(
            submit_error_status(&log_error),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn server_timestamp_is_recent_unix_seconds() {
        let stamp = server_timestamp();
        assert!(stamp > 1_600_000_000);
    }

    #[test]
    fn iso_timestamp_uses_utc_suffix() {
        assert!(now_iso().ends_with('Z'));
    }
}
