use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use duel_packman_server::config::ServerConfig;
use duel_packman_server::constants::SNAPSHOT_CHANNEL_CAPACITY;
use duel_packman_server::error::GameError;
use duel_packman_server::round::Round;
use duel_packman_server::server_protocol::parse_move_request;
use duel_packman_server::server_utils::{bearer_token, status_for_error};
use duel_packman_server::snapshot::{SnapshotMessage, SnapshotPublisher};
use duel_packman_server::types::Role;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::{broadcast, Mutex};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Fans serialized snapshots out to every observer socket.
struct BroadcastPublisher {
    tx: broadcast::Sender<String>,
}

impl SnapshotPublisher for BroadcastPublisher {
    fn publish(&mut self, message: &SnapshotMessage) {
        match serde_json::to_string(message) {
            Ok(payload) => {
                // no observers is fine
                let _ = self.tx.send(payload);
            }
            Err(err) => warn!(%err, "failed to serialize snapshot"),
        }
    }
}

#[derive(Clone)]
struct AppState {
    round: Arc<Mutex<Round<BroadcastPublisher>>>,
    snapshots: broadcast::Sender<String>,
    config: Arc<ServerConfig>,
}

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();
    init_tracing(&config.log_level);

    let (tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
    let round = Round::classic(BroadcastPublisher { tx: tx.clone() })
        .expect("built-in template should parse");
    let state = AppState {
        round: Arc::new(Mutex::new(round)),
        snapshots: tx,
        config: Arc::new(config.clone()),
    };
    if config.fully_automated() {
        start_auto_tick_loop(state.clone(), config.auto_tick_ms);
    }

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/round", get(round_handler))
        .route("/connect/{role}", post(connect_handler))
        .route("/move/{role}", post(move_handler))
        .route("/disconnect/{role}", post(disconnect_handler))
        .route("/round/reset", post(reset_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir(config.static_dir.as_ref()) {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.to_string_lossy(), "serving static files");
        app.fallback_service(ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)))
    } else {
        warn!("static file root not found; serving API only");
        app
    };

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind server socket");

    info!(addr = %bind_addr, "listening");
    axum::serve(listener, app)
        .await
        .expect("server runtime failed");
}

fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

fn resolve_static_dir(configured: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.join("index.html").is_file() {
            return Some(path.clone());
        }
    }

    let candidates = [PathBuf::from("static"), PathBuf::from("templates")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

fn start_auto_tick_loop(state: AppState, tick_ms: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(tick_ms.max(1)));
        loop {
            interval.tick().await;
            let mut guard = state.round.lock().await;
            match guard.advance_autonomous() {
                Ok(report) => debug!(tick = report.tick, score = report.score, "auto tick"),
                Err(GameError::RoundEnded) | Err(GameError::RoleNotConnected(_)) => {}
                Err(err) => warn!(%err, "auto tick failed"),
            }
        }
    });
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn round_handler(State(state): State<AppState>) -> impl IntoResponse {
    let guard = state.round.lock().await;
    Json(json!({
        "phase": guard.phase(),
        "snapshot": guard.snapshot(),
        "moves": guard.moves(),
        "pelletsRemaining": guard.pellets_remaining(),
        "playerConnected": guard.is_connected(Role::Player),
        "ghostConnected": guard.is_connected(Role::Ghost),
        "generatedAtIso": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

async fn connect_handler(State(state): State<AppState>, Path(role): Path<String>) -> Response {
    let role = match Role::parse(&role) {
        Ok(role) => role,
        Err(err) => return error_response(err),
    };
    let source = state.config.move_source(role);
    let mut guard = state.round.lock().await;
    match guard.connect(role, source) {
        Ok(session_id) => Json(json!({
            "role": role,
            "sessionId": session_id,
            "phase": guard.phase(),
        }))
        .into_response(),
        Err(err) => error_response(err),
    }
}

async fn move_handler(
    State(state): State<AppState>,
    Path(role): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let role = match Role::parse(&role) {
        Ok(role) => role,
        Err(err) => return error_response(err),
    };
    let Some(session_id) = session_from_headers(&headers) else {
        return missing_token();
    };
    let request = match parse_move_request(role, &body) {
        Ok(request) => request,
        Err(err) => return error_response(err),
    };

    let mut guard = state.round.lock().await;
    match guard.submit_move(&session_id, request) {
        Ok(report) => Json(json!({ "status": "success", "report": report })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn disconnect_handler(
    State(state): State<AppState>,
    Path(role): Path<String>,
    headers: HeaderMap,
) -> Response {
    let role = match Role::parse(&role) {
        Ok(role) => role,
        Err(err) => return error_response(err),
    };
    let Some(session_id) = session_from_headers(&headers) else {
        return missing_token();
    };
    let mut guard = state.round.lock().await;
    match guard.disconnect(role, &session_id) {
        Ok(()) => Json(json!({
            "status": format!("{role} disconnected"),
            "phase": guard.phase(),
        }))
        .into_response(),
        Err(err) => error_response(err),
    }
}

async fn reset_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session_id) = session_from_headers(&headers) else {
        return missing_token();
    };
    let mut guard = state.round.lock().await;
    match guard.reset(&session_id) {
        Ok(()) => Json(json!({ "status": "reset", "phase": guard.phase() })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_observer(state, socket))
}

async fn handle_observer(state: AppState, socket: WebSocket) {
    let mut rx = state.snapshots.subscribe();
    let initial = {
        let guard = state.round.lock().await;
        serde_json::to_string(&guard.snapshot()).ok()
    };

    let (mut ws_sender, mut ws_receiver) = socket.split();
    if let Some(payload) = initial {
        if ws_sender.send(Message::Text(payload.into())).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(payload) => {
                    if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "observer fell behind; dropping snapshots");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("observer left");
}

fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    bearer_token(raw).map(str::to_string)
}

fn missing_token() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Missing Token" })),
    )
        .into_response()
}

fn error_response(err: GameError) -> Response {
    let status = StatusCode::from_u16(status_for_error(&err)).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
