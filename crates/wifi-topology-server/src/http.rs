//! HTTP and WebSocket transport.
//!
//! | route | |
//! |---|---|
//! | `GET /ws` | WebSocket; latest snapshot on connect, then every emitted one |
//! | `GET /health` | liveness and counters |
//! | `GET /api/snapshot` | latest snapshot |
//! | `GET/POST /api/config` | read / patch the pipeline configuration |
//! | `POST /api/replay/start`, `/api/replay/stop` | replay control |
//! | `POST /api/record/start`, `/api/record/stop` | recording control |
//! | `GET /ui/*` | static UI, when configured |
//!
//! Recording paths in request bodies are relative to the state's
//! `recordings_dir`; absolute paths and `..` are rejected.

use std::path::{Component, Path, PathBuf};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{debug, info, warn};
use wifi_topology_core::{ConfigPatch, PipelineConfig, SnapshotRecorder};

use crate::error::ServerError;
use crate::replay::{replay_status, start_replay, stop_replay, ReplayStatus};
use crate::state::SharedState;

// ── Errors ──────────────────────────────────────────────────────────────────

/// JSON error body with a status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

/// Resolve a client-supplied recording path under `root`.
///
/// Only plain relative paths are accepted.
pub fn resolve_recording_path(root: &Path, requested: &Path) -> Result<PathBuf, ApiError> {
    let mut clean = PathBuf::new();
    for component in requested.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ApiError::bad_request(format!(
                    "path {} must stay inside the recordings directory",
                    requested.display()
                )));
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(ApiError::bad_request("path must name a file"));
    }
    Ok(root.join(clean))
}

impl From<ServerError> for ApiError {
    fn from(e: ServerError) -> Self {
        let status = match &e {
            ServerError::Config(_) | ServerError::Replay(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// ── Router ──────────────────────────────────────────────────────────────────

/// Build the application router.
pub fn router(state: SharedState, ui_path: Option<PathBuf>) -> Router {
    let mut app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/api/snapshot", get(latest_snapshot))
        .route("/api/config", get(get_config).post(post_config))
        .route("/api/replay", get(get_replay))
        .route("/api/replay/start", post(replay_start))
        .route("/api/replay/stop", post(replay_stop))
        .route("/api/record/start", post(record_start))
        .route("/api/record/stop", post(record_stop));

    if let Some(ui) = ui_path {
        app = app.nest_service("/ui", ServeDir::new(ui));
    }

    app.layer(SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    ))
    .with_state(state)
}

// ── WebSocket ───────────────────────────────────────────────────────────────

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws_client(socket, state))
}

async fn handle_ws_client(mut socket: WebSocket, state: SharedState) {
    let (mut rx, latest) = {
        let s = state.read().await;
        (s.tx.subscribe(), s.latest.clone())
    };

    info!("WebSocket client connected");

    if let Some(snapshot) = latest {
        if let Ok(json) = snapshot.to_json() {
            if socket.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }
    }

    loop {
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Ok(snapshot) => {
                        let json = match snapshot.to_json() {
                            Ok(json) => json,
                            Err(e) => {
                                warn!("snapshot serialization failed: {e}");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("WebSocket client lagging, skipped {skipped} snapshots");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}

// ── REST ────────────────────────────────────────────────────────────────────

pub(crate) async fn health(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let s = state.read().await;
    Json(json!({
        "status": "ok",
        "source": s.pipeline.source(),
        "mode": if s.replay_active() { "replay" } else { "live" },
        "tick": s.pipeline.ticks(),
        "trackedAps": s.pipeline.store().len(),
        "published": s.published,
        "recording": s.recorder.is_some(),
        "clients": s.tx.receiver_count(),
        "uptimeSecs": s.start_time.elapsed().as_secs(),
    }))
}

pub(crate) async fn latest_snapshot(State(state): State<SharedState>) -> Response {
    let s = state.read().await;
    match &s.latest {
        Some(snapshot) => Json(snapshot.as_ref().clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "no data yet" })),
        )
            .into_response(),
    }
}

pub(crate) async fn get_config(State(state): State<SharedState>) -> Json<PipelineConfig> {
    Json(state.read().await.config().clone())
}

pub(crate) async fn post_config(
    State(state): State<SharedState>,
    Json(patch): Json<ConfigPatch>,
) -> Result<Json<PipelineConfig>, ApiError> {
    let mut s = state.write().await;
    match s.reconfigure(&patch) {
        Ok(cfg) => {
            info!("configuration updated");
            Ok(Json(cfg))
        }
        Err(e) => {
            warn!("configuration rejected: {e}");
            Err(ApiError::from(ServerError::Config(e)))
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReplayRequest {
    path: PathBuf,
    #[serde(default = "default_speed")]
    speed: f64,
    #[serde(default, rename = "loop")]
    looping: bool,
}

fn default_speed() -> f64 {
    1.0
}

pub(crate) async fn get_replay(State(state): State<SharedState>) -> Json<ReplayStatus> {
    Json(replay_status(&state).await)
}

pub(crate) async fn replay_start(
    State(state): State<SharedState>,
    Json(req): Json<ReplayRequest>,
) -> Result<Json<ReplayStatus>, ApiError> {
    let root = state.read().await.recordings_dir.clone();
    let path = resolve_recording_path(&root, &req.path)?;
    let status = start_replay(&state, path, req.speed, req.looping).await?;
    Ok(Json(status))
}

pub(crate) async fn replay_stop(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let stopped = stop_replay(&state).await;
    Json(json!({ "stopped": stopped }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordRequest {
    path: PathBuf,
}

pub(crate) async fn record_start(
    State(state): State<SharedState>,
    Json(req): Json<RecordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let root = state.read().await.recordings_dir.clone();
    let path = resolve_recording_path(&root, &req.path)?;
    let recorder = SnapshotRecorder::open(&path).map_err(ServerError::from)?;
    let mut s = state.write().await;
    if let Some(previous) = s.stop_recording() {
        info!("recording to {} replaced", previous.display());
    }
    s.start_recording(recorder);
    Ok(Json(json!({ "recording": true, "path": path })))
}

pub(crate) async fn record_stop(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let path = state.write().await.stop_recording();
    if let Some(p) = &path {
        info!("recording to {} stopped", p.display());
    }
    Json(json!({ "recording": false, "path": path }))
}
