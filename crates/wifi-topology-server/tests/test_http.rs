//! Router-level HTTP checks.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use wifi_topology_core::{PipelineConfig, TopologyPipeline};
use wifi_topology_scan::ScanSource;
use wifi_topology_server::{http, AppStateInner};

fn app() -> Router {
    let pipeline = TopologyPipeline::new(PipelineConfig::default(), ScanSource::Simulated).unwrap();
    http::router(AppStateInner::new(pipeline).into_shared(), None)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_and_no_cache_header() {
    let response = app().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cache = response.headers()[header::CACHE_CONTROL].to_str().unwrap();
    assert!(cache.starts_with("no-cache"));
    let v = json_body(response).await;
    assert_eq!(v["status"], "ok");
    assert_eq!(v["mode"], "live");
}

#[tokio::test]
async fn config_round_trip() {
    let app = app();

    let response = app
        .clone()
        .oneshot(post_json("/api/config", r#"{"windowSize":16}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["windowSize"], 16);

    let response = app
        .clone()
        .oneshot(post_json("/api/config", r#"{"scanIntervalMs":5}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(post_json("/api/config", r#"{"unknownOption":1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let v = json_body(app.oneshot(get("/api/config")).await.unwrap()).await;
    assert_eq!(v["windowSize"], 16);
    assert_eq!(v["scanIntervalMs"], 2000);
}

#[tokio::test]
async fn snapshot_missing_before_first_tick() {
    let response = app().oneshot(get("/api/snapshot")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn record_path_traversal_is_rejected() {
    let response = app()
        .oneshot(post_json("/api/record/start", r#"{"path":"../../tmp/x.ndjson"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"]
        .as_str()
        .unwrap()
        .contains("recordings directory"));
}

#[tokio::test]
async fn replay_status_idle() {
    let v = json_body(app().oneshot(get("/api/replay")).await.unwrap()).await;
    assert_eq!(v["active"], false);
}
