//! HTTP surface tests over an in-memory database

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

use roadview_camserver::{
    alerting::AlertRepository, config::Config, state::AppState, stream_relay::StreamRelay,
    telemetry_ingest::IngestService, telemetry_store::TelemetryRepository,
    traffic_stats::TrafficStatsService, web_api,
};

async fn test_app() -> Router {
    // single connection so every query sees the same :memory: database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    let telemetry = TelemetryRepository::new(pool.clone());
    telemetry.init_schema().await.unwrap();

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(Config::default()),
        telemetry: telemetry.clone(),
        alerts: AlertRepository::new(pool),
        ingest: IngestService::new(telemetry.clone()),
        stats: TrafficStatsService::new(telemetry),
        relay: StreamRelay::new(HashMap::new()).unwrap(),
        captures: Arc::new(HashMap::new()),
    };

    web_api::create_router(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<String>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(json!({}));

    (status, json)
}

fn payload(timestamp: &str, car_total: i64, lc1_exit: i64) -> String {
    json!({
        "timestamp": timestamp,
        "objects": {
            "car": { "total": car_total },
            "person": { "total": 2 }
        },
        "analytics": {
            "line_crossing_pair_1": { "entry": 4, "exit": lc1_exit },
            "roi_cumulative_per_class": { "car": 7 }
        }
    })
    .to_string()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn telemetry_roundtrip_through_the_api() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/telemetry",
        Some(payload("2026-08-25T10:00:00", 12, 1)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 1);

    let (status, latest) = send(&app, Method::GET, "/api/stats/latest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["car_total"], 12);
    assert_eq!(latest["person_total"], 2);
    assert_eq!(latest["lc1_entry"], 4);
    assert_eq!(latest["roi_car"], 7);

    let (status, samples) = send(&app, Method::GET, "/api/samples/recent?limit=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(samples.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_telemetry_is_a_parse_error() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/telemetry",
        Some("not json".to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "PARSE_ERROR");
}

#[tokio::test]
async fn overview_respects_lane_query() {
    let app = test_app().await;
    send(
        &app,
        Method::POST,
        "/api/telemetry",
        Some(payload("2026-08-25T10:00:00", 12, 1)),
    )
    .await;

    let (status, overview) = send(&app, Method::GET, "/api/stats/overview?lanes=lc1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["total_in"], 4);
    assert_eq!(overview["total_out"], 1);
    assert_eq!(overview["current_stay"], 3);
}

#[tokio::test]
async fn hourly_rejects_bad_date() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/api/stats/hourly?date=garbage", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "VALIDATION_ERROR");

    let (status, profile) = send(
        &app,
        Method::GET,
        "/api/stats/hourly?date=2026-08-25&category=car",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["car"].as_array().unwrap().len(), 24);
}

#[tokio::test]
async fn acknowledging_unknown_alert_is_not_found() {
    let app = test_app().await;

    let (status, alerts) = send(&app, Method::GET, "/api/alerts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(alerts.as_array().unwrap().is_empty());

    let (status, body) = send(&app, Method::POST, "/api/alerts/42/ack", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "NOT_FOUND");
}

#[tokio::test]
async fn snapshot_for_unknown_camera_is_a_placeholder_jpeg() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/stream/ghost/snapshot")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/jpeg"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
}
