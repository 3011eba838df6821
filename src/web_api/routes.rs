//! API Routes

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};
use crate::state::AppState;
use crate::stream_relay::MJPEG_CONTENT_TYPE;
use crate::traffic_stats::{CategoryFilter, DaySelector, LaneFilter};

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & streams
        .route("/health", get(super::health_check))
        .route("/stream/:camera_id", get(stream_mjpeg))
        .route("/stream/:camera_id/snapshot", get(stream_snapshot))
        .route("/api/streams", get(stream_health))
        // Telemetry ingestion
        .route("/api/telemetry", post(ingest_telemetry))
        // Statistics
        .route("/api/stats/latest", get(latest_totals))
        .route("/api/stats/overview", get(overview))
        .route("/api/stats/hourly", get(hourly))
        .route("/api/stats/daily", get(daily_totals))
        .route("/api/stats/dates", get(available_dates))
        .route("/api/samples/recent", get(recent_samples))
        // Alerts
        .route("/api/alerts", get(list_alerts))
        .route("/api/alerts/:id/ack", post(acknowledge_alert))
        .with_state(state)
}

// ========================================
// Stream Handlers
// ========================================

/// Endless multipart MJPEG response; unknown ids get the placeholder stream.
async fn stream_mjpeg(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> impl IntoResponse {
    let stream = state.relay.mjpeg_parts(&camera_id);

    (
        [
            (header::CONTENT_TYPE, MJPEG_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
}

/// Single most-recent JPEG for one camera.
async fn stream_snapshot(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "image/jpeg")],
        state.relay.snapshot(&camera_id),
    )
}

async fn stream_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.relay.health())
}

// ========================================
// Telemetry Handlers
// ========================================

/// Ingest one raw pipeline payload. Any broker bridge can POST here.
async fn ingest_telemetry(State(state): State<AppState>, body: String) -> Result<impl IntoResponse> {
    let id = state.ingest.handle(&body).await?;
    Ok(Json(json!({ "id": id })))
}

#[derive(Debug, Deserialize)]
struct RecentQuery {
    limit: Option<u32>,
}

async fn recent_samples(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<impl IntoResponse> {
    let limit = query.limit.unwrap_or(100).min(1000);
    let samples = state.telemetry.latest(limit).await?;
    Ok(Json(samples))
}

// ========================================
// Statistics Handlers
// ========================================

async fn latest_totals(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.stats.latest_totals().await)
}

#[derive(Debug, Deserialize)]
struct OverviewQuery {
    #[serde(default)]
    lanes: LaneFilter,
}

async fn overview(
    State(state): State<AppState>,
    Query(query): Query<OverviewQuery>,
) -> impl IntoResponse {
    Json(state.stats.overview(query.lanes).await)
}

#[derive(Debug, Deserialize)]
struct DayQuery {
    date: Option<String>,
    #[serde(default)]
    category: CategoryFilter,
}

/// `current` (default) or a stored `YYYY-MM-DD` day.
fn parse_day(raw: Option<&str>) -> Result<DaySelector> {
    match raw {
        None => Ok(DaySelector::Current),
        Some(raw) => DaySelector::parse(raw)
            .ok_or_else(|| Error::Validation(format!("invalid date selector: {raw}"))),
    }
}

async fn hourly(
    State(state): State<AppState>,
    Query(query): Query<DayQuery>,
) -> Result<impl IntoResponse> {
    let day = parse_day(query.date.as_deref())?;
    Ok(Json(state.stats.hourly(day, query.category).await))
}

async fn daily_totals(
    State(state): State<AppState>,
    Query(query): Query<DayQuery>,
) -> Result<impl IntoResponse> {
    let day = parse_day(query.date.as_deref())?;
    Ok(Json(state.stats.day_totals(day).await))
}

async fn available_dates(State(state): State<AppState>) -> impl IntoResponse {
    let dates: Vec<String> = state
        .stats
        .available_dates()
        .await
        .into_iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();
    Json(dates)
}

// ========================================
// Alert Handlers
// ========================================

#[derive(Debug, Deserialize)]
struct AlertsQuery {
    limit: Option<u32>,
    #[serde(default)]
    unacknowledged: bool,
}

async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Result<impl IntoResponse> {
    let limit = query.limit.unwrap_or(50).min(500);
    let alerts = state.alerts.recent(limit, query.unacknowledged).await?;
    Ok(Json(alerts))
}

async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<i64>,
) -> Result<impl IntoResponse> {
    if !state.alerts.acknowledge(alert_id).await? {
        return Err(Error::NotFound(format!("alert {alert_id}")));
    }
    Ok(Json(json!({ "acknowledged": alert_id })))
}
