//! Application state
//!
//! Holds all shared components and state

use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;

use crate::alerting::AlertRepository;
use crate::config::Config;
use crate::stream_capture::StreamCaptureManager;
use crate::stream_relay::StreamRelay;
use crate::telemetry_ingest::IngestService;
use crate::telemetry_store::TelemetryRepository;
use crate::traffic_stats::TrafficStatsService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database pool
    pub pool: SqlitePool,
    /// Loaded configuration
    pub config: Arc<Config>,
    /// Telemetry storage
    pub telemetry: TelemetryRepository,
    /// Alert storage
    pub alerts: AlertRepository,
    /// Telemetry ingestion boundary
    pub ingest: Arc<IngestService>,
    /// Derived statistics reads
    pub stats: Arc<TrafficStatsService>,
    /// MJPEG fan-out to viewers
    pub relay: Arc<StreamRelay>,
    /// Capture loops by camera id, for startup/shutdown control
    pub captures: Arc<HashMap<String, Arc<StreamCaptureManager>>>,
}
