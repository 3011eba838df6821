//! Roadview Traffic Camserver
//!
//! Ingests cumulative object-counting telemetry from a video-analytics
//! pipeline, persists it in SQLite, and serves live camera feeds alongside
//! derived statistics.
//!
//! ## Components
//!
//! 1. TelemetryIngest - payload parsing and storage entry point
//! 2. TelemetryStore - SQLite persistence for counter samples
//! 3. StreamCapture - per-camera RTSP capture into frame buffers
//! 4. StreamRelay - MJPEG multiplexing to concurrent viewers
//! 5. TrafficStats - reset-tolerant deltas and hourly profiles
//! 6. Alerting - directional-violation detection and alert log
//! 7. WebApi - REST API endpoints
//!
//! ## Design Principles
//!
//! - Counters are cumulative within a counting session; a decrease means the
//!   upstream pipeline restarted and is never a negative delta
//! - Frame buffers hold only the single most recent frame, so a slow viewer
//!   can never back-pressure capture or other viewers
//! - Every failure path degrades to a visible state (placeholder frame,
//!   zero-filled statistics) instead of terminating the process

pub mod alerting;
pub mod config;
pub mod error;
pub mod state;
pub mod stream_capture;
pub mod stream_relay;
pub mod telemetry_ingest;
pub mod telemetry_store;
pub mod traffic_stats;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
