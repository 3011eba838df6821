//! Telemetry sample types

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

/// One stored telemetry sample. All counters are cumulative within a counting
/// session; the upstream pipeline resets them toward zero on restart.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TelemetrySample {
    pub id: i64,
    /// Pipeline-local ISO-8601 timestamp, stored as written by the source
    pub timestamp: String,
    pub car_total: i64,
    pub bicycle_total: i64,
    pub person_total: i64,
    pub lc1_entry_count: i64,
    pub lc1_exit_count: i64,
    pub lc2_entry_count: i64,
    pub lc2_exit_count: i64,
    pub roi_car_cumulative: i64,
    pub roi_bicycle_cumulative: i64,
    pub roi_person_cumulative: i64,
}

impl TelemetrySample {
    /// Parsed sample timestamp, `None` when the stored text is unreadable.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.timestamp)
    }
}

/// Counter values extracted from one ingested payload, before storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterValues {
    pub car_total: i64,
    pub bicycle_total: i64,
    pub person_total: i64,
    pub lc1_entry_count: i64,
    pub lc1_exit_count: i64,
    pub lc2_entry_count: i64,
    pub lc2_exit_count: i64,
    pub roi_car_cumulative: i64,
    pub roi_bicycle_cumulative: i64,
    pub roi_person_cumulative: i64,
}

/// Parse a pipeline timestamp leniently.
///
/// The source emits ISO-8601 with or without fractional seconds, and some
/// tooling rewrites the `T` separator to a space.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];

    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}
