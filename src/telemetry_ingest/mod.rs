//! TelemetryIngest - payload parsing and storage entry point
//!
//! ## Responsibilities
//!
//! - Tolerant extraction of cumulative counters from pipeline JSON
//! - `handle()` entry point, independent of how messages are delivered
//!
//! The broker client itself is an external collaborator: anything able to
//! POST the payload to `/api/telemetry` (or call `handle()` directly) can
//! feed the store.

mod parser;

pub use parser::parse_counting_message;

use std::sync::Arc;

use crate::error::Result;
use crate::telemetry_store::TelemetryRepository;

/// Ingestion boundary service
pub struct IngestService {
    repository: TelemetryRepository,
}

impl IngestService {
    pub fn new(repository: TelemetryRepository) -> Arc<Self> {
        Arc::new(Self { repository })
    }

    /// Parse one raw payload and append it to the store.
    ///
    /// Malformed payloads surface as a `Parse` error; the caller logs and
    /// drops them, processing continues.
    pub async fn handle(&self, payload: &str) -> Result<i64> {
        let (timestamp, values) = parse_counting_message(payload)?;

        let id = self.repository.insert(&timestamp, &values, payload).await?;

        tracing::debug!(
            id,
            timestamp = %timestamp,
            car_total = values.car_total,
            lc1_exit = values.lc1_exit_count,
            "Telemetry sample stored"
        );

        Ok(id)
    }
}
