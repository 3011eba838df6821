//! TelemetryStore - SQLite persistence for counter samples
//!
//! ## Responsibilities
//!
//! - Schema management for the `analytics_data` and `alerts` tables
//! - Append-only sample storage with the raw payload retained
//! - Range / latest / extent queries for the statistics layer
//! - Retention maintenance (prune + vacuum)

mod repository;
mod types;

pub use repository::TelemetryRepository;
pub use types::{parse_timestamp, CounterValues, TelemetrySample};

#[cfg(test)]
pub(crate) use repository::memory_pool;

use std::time::Duration;

/// Spawn the background retention task.
///
/// Prunes samples older than `retention_days` once a day. A zero retention
/// disables pruning entirely.
pub fn spawn_retention_task(repository: TelemetryRepository, retention_days: u32) {
    if retention_days == 0 {
        tracing::info!("Telemetry retention disabled (retention_days = 0)");
        return;
    }

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(24 * 60 * 60));
        loop {
            interval.tick().await;

            match repository.prune_older_than(retention_days).await {
                Ok(removed) if removed > 0 => {
                    tracing::info!(removed, retention_days, "Pruned old telemetry samples");
                    if let Err(e) = repository.vacuum().await {
                        tracing::warn!(error = %e, "Vacuum after prune failed");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Telemetry prune failed");
                }
            }
        }
    });
}
