//! Alerting - directional-violation detection
//!
//! ## Responsibilities
//!
//! - Per-scope comparison of exit counters against their last-seen baseline
//! - Persistence of raised alerts (`alerts` table)
//! - A process-level watcher scope that polls the latest sample
//!
//! Each observation scope (a dashboard session, the watcher task, a test)
//! constructs its own [`AlertDetector`]; baselines are never shared, so one
//! scope's polling can never suppress another's alerts.

mod repository;
mod types;

pub use repository::AlertRepository;
pub use types::{AlertEvent, AlertSeverity, Lane, StoredAlert};

use std::collections::HashMap;
use std::time::Duration;

use crate::telemetry_store::{TelemetryRepository, TelemetrySample};

/// Stateful comparator over exit counters.
///
/// First poll of a lane records the baseline silently; afterwards every
/// observed increase emits exactly one event and rebases, and any decrease
/// (a counting-session reset) rebases without emitting. Repeated polling of
/// an unchanged value emits nothing.
#[derive(Debug, Default)]
pub struct AlertDetector {
    baselines: HashMap<Lane, i64>,
}

impl AlertDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare one lane's current exit count against its baseline.
    pub fn observe(&mut self, lane: Lane, current: i64, timestamp: &str) -> Option<AlertEvent> {
        let event = match self.baselines.get(&lane) {
            Some(&baseline) if current > baseline => Some(AlertEvent {
                lane,
                increment: current - baseline,
                timestamp: timestamp.to_string(),
            }),
            _ => None,
        };

        self.baselines.insert(lane, current);
        event
    }

    /// Observe both lanes of one sample.
    pub fn observe_sample(&mut self, sample: &TelemetrySample) -> Vec<AlertEvent> {
        [
            (Lane::Lc1, sample.lc1_exit_count),
            (Lane::Lc2, sample.lc2_exit_count),
        ]
        .into_iter()
        .filter_map(|(lane, current)| self.observe(lane, current, &sample.timestamp))
        .collect()
    }
}

/// Spawn the process-level watcher: one observation scope that polls the
/// latest stored sample and persists wrong-way alerts.
pub fn spawn_watcher(
    telemetry: TelemetryRepository,
    alerts: AlertRepository,
    poll_interval: Duration,
) {
    tokio::spawn(async move {
        let mut detector = AlertDetector::new();
        let mut interval = tokio::time::interval(poll_interval);

        loop {
            interval.tick().await;

            let sample = match telemetry.latest(1).await {
                Ok(mut rows) => rows.pop(),
                Err(e) => {
                    tracing::error!(error = %e, "Alert watcher poll failed");
                    continue;
                }
            };
            let Some(sample) = sample else { continue };

            for event in detector.observe_sample(&sample) {
                tracing::warn!(
                    lane = event.lane.as_str(),
                    increment = event.increment,
                    timestamp = %event.timestamp,
                    "Wrong-way crossing detected"
                );

                if let Err(e) = alerts.insert(&event, AlertSeverity::Warning).await {
                    tracing::error!(error = %e, "Failed to persist alert");
                }
            }
        }
    });
}
