//! TrafficStats - derived statistics over stored telemetry
//!
//! ## Responsibilities
//!
//! - Reset-tolerant counter reconciliation (pure, `reconcile`)
//! - Hourly traffic profiles for a calendar day (`hourly`)
//! - Dashboard-facing reads: latest totals, IN/OUT, distribution, day totals
//!
//! Persistence failures degrade to empty results here, so callers always get
//! zero-filled data instead of a propagated fault.

pub mod hourly;
pub mod reconcile;
mod types;

pub use types::{
    Category, CategoryFilter, DaySelector, DayTotals, Distribution, HourlyProfile, LaneFilter,
    LatestTotals, Overview,
};

use chrono::{Local, NaiveDate};
use std::sync::Arc;

use crate::telemetry_store::{TelemetryRepository, TelemetrySample};

/// Read-side statistics service
pub struct TrafficStatsService {
    repository: TelemetryRepository,
}

impl TrafficStatsService {
    pub fn new(repository: TelemetryRepository) -> Arc<Self> {
        Arc::new(Self { repository })
    }

    /// Latest cumulative totals; zero-filled when the store is empty or
    /// unreadable.
    pub async fn latest_totals(&self) -> LatestTotals {
        let sample = match self.repository.latest(1).await {
            Ok(mut rows) => rows.pop(),
            Err(e) => {
                tracing::error!(error = %e, "Latest sample query failed, serving zeros");
                None
            }
        };

        match sample {
            Some(s) => LatestTotals {
                timestamp: Some(s.timestamp.clone()),
                car_total: s.car_total,
                bicycle_total: s.bicycle_total,
                person_total: s.person_total,
                lc1_entry: s.lc1_entry_count,
                lc1_exit: s.lc1_exit_count,
                lc2_entry: s.lc2_entry_count,
                lc2_exit: s.lc2_exit_count,
                roi_car: s.roi_car_cumulative,
                roi_bicycle: s.roi_bicycle_cumulative,
                roi_person: s.roi_person_cumulative,
            },
            None => LatestTotals::default(),
        }
    }

    /// IN/OUT totals for the selected lanes plus distribution percentages.
    pub async fn overview(&self, lanes: LaneFilter) -> Overview {
        let totals = self.latest_totals().await;
        let record_count = self.repository.total_count().await.unwrap_or(0);

        let (total_in, total_out) = match lanes {
            LaneFilter::Lc1 => (totals.lc1_entry, totals.lc1_exit),
            LaneFilter::Lc2 => (totals.lc2_entry, totals.lc2_exit),
            LaneFilter::All => (
                totals.lc1_entry + totals.lc2_entry,
                totals.lc1_exit + totals.lc2_exit,
            ),
        };

        Overview {
            total_in,
            total_out,
            current_stay: (total_in - total_out).max(0),
            record_count,
            distribution: distribution(&totals),
        }
    }

    /// 24-slot hourly profile for a day and category filter.
    pub async fn hourly(&self, day: DaySelector, filter: CategoryFilter) -> HourlyProfile {
        let samples = self.day_samples(day).await;
        hourly::hourly_profile(&samples, filter)
    }

    /// Reconciled per-counter totals for a day (sum of non-negative deltas).
    pub async fn day_totals(&self, day: DaySelector) -> DayTotals {
        let samples = self.day_samples(day).await;

        let total = |extract: fn(&TelemetrySample) -> i64| {
            let series: Vec<i64> = samples.iter().map(extract).collect();
            reconcile::period_total(&series)
        };

        DayTotals {
            lc1_entry: total(|s| s.lc1_entry_count),
            lc1_exit: total(|s| s.lc1_exit_count),
            lc2_entry: total(|s| s.lc2_entry_count),
            lc2_exit: total(|s| s.lc2_exit_count),
            roi_car: total(|s| s.roi_car_cumulative),
            roi_bicycle: total(|s| s.roi_bicycle_cumulative),
            roi_person: total(|s| s.roi_person_cumulative),
        }
    }

    /// Calendar days covered by the store, earliest first.
    pub async fn available_dates(&self) -> Vec<NaiveDate> {
        let extent = match self.repository.day_extent().await {
            Ok(extent) => extent,
            Err(e) => {
                tracing::error!(error = %e, "Day extent query failed");
                None
            }
        };

        let Some((min_raw, max_raw)) = extent else {
            return Vec::new();
        };
        let (Some(min), Some(max)) = (
            crate::telemetry_store::parse_timestamp(&min_raw),
            crate::telemetry_store::parse_timestamp(&max_raw),
        ) else {
            return Vec::new();
        };

        let mut dates = Vec::new();
        let mut current = min.date();
        while current <= max.date() {
            dates.push(current);
            current = current.succ_opt().expect("date overflow");
        }
        dates
    }

    async fn day_samples(&self, day: DaySelector) -> Vec<TelemetrySample> {
        let (start, end) = day_range(day);
        match self.repository.query_range(&start, &end).await {
            Ok(samples) => samples,
            Err(e) => {
                tracing::error!(error = %e, "Day range query failed, serving empty profile");
                Vec::new()
            }
        }
    }
}

/// Query bounds for a day selector, in stored timestamp format.
fn day_range(day: DaySelector) -> (String, String) {
    match day {
        DaySelector::Current => {
            let now = Local::now().naive_local();
            (
                format!("{}T00:00:00", now.date().format("%Y-%m-%d")),
                now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            )
        }
        DaySelector::Date(date) => (
            format!("{}T00:00:00", date.format("%Y-%m-%d")),
            format!("{}T23:59:59.999999", date.format("%Y-%m-%d")),
        ),
    }
}

fn distribution(totals: &LatestTotals) -> Distribution {
    let sum = totals.car_total + totals.bicycle_total + totals.person_total;
    if sum <= 0 {
        return Distribution::default();
    }

    let pct = |v: i64| (v as f64 / sum as f64 * 1000.0).round() / 10.0;
    Distribution {
        car_pct: pct(totals.car_total),
        bicycle_pct: pct(totals.bicycle_total),
        person_pct: pct(totals.person_total),
    }
}
