//! Hourly traffic aggregation
//!
//! Buckets one calendar day of samples into 24 hour-of-day slots. Each hour's
//! value per category is `max(0, last - first)` among its samples - the same
//! reset-tolerant clamp as pairwise reconciliation, applied at bucket
//! granularity. Hours without samples stay zero.

use chrono::Timelike;

use super::reconcile::clamped_span;
use super::types::{Category, CategoryFilter, HourlyProfile};
use crate::telemetry_store::TelemetrySample;

/// Build the 24-slot profile for an already day-scoped, ascending sample set.
///
/// Samples with an unreadable timestamp are skipped. A filter of "only X"
/// zeroes the other categories without touching X.
pub fn hourly_profile(samples: &[TelemetrySample], filter: CategoryFilter) -> HourlyProfile {
    // (first, last) ROI value per hour per category
    let mut spans: [[Option<(i64, i64)>; 24]; 3] = [[None; 24]; 3];

    for sample in samples {
        let Some(at) = sample.parsed_timestamp() else {
            tracing::debug!(timestamp = %sample.timestamp, "Skipping sample with unreadable timestamp");
            continue;
        };
        let hour = at.hour() as usize;

        for (slot, value) in [
            (0, sample.roi_car_cumulative),
            (1, sample.roi_bicycle_cumulative),
            (2, sample.roi_person_cumulative),
        ] {
            spans[slot][hour] = Some(match spans[slot][hour] {
                None => (value, value),
                Some((first, _)) => (first, value),
            });
        }
    }

    let mut profile = HourlyProfile::default();
    for hour in 0..24 {
        if let Some((first, last)) = spans[0][hour] {
            profile.car[hour] = clamped_span(first, last);
        }
        if let Some((first, last)) = spans[1][hour] {
            profile.bicycle[hour] = clamped_span(first, last);
        }
        if let Some((first, last)) = spans[2][hour] {
            profile.person[hour] = clamped_span(first, last);
        }
    }

    if !filter.includes(Category::Car) {
        profile.car = [0; 24];
    }
    if !filter.includes(Category::Bicycle) {
        profile.bicycle = [0; 24];
    }
    if !filter.includes(Category::Person) {
        profile.person = [0; 24];
    }

    profile
}
