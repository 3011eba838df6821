//! Counter reconciliation
//!
//! Converts ordered cumulative-counter samples into non-negative interval
//! deltas. A decrease between consecutive samples is a counting-session
//! restart and contributes zero - never a negative delta, never a spike.
//! The small undercount at a reset boundary is accepted policy.

use chrono::NaiveDateTime;

/// Pairwise deltas across consecutive values, clamped at session resets.
///
/// Input must already be ascending by time; the output has `len - 1` entries
/// (empty for fewer than two samples).
pub fn interval_deltas(values: &[i64]) -> Vec<i64> {
    values
        .windows(2)
        .map(|pair| delta(pair[0], pair[1]))
        .collect()
}

/// Non-negative increase from `prev` to `curr`; zero when the counter reset.
pub fn delta(prev: i64, curr: i64) -> i64 {
    if curr >= prev {
        curr - prev
    } else {
        0
    }
}

/// Reconciled total over a period: the sum of all pairwise deltas.
pub fn period_total(values: &[i64]) -> i64 {
    interval_deltas(values).iter().sum()
}

/// Reset-tolerant span of one bucket: `max(0, last - first)`.
pub fn clamped_span(first: i64, last: i64) -> i64 {
    (last - first).max(0)
}

/// Deltas over timestamped points whose order is not guaranteed.
///
/// Sorts defensively before reconciling; callers holding samples straight
/// from an ordered store query use [`interval_deltas`] directly.
pub fn interval_deltas_by_time(points: &mut Vec<(NaiveDateTime, i64)>) -> Vec<i64> {
    points.sort_by_key(|(at, _)| *at);
    let values: Vec<i64> = points.iter().map(|(_, v)| v).copied().collect();
    interval_deltas(&values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn delta_is_never_negative() {
        assert_eq!(delta(5, 8), 3);
        assert_eq!(delta(8, 8), 0);
        assert_eq!(delta(8, 2), 0);
        assert_eq!(delta(0, 0), 0);
    }

    #[test]
    fn reset_sequence_from_field_data() {
        // lc1_exit over five polls, with a pipeline restart at the fourth
        let values = [5, 5, 8, 2, 4];
        assert_eq!(interval_deltas(&values), vec![0, 3, 0, 2]);
        assert_eq!(period_total(&values), 5);
    }

    #[test]
    fn short_inputs_yield_no_deltas() {
        assert!(interval_deltas(&[]).is_empty());
        assert!(interval_deltas(&[42]).is_empty());
        assert_eq!(period_total(&[42]), 0);
    }

    #[test]
    fn clamped_span_absorbs_mid_bucket_reset() {
        assert_eq!(clamped_span(10, 25), 15);
        assert_eq!(clamped_span(25, 3), 0);
    }

    #[test]
    fn unordered_points_are_sorted_first() {
        let day = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
        let at = |h| day.and_hms_opt(h, 0, 0).unwrap();

        let mut points = vec![(at(12), 8), (at(10), 5), (at(11), 5)];
        assert_eq!(interval_deltas_by_time(&mut points), vec![0, 3]);
    }
}
