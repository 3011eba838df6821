//! Counting-message parser
//!
//! Extracts the cumulative totals from the analytics pipeline's JSON. Only
//! the `total` / `entry` / `exit` / per-class cumulative fields matter here;
//! per-frame detections in the same payload are ignored. Missing sections
//! default to zero so partial messages still produce a usable sample.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::telemetry_store::CounterValues;

/// Parse one pipeline message into its timestamp and counter values.
pub fn parse_counting_message(payload: &str) -> Result<(String, CounterValues)> {
    let root: Value = serde_json::from_str(payload)
        .map_err(|e| Error::Parse(format!("invalid JSON: {e}")))?;

    let timestamp = root
        .get("timestamp")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Parse("missing timestamp".to_string()))?
        .to_string();

    let mut values = CounterValues::default();

    if let Some(objects) = root.get("objects") {
        values.car_total = class_total(objects, "car");
        values.bicycle_total = class_total(objects, "bicycle");
        values.person_total = class_total(objects, "person");
    }

    if let Some(analytics) = root.get("analytics") {
        if let Some(lc1) = analytics.get("line_crossing_pair_1") {
            values.lc1_entry_count = int_field(lc1, "entry");
            values.lc1_exit_count = int_field(lc1, "exit");
        }
        if let Some(lc2) = analytics.get("line_crossing_pair_2") {
            values.lc2_entry_count = int_field(lc2, "entry");
            values.lc2_exit_count = int_field(lc2, "exit");
        }
        if let Some(roi) = analytics.get("roi_cumulative_per_class") {
            values.roi_car_cumulative = int_field(roi, "car");
            values.roi_bicycle_cumulative = int_field(roi, "bicycle");
            values.roi_person_cumulative = int_field(roi, "person");
        }
    }

    Ok((timestamp, values))
}

/// `objects.<class>.total`, zero when the class block is absent or malformed.
fn class_total(objects: &Value, class: &str) -> i64 {
    objects
        .get(class)
        .filter(|v| v.is_object())
        .map(|v| int_field(v, "total"))
        .unwrap_or(0)
}

/// Integer field with tolerance for values serialized as strings.
fn int_field(value: &Value, key: &str) -> i64 {
    match value.get(key) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_PAYLOAD: &str = r#"{
        "timestamp": "2026-08-25T14:30:05.123",
        "objects": {
            "car": {"total": 42, "current": 3},
            "bicycle": {"total": 7},
            "person": {"total": 19}
        },
        "analytics": {
            "line_crossing_pair_1": {"entry": 12, "exit": 9},
            "line_crossing_pair_2": {"entry": 4, "exit": 2},
            "roi_cumulative_per_class": {"car": 30, "bicycle": 5, "person": 15}
        }
    }"#;

    #[test]
    fn parses_full_payload() {
        let (timestamp, values) = parse_counting_message(FULL_PAYLOAD).unwrap();
        assert_eq!(timestamp, "2026-08-25T14:30:05.123");
        assert_eq!(values.car_total, 42);
        assert_eq!(values.bicycle_total, 7);
        assert_eq!(values.person_total, 19);
        assert_eq!(values.lc1_entry_count, 12);
        assert_eq!(values.lc1_exit_count, 9);
        assert_eq!(values.lc2_entry_count, 4);
        assert_eq!(values.lc2_exit_count, 2);
        assert_eq!(values.roi_car_cumulative, 30);
        assert_eq!(values.roi_person_cumulative, 15);
    }

    #[test]
    fn missing_sections_default_to_zero() {
        let (_, values) = parse_counting_message(
            r#"{"timestamp": "2026-08-25T14:30:05", "objects": {"car": {"total": 5}}}"#,
        )
        .unwrap();
        assert_eq!(values.car_total, 5);
        assert_eq!(values.bicycle_total, 0);
        assert_eq!(values.lc1_exit_count, 0);
        assert_eq!(values.roi_person_cumulative, 0);
    }

    #[test]
    fn non_object_class_block_is_ignored() {
        let (_, values) = parse_counting_message(
            r#"{"timestamp": "2026-08-25T14:30:05", "objects": {"car": 5}}"#,
        )
        .unwrap();
        assert_eq!(values.car_total, 0);
    }

    #[test]
    fn rejects_invalid_json_and_missing_timestamp() {
        assert!(parse_counting_message("not json").is_err());
        assert!(parse_counting_message(r#"{"objects": {}}"#).is_err());
    }
}
