use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{DataSourceError, Result};
use crate::models::{MetricFrame, MetricPoint};

/// Converts raw backend points into a columnar frame for one target.
///
/// Points are consumed in input order; no sorting, no deduplication. A point
/// whose metric field is absent, null, or non-numeric contributes `None` to
/// the value column. A timestamp that cannot be parsed fails the whole
/// target: frames are complete or absent, never truncated.
pub fn frame_from_points(
    points: &[MetricPoint],
    metric: &str,
    ref_id: &str,
) -> Result<MetricFrame> {
    let mut times = Vec::with_capacity(points.len());
    let mut values = Vec::with_capacity(points.len());

    for point in points {
        times.push(parse_timestamp(&point.timestamp)?.timestamp_millis());
        values.push(point.value(metric));
    }

    Ok(MetricFrame {
        ref_id: ref_id.to_string(),
        metric: metric.to_string(),
        times,
        values,
    })
}

/// Parses a backend timestamp. RFC 3339 with an offset is preferred; the
/// backend also serializes naive ISO 8601 datetimes, which are taken as UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|source| DataSourceError::MalformedTimestamp {
            raw: raw.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn points(raw: serde_json::Value) -> Vec<MetricPoint> {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn two_points_transform_into_aligned_columns() {
        let points = points(json!([
            {"timestamp": "2024-01-01T00:00:00Z", "cpu_usage": 42.5},
            {"timestamp": "2024-01-01T00:01:00Z", "cpu_usage": 47.0},
        ]));

        let frame = frame_from_points(&points, "cpu_usage", "A").unwrap();

        assert_eq!(frame.ref_id, "A");
        assert_eq!(frame.metric, "cpu_usage");
        assert_eq!(frame.times, vec![1704067200000, 1704067260000]);
        assert_eq!(frame.values, vec![Some(42.5), Some(47.0)]);
    }

    #[test]
    fn input_order_is_preserved_even_when_unsorted() {
        let points = points(json!([
            {"timestamp": "2024-01-01T00:02:00Z", "cpu_usage": 3.0},
            {"timestamp": "2024-01-01T00:00:00Z", "cpu_usage": 1.0},
            {"timestamp": "2024-01-01T00:01:00Z", "cpu_usage": 2.0},
        ]));

        let frame = frame_from_points(&points, "cpu_usage", "A").unwrap();

        assert_eq!(frame.len(), 3);
        assert_eq!(
            frame.times,
            vec![1704067320000, 1704067200000, 1704067260000]
        );
        assert_eq!(frame.values, vec![Some(3.0), Some(1.0), Some(2.0)]);
    }

    #[test]
    fn missing_and_null_values_become_gaps() {
        let points = points(json!([
            {"timestamp": "2024-01-01T00:00:00Z", "cpu_usage": 42.5},
            {"timestamp": "2024-01-01T00:01:00Z"},
            {"timestamp": "2024-01-01T00:02:00Z", "cpu_usage": null},
        ]));

        let frame = frame_from_points(&points, "cpu_usage", "A").unwrap();

        assert_eq!(frame.values, vec![Some(42.5), None, None]);
        assert_eq!(frame.times.len(), frame.values.len());
    }

    #[test]
    fn non_numeric_values_read_as_gaps() {
        let points = points(json!([
            {"timestamp": "2024-01-01T00:00:00Z", "cpu_usage": "high"},
        ]));

        let frame = frame_from_points(&points, "cpu_usage", "A").unwrap();
        assert_eq!(frame.values, vec![None]);
    }

    #[test]
    fn integer_values_widen_to_floats() {
        let points = points(json!([
            {"timestamp": "2024-01-01T00:00:00Z", "cpu_usage": 42},
        ]));

        let frame = frame_from_points(&points, "cpu_usage", "A").unwrap();
        assert_eq!(frame.values, vec![Some(42.0)]);
    }

    #[test]
    fn naive_timestamps_are_taken_as_utc() {
        let points = points(json!([
            {"timestamp": "2024-01-01T00:00:00", "cpu_usage": 1.0},
            {"timestamp": "2024-01-01T00:00:00.123456", "cpu_usage": 2.0},
        ]));

        let frame = frame_from_points(&points, "cpu_usage", "A").unwrap();
        assert_eq!(frame.times, vec![1704067200000, 1704067200123]);
    }

    #[test]
    fn offset_timestamps_normalize_to_utc() {
        let points = points(json!([
            {"timestamp": "2024-01-01T01:00:00+01:00", "cpu_usage": 1.0},
        ]));

        let frame = frame_from_points(&points, "cpu_usage", "A").unwrap();
        assert_eq!(frame.times, vec![1704067200000]);
    }

    #[test]
    fn malformed_timestamp_fails_the_whole_target() {
        let points = points(json!([
            {"timestamp": "2024-01-01T00:00:00Z", "cpu_usage": 1.0},
            {"timestamp": "yesterday", "cpu_usage": 2.0},
        ]));

        let err = frame_from_points(&points, "cpu_usage", "A").unwrap_err();
        match err {
            DataSourceError::MalformedTimestamp { raw, .. } => assert_eq!(raw, "yesterday"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_input_yields_an_empty_frame() {
        let frame = frame_from_points(&[], "cpu_usage", "A").unwrap();

        assert!(frame.is_empty());
        assert_eq!(frame.ref_id, "A");
        assert_eq!(frame.metric, "cpu_usage");
    }
}
