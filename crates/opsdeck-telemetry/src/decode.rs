//! Newline-delimited record decoding
//!
//! The upstream exporter occasionally emits timestamps without a timezone
//! designator. Appending `Z` is a cheap, idempotent normalization, but it
//! must not mask genuinely corrupt records: a line that still fails after
//! one repair attempt aborts the decode with full context.

use serde_json::Value;

use opsdeck_common::error::TelemetryError;

use crate::records::TelemetryRecord;

/// Decode a partition's payload into records, preserving line order.
///
/// Each line is parsed independently. On a parse failure the timestamp
/// repair pass runs and the line is re-parsed exactly once; a second
/// failure stops the decode and surfaces the offending line and source
/// partition. Blank lines are skipped.
pub fn decode_lines<T: TelemetryRecord>(
    data: &[u8],
    partition: &str,
) -> Result<Vec<T>, TelemetryError> {
    let text = std::str::from_utf8(data).map_err(|e| TelemetryError::Decode {
        partition: partition.to_string(),
        line: "<invalid utf-8>".to_string(),
        reason: e.to_string(),
    })?;

    let mut records = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(record) => records.push(record),
            Err(first_err) => {
                let record = repair_line::<T>(line, partition, &first_err.to_string())?;
                records.push(record);
            }
        }
    }
    Ok(records)
}

/// Run the one-shot timestamp repair and re-parse.
fn repair_line<T: TelemetryRecord>(
    line: &str,
    partition: &str,
    first_reason: &str,
) -> Result<T, TelemetryError> {
    let decode_error = |reason: String| TelemetryError::Decode {
        partition: partition.to_string(),
        line: line.to_string(),
        reason,
    };

    // If the line is not even JSON, repair cannot help.
    let mut value: Value =
        serde_json::from_str(line).map_err(|_| decode_error(first_reason.to_string()))?;
    repair_timestamps(&mut value, T::TIMESTAMP_FIELDS);
    serde_json::from_value(value).map_err(|e| decode_error(e.to_string()))
}

/// Append `Z` to every timestamp-typed string field that does not already
/// carry an explicit UTC marker. Walks nested objects and arrays so
/// timestamps inside property blocks are reached too.
fn repair_timestamps(value: &mut Value, fields: &[&str]) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                match entry {
                    Value::String(s) if fields.contains(&key.as_str()) => {
                        if !has_utc_marker(s) {
                            s.push('Z');
                        }
                    }
                    Value::Object(_) | Value::Array(_) => repair_timestamps(entry, fields),
                    _ => {}
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                repair_timestamps(item, fields);
            }
        }
        _ => {}
    }
}

fn has_utc_marker(s: &str) -> bool {
    s.ends_with('Z') || s.ends_with("+00:00") || s.ends_with("+00")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{MetricRecord, QueryRuntimeRecord};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    const PARTITION: &str = "/resourceId=/S/y=2025/m=01/d=01/h=00/m=00/PT1H.json";

    fn metric_line(time: &str) -> String {
        format!(
            r#"{{"count":1,"total":2.0,"minimum":2.0,"maximum":2.0,"average":2.0,"resourceId":"/S/X","time":"{time}","metricName":"cpu_percent","timeGrain":"PT1M"}}"#
        )
    }

    #[test]
    fn missing_utc_marker_is_repaired() {
        let bare = metric_line("2025-01-01T00:00:00");
        let repaired: Vec<MetricRecord> = decode_lines(bare.as_bytes(), PARTITION).unwrap();

        let explicit = metric_line("2025-01-01T00:00:00Z");
        let reference: Vec<MetricRecord> = decode_lines(explicit.as_bytes(), PARTITION).unwrap();

        assert_eq!(repaired, reference);
        assert_eq!(
            repaired[0].time,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[rstest]
    #[case("2025-01-01T00:00:00Z")]
    #[case("2025-01-01T00:00:00+00:00")]
    #[case("2025-01-01T00:00:00+00")]
    fn explicit_utc_markers_are_left_alone(#[case] time: &str) {
        let mut value: Value = serde_json::from_str(&metric_line(time)).unwrap();
        repair_timestamps(&mut value, MetricRecord::TIMESTAMP_FIELDS);
        assert_eq!(value["time"].as_str().unwrap(), time);
    }

    #[test]
    fn nested_timestamps_are_repaired() {
        let line = crate::records::tests::sample_runtime_line()
            .replace("\"Start_time\":\"2025-01-01T00:00:00Z\"", "\"Start_time\":\"2025-01-01T00:00:00\"")
            .replace("\"End_time\":\"2025-01-01T00:15:00Z\"", "\"End_time\":\"2025-01-01T00:15:00\"");
        let records: Vec<QueryRuntimeRecord> = decode_lines(line.as_bytes(), PARTITION).unwrap();
        assert_eq!(
            records[0].properties.end_time,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 15, 0).unwrap()
        );
    }

    #[test]
    fn repair_runs_at_most_once() {
        // Still broken after one repair: "Z" lands on a non-timestamp value.
        let line = metric_line("not-a-timestamp");
        let err = decode_lines::<MetricRecord>(line.as_bytes(), PARTITION).unwrap_err();
        match err {
            TelemetryError::Decode { partition, line, .. } => {
                assert_eq!(partition, PARTITION);
                assert!(line.contains("not-a-timestamp"));
            }
            other => panic!("expected decode error, got {other}"),
        }
    }

    #[test]
    fn non_json_line_fails_with_context() {
        let err = decode_lines::<MetricRecord>(b"definitely not json", PARTITION).unwrap_err();
        assert!(matches!(err, TelemetryError::Decode { .. }));
    }

    #[test]
    fn decode_stops_at_first_bad_line() {
        let payload = format!(
            "{}\n{}\n{}",
            metric_line("2025-01-01T00:00:00Z"),
            "{\"broken\":",
            metric_line("2025-01-01T00:01:00Z"),
        );
        let err = decode_lines::<MetricRecord>(payload.as_bytes(), PARTITION).unwrap_err();
        assert!(matches!(err, TelemetryError::Decode { .. }));
    }

    #[test]
    fn line_order_is_preserved_within_a_partition() {
        let payload = format!(
            "{}\n{}\n",
            metric_line("2025-01-01T00:05:00Z"),
            metric_line("2025-01-01T00:01:00Z"),
        );
        let records: Vec<MetricRecord> = decode_lines(payload.as_bytes(), PARTITION).unwrap();
        assert_eq!(records.len(), 2);
        // Not re-sorted: original line order survives.
        assert!(records[0].time > records[1].time);
    }
}
