//! Partition enumeration
//!
//! Telemetry is exported to the object store in hour-aligned partitions
//! addressed by a deterministic path. Enumeration walks a time range one
//! hour at a time and renders the partition path for each step.

use chrono::{DateTime, Datelike, Duration, DurationRound, Timelike, Utc};
use serde::{Deserialize, Serialize};

use opsdeck_common::error::TelemetryError;

/// A half-open-looking but endpoint-inclusive time window.
///
/// The hour containing `end` is always enumerated, even when `end` falls
/// mid-hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Build a range, rejecting `start > end` before any fetch is dispatched.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TelemetryError> {
        if start > end {
            return Err(TelemetryError::InvalidRange(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Enumerate the partition paths covering this range, in ascending hour
    /// order, one per hour in `[start, end]`.
    ///
    /// The cursor starts at `start` truncated to the top of its hour and
    /// advances until it passes `end`; the boundary check is "cursor not
    /// after end", so an `end` exactly on an hour boundary is included. No
    /// upper bound is enforced here - range sanity is the caller's job.
    #[must_use]
    pub fn hourly_partitions(&self, scope: &str) -> Vec<String> {
        if self.start > self.end {
            return Vec::new();
        }

        let mut cursor = self
            .start
            .duration_trunc(Duration::hours(1))
            .unwrap_or(self.start);
        let mut paths = Vec::new();
        while cursor <= self.end {
            paths.push(partition_path(scope, cursor));
            cursor += Duration::hours(1);
        }
        paths
    }
}

/// Render the partition path for one hour.
///
/// The template must match the upstream diagnostic export byte-for-byte;
/// it is a compatibility contract, not a design choice.
#[must_use]
pub fn partition_path(scope: &str, hour: DateTime<Utc>) -> String {
    format!(
        "/resourceId={}/y={}/m={:02}/d={:02}/h={:02}/m=00/PT1H.json",
        scope,
        hour.year(),
        hour.month(),
        hour.day(),
        hour.hour()
    )
}
