//! Workload views and log options

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Condensed pod status served by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadStatus {
    pub image: String,
    pub name: String,
    pub phase: String,
    #[serde(rename = "startTime")]
    pub start_time: Option<DateTime<Utc>>,
}

/// Pod log retrieval options, mirroring the cluster API query parameters.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub follow: bool,
    pub since_seconds: Option<i64>,
    pub since_time: Option<DateTime<Utc>>,
    pub timestamps: bool,
    pub tail_lines: Option<i64>,
}

impl LogOptions {
    /// Render the options as cluster API query parameters.
    #[must_use]
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if self.follow {
            query.push(("follow", "true".to_string()));
        }
        if let Some(seconds) = self.since_seconds {
            query.push(("sinceSeconds", seconds.to_string()));
        }
        if let Some(since) = self.since_time {
            query.push(("sinceTime", since.to_rfc3339()));
        }
        if self.timestamps {
            query.push(("timestamps", "true".to_string()));
        }
        if let Some(lines) = self.tail_lines {
            query.push(("tailLines", lines.to_string()));
        }
        query
    }
}

/// Condense a pod-list response into dashboard statuses.
///
/// Pods without a name are dropped; a missing first-container image or
/// phase degrades to an empty string rather than rejecting the pod.
#[must_use]
pub fn condense_pod_list(list: &Value) -> Vec<WorkloadStatus> {
    let items = match list.get("items").and_then(Value::as_array) {
        Some(items) => items,
        None => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|pod| {
            let name = pod
                .pointer("/metadata/name")
                .and_then(Value::as_str)?
                .to_string();
            let image = pod
                .pointer("/spec/containers/0/image")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let phase = pod
                .pointer("/status/phase")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let start_time = pod
                .pointer("/status/startTime")
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc));

            Some(WorkloadStatus {
                image,
                name,
                phase,
                start_time,
            })
        })
        .collect()
}
