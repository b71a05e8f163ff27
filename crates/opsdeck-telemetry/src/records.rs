//! Telemetry record schemas
//!
//! Two record shapes come out of the upstream diagnostic export: query
//! runtime statistics and resource metrics. Field names must match the
//! export format byte-for-byte; the serde renames below are a
//! compatibility contract with that format.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A record schema the ingestion pipeline can fetch and decode.
///
/// `CONTAINER` names the object-store container the schema's partitions
/// live in; `TIMESTAMP_FIELDS` lists the JSON keys holding timestamps,
/// which the decoder's repair pass may normalize.
pub trait TelemetryRecord:
    DeserializeOwned + Serialize + Send + Sync + Unpin + 'static
{
    const CONTAINER: &'static str;
    const TIMESTAMP_FIELDS: &'static [&'static str];
}

/// One row of query-performance telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRuntimeRecord {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, rename = "operationName")]
    pub operation_name: String,
    #[serde(default, rename = "resourceId")]
    pub resource_id: String,
    pub properties: QueryStatistics,
    pub time: DateTime<Utc>,
}

/// The nested statistics block of a query runtime record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryStatistics {
    #[serde(rename = "Min_time")]
    pub min_time: f64,
    #[serde(rename = "Max_time")]
    pub max_time: f64,
    #[serde(rename = "Mean_time")]
    pub mean_time: f64,
    #[serde(rename = "Stddev_time")]
    pub stddev_time: f64,
    #[serde(rename = "Rows")]
    pub rows: i64,
    #[serde(rename = "Shared_blks_hit")]
    pub shared_blks_hit: i64,
    #[serde(rename = "Shared_blks_read")]
    pub shared_blks_read: i64,
    #[serde(rename = "Shared_blks_dirtied")]
    pub shared_blks_dirtied: i64,
    #[serde(rename = "Shared_blks_written")]
    pub shared_blks_written: i64,
    #[serde(rename = "Local_blks_hit")]
    pub local_blks_hit: i64,
    #[serde(rename = "Local_blks_read")]
    pub local_blks_read: i64,
    #[serde(rename = "Local_blks_dirtied")]
    pub local_blks_dirtied: i64,
    #[serde(rename = "Local_blks_written")]
    pub local_blks_written: i64,
    #[serde(rename = "Temp_blks_read")]
    pub temp_blks_read: i64,
    #[serde(rename = "Temp_blks_written")]
    pub temp_blks_written: i64,
    #[serde(rename = "Blk_read_time")]
    pub blk_read_time: f64,
    #[serde(rename = "Blk_write_time")]
    pub blk_write_time: f64,
    #[serde(rename = "Is_system_query")]
    pub is_system_query: bool,
    #[serde(rename = "Query_type")]
    pub query_type: String,
    #[serde(rename = "Runtime_stats_entry_id")]
    pub runtime_stats_entry_id: i64,
    #[serde(rename = "Userid")]
    pub user_id: i64,
    #[serde(rename = "Dbid")]
    pub db_id: i64,
    #[serde(rename = "Queryid")]
    pub query_id: i64,
    #[serde(rename = "Queryid_str")]
    pub query_id_str: String,
    #[serde(rename = "Plan_id")]
    pub plan_id: String,
    #[serde(rename = "Start_time")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "End_time")]
    pub end_time: DateTime<Utc>,
    #[serde(rename = "Calls")]
    pub calls: i64,
    #[serde(rename = "Total_time")]
    pub total_time: f64,
}

impl TelemetryRecord for QueryRuntimeRecord {
    const CONTAINER: &'static str = "insights-logs-postgresqlflexquerystoreruntime";
    const TIMESTAMP_FIELDS: &'static [&'static str] = &["time", "Start_time", "End_time"];
}

/// One row of resource-metric telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub count: i64,
    pub total: f64,
    pub minimum: f64,
    pub maximum: f64,
    pub average: f64,
    #[serde(rename = "resourceId")]
    pub resource_id: String,
    pub time: DateTime<Utc>,
    #[serde(rename = "metricName")]
    pub metric_name: String,
    #[serde(rename = "timeGrain")]
    pub time_grain: String,
}

impl TelemetryRecord for MetricRecord {
    const CONTAINER: &'static str = "insights-metrics-pt1m";
    const TIMESTAMP_FIELDS: &'static [&'static str] = &["time"];
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[test]
    fn metric_record_uses_export_field_names() {
        let line = r#"{"count":4,"total":12.0,"minimum":1.0,"maximum":5.0,"average":3.0,"resourceId":"/SUBSCRIPTIONS/S/X","time":"2025-01-01T00:00:00Z","metricName":"cpu_percent","timeGrain":"PT1M"}"#;
        let record: MetricRecord = serde_json::from_str(line).unwrap();
        assert_eq!(record.metric_name, "cpu_percent");
        assert_eq!(record.count, 4);
        assert_eq!(record.time_grain, "PT1M");
    }

    #[test]
    fn query_runtime_statistics_round_trip() {
        let line = sample_runtime_line();
        let record: QueryRuntimeRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(record.properties.calls, 7);
        assert_eq!(record.properties.query_id, 42);
        assert!(!record.properties.is_system_query);

        let json = serde_json::to_value(&record).unwrap();
        assert!(json["properties"].get("Mean_time").is_some());
        assert!(json["properties"].get("Queryid_str").is_some());
    }

    pub(crate) fn sample_runtime_line() -> String {
        r#"{"category":"PostgreSQLFlexQueryStoreRuntime","location":"westeurope","operationName":"LogEvent","resourceId":"/SUBSCRIPTIONS/S/X","time":"2025-01-01T00:00:00Z","properties":{"Min_time":0.1,"Max_time":9.5,"Mean_time":1.2,"Stddev_time":0.4,"Rows":10,"Shared_blks_hit":5,"Shared_blks_read":1,"Shared_blks_dirtied":0,"Shared_blks_written":0,"Local_blks_hit":0,"Local_blks_read":0,"Local_blks_dirtied":0,"Local_blks_written":0,"Temp_blks_read":0,"Temp_blks_written":0,"Blk_read_time":0.0,"Blk_write_time":0.0,"Is_system_query":false,"Query_type":"select","Runtime_stats_entry_id":3,"Userid":16384,"Dbid":5,"Queryid":42,"Queryid_str":"42","Plan_id":"p1","Start_time":"2025-01-01T00:00:00Z","End_time":"2025-01-01T00:15:00Z","Calls":7,"Total_time":8.4}}"#
            .to_string()
    }
}
