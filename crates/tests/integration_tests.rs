//! Integration tests for Opsdeck
//!
//! These tests drive the telemetry pipeline end-to-end: time range in,
//! partition enumeration, concurrent object-store fetches, decode with
//! timestamp repair, and fan-in into the merged result set.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use opsdeck_common::config::TelemetryConfig;
use opsdeck_common::error::{Error, TelemetryError};
use opsdeck_security::JwtAuth;
use opsdeck_telemetry::records::TelemetryRecord;
use opsdeck_telemetry::{
    MemoryStore, MetricRecord, QueryRuntimeRecord, StoreTelemetryRepository, TelemetryRepository,
    TimeRange,
};

const SCOPE: &str =
    "/SUBSCRIPTIONS/S/RESOURCEGROUPS/G/PROVIDERS/MICROSOFT.DBFORPOSTGRESQL/FLEXIBLESERVERS/F";

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

fn config() -> TelemetryConfig {
    TelemetryConfig {
        resource_scope: SCOPE.to_string(),
        ..TelemetryConfig::default()
    }
}

fn metric_line(name: &str, time: &str) -> String {
    format!(
        r#"{{"count":1,"total":2.0,"minimum":2.0,"maximum":2.0,"average":2.0,"resourceId":"{SCOPE}","time":"{time}","metricName":"{name}","timeGrain":"PT1M"}}"#
    )
}

fn runtime_line(query_id: i64, start_time: &str) -> String {
    format!(
        r#"{{"category":"QueryStoreRuntime","location":"westeurope","operationName":"LogEvent","resourceId":"{SCOPE}","time":"2025-07-01T00:00:00Z","properties":{{"Min_time":0.1,"Max_time":9.5,"Mean_time":1.2,"Stddev_time":0.4,"Rows":10,"Shared_blks_hit":5,"Shared_blks_read":1,"Shared_blks_dirtied":0,"Shared_blks_written":0,"Local_blks_hit":0,"Local_blks_read":0,"Local_blks_dirtied":0,"Local_blks_written":0,"Temp_blks_read":0,"Temp_blks_written":0,"Blk_read_time":0.0,"Blk_write_time":0.0,"Is_system_query":false,"Query_type":"select","Runtime_stats_entry_id":3,"Userid":16384,"Dbid":5,"Queryid":{query_id},"Queryid_str":"{query_id}","Plan_id":"p1","Start_time":"{start_time}","End_time":"2025-07-01T00:15:00Z","Calls":7,"Total_time":8.4}}}}"#
    )
}

// ============================================================================
// Range Query Pipeline
// ============================================================================

#[tokio::test]
async fn sparse_partitions_merge_into_one_result_set() {
    // Three hours; the middle one has no export. The merged result is the
    // two surviving records, order unspecified.
    let range = TimeRange::new(utc(2025, 1, 1, 0, 0), utc(2025, 1, 1, 2, 30)).unwrap();
    let paths = range.hourly_partitions(SCOPE);
    assert_eq!(paths.len(), 3);

    let mut store = MemoryStore::new();
    store.insert(
        MetricRecord::CONTAINER,
        &paths[0],
        metric_line("cpu_percent", "2025-01-01T00:00:00Z"),
    );
    store.insert(
        MetricRecord::CONTAINER,
        &paths[2],
        metric_line("cpu_percent", "2025-01-01T02:00:00Z"),
    );

    let repo = StoreTelemetryRepository::new(Arc::new(store), &config());
    let records = repo.metrics(range).await.unwrap();

    let times: HashSet<DateTime<Utc>> = records.iter().map(|r| r.time).collect();
    assert_eq!(
        times,
        HashSet::from([utc(2025, 1, 1, 0, 0), utc(2025, 1, 1, 2, 0)])
    );
}

#[tokio::test]
async fn fully_absent_range_is_empty_not_an_error() {
    let range = TimeRange::new(utc(2025, 1, 1, 0, 0), utc(2025, 1, 1, 23, 59)).unwrap();
    let repo = StoreTelemetryRepository::new(Arc::new(MemoryStore::new()), &config());
    assert!(repo.metrics(range).await.unwrap().is_empty());
    assert!(repo.query_runtime(range).await.unwrap().is_empty());
}

#[tokio::test]
async fn one_failing_partition_discards_every_partial_result() {
    let range = TimeRange::new(utc(2025, 1, 1, 0, 0), utc(2025, 1, 1, 2, 0)).unwrap();
    let paths = range.hourly_partitions(SCOPE);

    let mut store = MemoryStore::new();
    store.insert(
        MetricRecord::CONTAINER,
        &paths[0],
        metric_line("cpu_percent", "2025-01-01T00:00:00Z"),
    );
    store.fail(MetricRecord::CONTAINER, &paths[1]);
    store.insert(
        MetricRecord::CONTAINER,
        &paths[2],
        metric_line("cpu_percent", "2025-01-01T02:00:00Z"),
    );

    let repo = StoreTelemetryRepository::new(Arc::new(store), &config());
    let err = repo.metrics(range).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Telemetry(TelemetryError::Transport { .. })
    ));
}

#[tokio::test]
async fn repaired_timestamps_survive_the_full_pipeline() {
    let range = TimeRange::new(utc(2025, 7, 1, 0, 0), utc(2025, 7, 1, 0, 30)).unwrap();
    let paths = range.hourly_partitions(SCOPE);

    // The exporter dropped the timezone designator on Start_time.
    let mut store = MemoryStore::new();
    store.insert(
        QueryRuntimeRecord::CONTAINER,
        &paths[0],
        runtime_line(42, "2025-07-01T00:05:00"),
    );

    let repo = StoreTelemetryRepository::new(Arc::new(store), &config());
    let records = repo.query_runtime(range).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].properties.start_time, utc(2025, 7, 1, 0, 5));
    assert_eq!(records[0].properties.query_id, 42);
}

#[tokio::test]
async fn corrupt_records_fail_the_query_with_partition_context() {
    let range = TimeRange::new(utc(2025, 7, 1, 0, 0), utc(2025, 7, 1, 0, 30)).unwrap();
    let paths = range.hourly_partitions(SCOPE);

    let mut store = MemoryStore::new();
    store.insert(
        QueryRuntimeRecord::CONTAINER,
        &paths[0],
        "{\"properties\":{},\"time\":\"2025-07-01T00:00:00Z\"}",
    );

    let repo = StoreTelemetryRepository::new(Arc::new(store), &config());
    match repo.query_runtime(range).await.unwrap_err() {
        Error::Telemetry(TelemetryError::Decode { partition, .. }) => {
            assert_eq!(partition, paths[0]);
        }
        other => panic!("expected decode error, got {other}"),
    }
}

#[tokio::test]
async fn bounded_concurrency_matches_unbounded_results() {
    let range = TimeRange::new(utc(2025, 1, 1, 0, 0), utc(2025, 1, 1, 23, 0)).unwrap();
    let paths = range.hourly_partitions(SCOPE);
    assert_eq!(paths.len(), 24);

    let mut store = MemoryStore::new();
    for (hour, path) in paths.iter().enumerate() {
        store.insert(
            MetricRecord::CONTAINER,
            path,
            metric_line(&format!("m{hour}"), "2025-01-01T00:00:00Z"),
        );
    }
    let store: Arc<MemoryStore> = Arc::new(store);

    let unbounded = StoreTelemetryRepository::new(store.clone(), &config());
    let bounded = StoreTelemetryRepository::new(
        store,
        &TelemetryConfig {
            max_concurrent_fetches: 2,
            ..config()
        },
    );

    let mut a: Vec<String> = unbounded
        .metrics(range)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.metric_name)
        .collect();
    let mut b: Vec<String> = bounded
        .metrics(range)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.metric_name)
        .collect();
    a.sort();
    b.sort();
    assert_eq!(a, b);
    assert_eq!(a.len(), 24);
}

// ============================================================================
// Range Semantics
// ============================================================================

#[tokio::test]
async fn partition_for_the_end_hour_is_queried_even_mid_hour() {
    let range = TimeRange::new(utc(2025, 1, 1, 0, 0), utc(2025, 1, 1, 2, 30)).unwrap();
    let paths = range.hourly_partitions(SCOPE);

    // Data sits only in the hour containing the mid-hour end.
    let mut store = MemoryStore::new();
    store.insert(
        MetricRecord::CONTAINER,
        &paths[2],
        metric_line("cpu_percent", "2025-01-01T02:15:00Z"),
    );

    let repo = StoreTelemetryRepository::new(Arc::new(store), &config());
    let records = repo.metrics(range).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn the_two_schemas_read_disjoint_containers() {
    let range = TimeRange::new(utc(2025, 7, 1, 0, 0), utc(2025, 7, 1, 0, 30)).unwrap();
    let paths = range.hourly_partitions(SCOPE);

    let mut store = MemoryStore::new();
    store.insert(
        MetricRecord::CONTAINER,
        &paths[0],
        metric_line("cpu_percent", "2025-07-01T00:00:00Z"),
    );
    store.insert(
        QueryRuntimeRecord::CONTAINER,
        &paths[0],
        runtime_line(7, "2025-07-01T00:00:00Z"),
    );

    let repo = StoreTelemetryRepository::new(Arc::new(store), &config());
    assert_eq!(repo.metrics(range).await.unwrap().len(), 1);
    assert_eq!(repo.query_runtime(range).await.unwrap().len(), 1);
}

// ============================================================================
// Token Flow
// ============================================================================

#[tokio::test]
async fn minted_tokens_validate_against_the_same_secret() {
    let auth = JwtAuth::new("integration-secret").unwrap();
    let token = auth.generate_token("ops-team").unwrap();
    let claims = auth.validate_token(&token).unwrap();
    assert_eq!(claims.namespace, "ops-team");
}
