//! Parallel partition fetching
//!
//! One fetch+decode task per partition, all in flight together, merged
//! into a single collection once every task has finished. A missing
//! partition contributes nothing; a transport or decode failure is fatal
//! to the whole call and no partial results escape.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::debug;

use opsdeck_common::error::TelemetryError;
use opsdeck_common::metrics;

use crate::decode::decode_lines;
use crate::records::TelemetryRecord;
use crate::store::ObjectStore;

/// Per-partition result, discarded once merged into the aggregate.
struct FetchOutcome<T> {
    records: Vec<T>,
    found: bool,
}

/// Fetch and decode every partition concurrently, returning the merged
/// record collection.
///
/// Fan-out width equals the partition count unless `max_concurrent` is
/// non-zero, in which case a semaphore gates the in-flight reads; the
/// gate changes observed latency, never correctness. Results are
/// collected in arrival order, so output order across partitions is not
/// guaranteed. The call returns only after every task has completed:
/// a fatal error is remembered while the remaining tasks drain, then
/// surfaced. Dropping the returned future cancels all in-flight tasks.
pub async fn fetch_all<T: TelemetryRecord>(
    store: Arc<dyn ObjectStore>,
    container: &'static str,
    partitions: Vec<String>,
    max_concurrent: usize,
) -> Result<Vec<T>, TelemetryError> {
    let gate = (max_concurrent > 0).then(|| Arc::new(Semaphore::new(max_concurrent)));

    let mut tasks: FuturesUnordered<_> = partitions
        .into_iter()
        .map(|path| {
            let store = Arc::clone(&store);
            let gate = gate.clone();
            async move {
                let _permit = match &gate {
                    Some(semaphore) => Some(
                        semaphore
                            .acquire()
                            .await
                            .map_err(|e| TelemetryError::Aborted(e.to_string()))?,
                    ),
                    None => None,
                };
                fetch_partition::<T>(store.as_ref(), container, &path).await
            }
        })
        .collect();

    let mut records = Vec::new();
    let mut failure: Option<TelemetryError> = None;
    while let Some(outcome) = tasks.next().await {
        match outcome {
            Ok(partial) => {
                metrics::record_partition_fetch(container, partial.found);
                if failure.is_none() {
                    records.extend(partial.records);
                }
            }
            Err(err) => {
                metrics::record_fetch_failure(container, error_kind(&err));
                failure.get_or_insert(err);
            }
        }
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(records),
    }
}

async fn fetch_partition<T: TelemetryRecord>(
    store: &dyn ObjectStore,
    container: &str,
    path: &str,
) -> Result<FetchOutcome<T>, TelemetryError> {
    match store.fetch(container, path).await? {
        Some(data) => {
            let records = decode_lines(&data, path)?;
            Ok(FetchOutcome {
                records,
                found: true,
            })
        }
        None => {
            // Missing hours are expected: before retention start, sparse
            // metrics, paused exports.
            debug!(container, path, "partition not present, skipping");
            Ok(FetchOutcome {
                records: Vec::new(),
                found: false,
            })
        }
    }
}

fn error_kind(err: &TelemetryError) -> &'static str {
    match err {
        TelemetryError::Transport { .. } => "transport",
        TelemetryError::Decode { .. } => "decode",
        TelemetryError::InvalidRange(_) => "range",
        TelemetryError::Aborted(_) => "aborted",
    }
}
