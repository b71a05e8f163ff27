//! Telemetry repository
//!
//! The public contract consumed by the serving layer: two range queries
//! driven through the generic fetch pipeline, plus a single-row SQL text
//! lookup that is deliberately not part of the concurrent pipeline.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use tracing::debug;

use opsdeck_common::config::TelemetryConfig;
use opsdeck_common::error::{DatabaseError, Result};
use opsdeck_common::metrics;

use crate::fetch::fetch_all;
use crate::partition::TimeRange;
use crate::records::{MetricRecord, QueryRuntimeRecord, TelemetryRecord};
use crate::store::ObjectStore;

/// Telemetry access contract for the serving layer.
#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    /// Query-runtime records overlapping the range, in no particular order.
    async fn query_runtime(&self, range: TimeRange) -> Result<Vec<QueryRuntimeRecord>>;

    /// Metric records overlapping the range, in no particular order.
    async fn metrics(&self, range: TimeRange) -> Result<Vec<MetricRecord>>;

    /// The SQL text behind one query id.
    async fn query_sql_text(&self, query_id: &str) -> Result<String>;
}

/// Repository over an injected object store capability plus an optional
/// relational pool for the SQL text lookup. Holds no cross-call state.
pub struct StoreTelemetryRepository {
    store: Arc<dyn ObjectStore>,
    pool: Option<PgPool>,
    resource_scope: String,
    max_concurrent_fetches: usize,
}

impl StoreTelemetryRepository {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, config: &TelemetryConfig) -> Self {
        Self {
            store,
            pool: None,
            resource_scope: config.resource_scope.clone(),
            max_concurrent_fetches: config.max_concurrent_fetches,
        }
    }

    /// Attach the relational pool backing `query_sql_text`.
    #[must_use]
    pub fn with_database(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    async fn range_query<T: TelemetryRecord>(&self, range: TimeRange) -> Result<Vec<T>> {
        let partitions = range.hourly_partitions(&self.resource_scope);
        debug!(
            container = T::CONTAINER,
            partitions = partitions.len(),
            start = %range.start,
            end = %range.end,
            "dispatching partition fetches"
        );

        let started = Instant::now();
        let partition_count = partitions.len();
        let records = fetch_all::<T>(
            Arc::clone(&self.store),
            T::CONTAINER,
            partitions,
            self.max_concurrent_fetches,
        )
        .await?;

        metrics::record_range_query(
            T::CONTAINER,
            partition_count,
            started.elapsed().as_secs_f64() * 1000.0,
        );
        Ok(records)
    }
}

#[async_trait]
impl TelemetryRepository for StoreTelemetryRepository {
    async fn query_runtime(&self, range: TimeRange) -> Result<Vec<QueryRuntimeRecord>> {
        self.range_query(range).await
    }

    async fn metrics(&self, range: TimeRange) -> Result<Vec<MetricRecord>> {
        self.range_query(range).await
    }

    async fn query_sql_text(&self, query_id: &str) -> Result<String> {
        let pool = self.pool.as_ref().ok_or_else(|| {
            DatabaseError::Connection("no database pool configured".to_string())
        })?;

        let sql_text: Option<String> = sqlx::query_scalar(
            "SELECT query_sql_text FROM query_store.query_texts_view WHERE query_text_id = $1",
        )
        .bind(query_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;

        sql_text
            .ok_or_else(|| DatabaseError::SqlTextNotFound(query_id.to_string()).into())
    }
}
