//! Telemetry range-query and SQL text handlers

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use opsdeck_common::config::TelemetryConfig;
use opsdeck_common::error::{Error, TelemetryError};
use opsdeck_telemetry::{TelemetryRepository, TimeRange};

use super::error::{ApiError, ApiResult};

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/database")
            .route("/metrics", web::get().to(get_metrics))
            .route("/queries", web::get().to(get_query_runtime))
            .route("/queries/{id}", web::get().to(get_query_sql_text)),
    );
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    start: String,
    end: String,
}

/// Map the query parameters into a TimeRange, clamping `start` to the
/// retention floor first. Unparseable timestamps and inverted ranges are
/// rejected here, before any fetch is dispatched.
fn parse_range(query: &RangeQuery, floor: DateTime<Utc>) -> Result<TimeRange, Error> {
    let start = parse_timestamp(&query.start, "start")?;
    let end = parse_timestamp(&query.end, "end")?;
    let start = start.max(floor);
    TimeRange::new(start, end).map_err(Error::from)
}

fn parse_timestamp(value: &str, which: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| TelemetryError::InvalidRange(format!("invalid {which} time: {e}")).into())
}

async fn get_metrics(
    query: web::Query<RangeQuery>,
    repository: web::Data<Arc<dyn TelemetryRepository>>,
    config: web::Data<TelemetryConfig>,
) -> ApiResult<HttpResponse> {
    let range = parse_range(&query, config.retention_floor).map_err(ApiError::from)?;
    let records = repository.metrics(range).await?;
    Ok(HttpResponse::Ok().json(records))
}

async fn get_query_runtime(
    query: web::Query<RangeQuery>,
    repository: web::Data<Arc<dyn TelemetryRepository>>,
    config: web::Data<TelemetryConfig>,
) -> ApiResult<HttpResponse> {
    let range = parse_range(&query, config.retention_floor).map_err(ApiError::from)?;
    let records = repository.query_runtime(range).await?;
    Ok(HttpResponse::Ok().json(records))
}

async fn get_query_sql_text(
    id: web::Path<String>,
    repository: web::Data<Arc<dyn TelemetryRepository>>,
) -> ApiResult<HttpResponse> {
    let sql_text = repository.query_sql_text(&id).await?;
    Ok(HttpResponse::Ok().json(sql_text))
}
