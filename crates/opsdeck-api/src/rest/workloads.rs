//! Workload inspection handlers

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use opsdeck_cluster::{ClusterClient, LogOptions};

use super::auth::Namespace;
use super::error::ApiResult;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/workloads")
            .route("", web::get().to(list_workloads))
            .route("/{name}/logs", web::get().to(workload_logs)),
    );
}

/// Log query parameters. Parsed leniently: an unparseable flag degrades
/// to its default instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    follow: Option<String>,
    #[serde(rename = "sinceSeconds")]
    since_seconds: Option<String>,
    #[serde(rename = "sinceTime")]
    since_time: Option<String>,
    timestamps: Option<String>,
    #[serde(rename = "tailLines")]
    tail_lines: Option<String>,
}

impl LogsQuery {
    fn to_options(&self) -> LogOptions {
        // Tail limit defaults to 100 lines only when the parameter is
        // absent; an explicit unparseable value leaves the tail unbounded.
        let tail_lines = match self.tail_lines.as_deref() {
            Some(value) => value.parse().ok(),
            None => Some(100),
        };

        LogOptions {
            follow: parse_flag(self.follow.as_deref()),
            since_seconds: self.since_seconds.as_deref().and_then(|s| s.parse().ok()),
            since_time: self
                .since_time
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc)),
            timestamps: parse_flag(self.timestamps.as_deref()),
            tail_lines,
        }
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    value.and_then(|s| s.parse().ok()).unwrap_or(false)
}

async fn list_workloads(
    namespace: Namespace,
    cluster: web::Data<Arc<dyn ClusterClient>>,
) -> ApiResult<HttpResponse> {
    let workloads = cluster.list_workloads(&namespace.0).await?;
    Ok(HttpResponse::Ok().json(workloads))
}

async fn workload_logs(
    namespace: Namespace,
    name: web::Path<String>,
    query: web::Query<LogsQuery>,
    cluster: web::Data<Arc<dyn ClusterClient>>,
) -> ApiResult<HttpResponse> {
    let options = query.to_options();

    if options.follow {
        let stream = cluster
            .follow_workload_logs(&namespace.0, &name, &options)
            .await?;
        Ok(HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .streaming(stream))
    } else {
        let logs = cluster.workload_logs(&namespace.0, &name, &options).await?;
        Ok(HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body(logs))
    }
}
