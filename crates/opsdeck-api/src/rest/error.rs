//! HTTP error mapping
//!
//! Range-input errors map to client-error responses; fetch/decode and
//! cluster failures map to server errors. Missing partitions never reach
//! this layer.

use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use tracing::error;

use opsdeck_common::error::{ClusterError, DatabaseError, Error, TelemetryError};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Wrapper carrying an Opsdeck error across the actix boundary.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            Error::Telemetry(TelemetryError::InvalidRange(_))
            | Error::Cluster(ClusterError::BadWebhook(_)) => StatusCode::BAD_REQUEST,
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::Database(DatabaseError::SqlTextNotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        HttpResponse::build(status).json(serde_json::json!({ "error": self.0.to_string() }))
    }
}
