//! Error types for Opsdeck
//!
//! Provides a unified error type hierarchy for the entire system.

use thiserror::Error;

/// Result type alias using Opsdeck's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Opsdeck
#[derive(Error, Debug)]
pub enum Error {
    // Telemetry Pipeline Errors
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    // Workload Cluster Errors
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    // Authentication Errors
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    // Relational Store Errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    // Configuration Errors
    #[error("Configuration error: {0}")]
    Config(String),

    // IO Errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the telemetry ingestion pipeline
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Caller-supplied range is malformed. Rejected before any fetch is
    /// dispatched and mapped to a client error by the serving layer.
    #[error("invalid time range: {0}")]
    InvalidRange(String),

    /// The object store read failed for a reason other than not-found
    /// (auth, network, throttling). Fatal to the enclosing range query.
    #[error("object store read failed for {path}: {reason}")]
    Transport { path: String, reason: String },

    /// A record line could not be parsed even after timestamp repair.
    /// Carries the source partition and the offending line so upstream
    /// export corruption can be diagnosed.
    #[error("undecodable record in partition {partition}: {reason} (line: {line})")]
    Decode {
        partition: String,
        line: String,
        reason: String,
    },

    /// A fetch task stopped before producing a result.
    #[error("partition fetch aborted: {0}")]
    Aborted(String),
}

/// Workload cluster errors
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("cluster api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("cluster request failed: {0}")]
    Transport(String),

    #[error("malformed cluster response: {0}")]
    Malformed(String),

    #[error("unroutable repository path: {0}")]
    BadWebhook(String),

    #[error("image update failed but previous image was restored: {0}")]
    UpdateReverted(String),

    #[error("image update failed and revert also failed: update={update}, revert={revert}")]
    RevertFailed { update: String, revert: String },
}

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("authorization header required")]
    MissingHeader,

    #[error("bearer token required")]
    NotBearer,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("invalid token claims")]
    InvalidClaims,

    #[error("auth secret not configured")]
    SecretMissing,
}

/// Relational store errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("no sql text found for query {0}")]
    SqlTextNotFound(String),
}
