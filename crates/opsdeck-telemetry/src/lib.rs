//! Opsdeck Telemetry - time-windowed telemetry ingestion pipeline
//!
//! Given a time range, this crate derives the hourly storage partitions
//! that may contain diagnostic data, fetches each partition concurrently
//! from an object store, tolerates partitions that do not exist, decodes
//! newline-delimited records (repairing malformed timestamp encodings),
//! and merges all partial results into one order-insensitive result set.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod decode;
pub mod fetch;
pub mod partition;
pub mod records;
pub mod repository;
pub mod store;

pub use partition::TimeRange;
pub use records::{MetricRecord, QueryRuntimeRecord, TelemetryRecord};
pub use repository::{StoreTelemetryRepository, TelemetryRepository};
pub use store::{BlobStore, MemoryStore, ObjectStore};
