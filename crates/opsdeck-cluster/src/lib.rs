//! Opsdeck Cluster - workload cluster access
//!
//! Trait-based capability for the three cluster operations the dashboard
//! needs: listing workloads, reading or streaming their logs, and
//! rewriting a deployment's container image. The production client speaks
//! plain HTTPS+JSON to the cluster API server.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod workload;

pub use client::{ClusterClient, KubeApiClient, LogChunkStream};
pub use workload::{LogOptions, WorkloadStatus};
