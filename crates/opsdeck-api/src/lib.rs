//! Opsdeck API Layer
//!
//! REST serving layer (Actix-Web) for the operational dashboard:
//! telemetry range queries, workload inspection, log streaming, and the
//! registry-push redeploy webhook.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod rest;

pub use rest::RestServer;
