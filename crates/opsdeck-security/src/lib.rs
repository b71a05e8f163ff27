//! Opsdeck Security Layer
//!
//! Provides namespace-scoped bearer-token authentication. Every dashboard
//! caller presents an HS256 token carrying the cluster namespace it is
//! allowed to operate on.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod jwt;

pub use jwt::{Claims, JwtAuth};
