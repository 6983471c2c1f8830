//! Shared service plumbing: configuration, tracing, health checks, HTTP middleware,
//! serde helpers and retry policies.

pub mod config;
pub mod health;
pub mod middleware;
pub mod retry;
pub mod serde;
pub mod tracing;
