//! HTTP API: inventory read/write endpoints and order placement.

pub mod app;
pub mod middleware;
