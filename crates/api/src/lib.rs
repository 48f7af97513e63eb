//! HTTP surface for the image batch scheduler.
//!
//! Exposes batch submission, status lookup, and a health check over the
//! scheduler in `imgbatch-worker`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;
