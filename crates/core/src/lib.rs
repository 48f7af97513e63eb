//! Domain types shared across the imgbatch workspace.
//!
//! This crate has zero internal deps so the ledger, the scheduler, and the
//! HTTP layer can all depend on it.

pub mod batch;
pub mod error;
pub mod job;
pub mod types;
pub mod validation;
