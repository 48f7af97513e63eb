//! Persistence for batch progress.
//!
//! - [`Ledger`] -- the batch id -> record map with atomic per-batch updates.
//! - [`LedgerStore`] -- one JSON file per batch, replaced via rename.

pub mod error;
pub mod ledger;
pub mod store;

pub use error::LedgerError;
pub use ledger::Ledger;
pub use store::LedgerStore;
