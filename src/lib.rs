//! Tamper-evident ledger of glucose readings.
//!
//! Readings are stored as blocks in a hash-linked chain sealed by a small
//! proof-of-work, persisted as a single JSON file.

pub mod blockchain;
pub mod config;
pub mod error;
pub mod exam;
pub mod ledger;
pub mod report;
pub mod storage;

pub use error::{LedgerError, Result};
pub use ledger::Ledger;
