//! caroney keeps a personal income and expense ledger in a Google sheet.
//!
//! The sheet is the system of record. `cache::LedgerCache` mirrors it for the length of a session,
//! `query` filters and totals a snapshot, and `export` renders a snapshot as an `.xlsx` workbook.

mod api;
pub mod args;
pub mod cache;
pub mod commands;
mod config;
mod error;
pub mod export;
pub mod model;
pub mod query;
mod utils;


pub use api::{ledger_store, LedgerStore, Mode, CARONEY_IN_TEST_MODE};
pub use config::Config;
pub use error::{Error, ErrorType, Result};
