//! Database access layer.
//!
//! This module provides:
//! - Connection pools per engine: sqlx pools, a `bb8` pool of `tiberius`
//!   clients for SQL Server and, with the `oracle` feature, an Oracle session pool
//! - The registry of live connections and their dialect adapters
//! - Statement execution with an optional statement timeout
//! - Single-call transactions
//! - Row decoding into JSON with canonical temporal values

pub mod executor;
pub mod mssql;
#[cfg(feature = "oracle")]
pub mod oracle;
pub mod params;
pub mod pool;
pub mod registry;
pub mod transaction;
pub mod types;

pub use executor::QueryExecutor;
pub use pool::{DbPool, mask_connection_string};
pub use registry::ConnectionRegistry;
pub use transaction::DbTransaction;
