#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! SQLite persistence for economic indicator data.
//!
//! One file database holds four tables: the `indicators` reference table,
//! long-format `indicator_values`, qualitative `indicator_releases`, and
//! operator `comments` (written by external tools, not by the ingestion
//! core). The schema is created on open; there is no separate bootstrap
//! step.

pub mod store;

pub use store::IndicatorStore;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// SQLite query or connection error.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error creating the database directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be converted to the canonical model.
    #[error("data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
