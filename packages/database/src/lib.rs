#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Document store for Khoj alerts, reports, and area danger statistics.
//!
//! Backed by `SQLite` through `switchy_database`. Every query is raw SQL via
//! `query_raw_params()` / `exec_raw_params()`; area statistics documents
//! keep their monthly trend history as a JSON column so a whole document is
//! read and replaced in one row.

pub mod area_db;
pub mod db;
pub mod queries;

#[cfg(test)]
pub(crate) mod testing;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// The database could not be opened.
    #[error("Connection error: {0}")]
    Connection(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON column could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Builds a `map_err` adapter that reports which column failed to parse.
pub(crate) fn conversion<E: std::fmt::Display>(column: &'static str) -> impl FnOnce(E) -> DbError {
    move |e| DbError::Conversion {
        message: format!("Failed to parse {column}: {e}"),
    }
}

/// Converts a stored `INTEGER` counter into an unsigned count.
pub(crate) fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Converts an unsigned count into an `INTEGER` bind value.
pub(crate) fn from_count(value: u64) -> switchy_database::DatabaseValue {
    switchy_database::DatabaseValue::Int64(i64::try_from(value).unwrap_or(i64::MAX))
}

/// Parses an RFC 3339 timestamp column.
pub(crate) fn parse_timestamp(
    column: &'static str,
    value: &str,
) -> Result<chrono::DateTime<chrono::Utc>, DbError> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(conversion(column))
}
