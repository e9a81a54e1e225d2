//! Database connection and schema bootstrap.

use std::path::{Path, PathBuf};

use switchy_database::Database;
use switchy_database_connection::init_sqlite_rusqlite;

use crate::DbError;

/// Default location of the `SQLite` database file.
pub const DEFAULT_DB_PATH: &str = "data/khoj.db";

/// Returns the database path from `DATABASE_PATH`, falling back to
/// [`DEFAULT_DB_PATH`].
#[must_use]
pub fn path_from_env() -> PathBuf {
    std::env::var("DATABASE_PATH").map_or_else(|_| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from)
}

/// Opens the database named by `DATABASE_PATH` and ensures the schema.
///
/// # Errors
///
/// Returns [`DbError`] if the file cannot be opened or the schema cannot
/// be created.
pub async fn connect_from_env() -> Result<Box<dyn Database>, DbError> {
    open(&path_from_env()).await
}

/// Opens (or creates) the `SQLite` database at `path` and ensures the
/// schema exists.
///
/// # Errors
///
/// Returns [`DbError`] if the file cannot be opened or the schema cannot
/// be created.
pub async fn open(path: &Path) -> Result<Box<dyn Database>, DbError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    log::debug!("Opening database at {}", path.display());
    let db = init_sqlite_rusqlite(Some(path)).map_err(|e| DbError::Connection(e.to_string()))?;

    ensure_schema(db.as_ref()).await?;

    Ok(db)
}

/// Creates all tables and indexes if they don't already exist.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS alerts (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            description TEXT,
            district    TEXT NOT NULL,
            upazila     TEXT NOT NULL,
            status      TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_alerts_area
         ON alerts (district, upazila, status)",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS reports (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            description TEXT,
            district    TEXT NOT NULL,
            upazila     TEXT NOT NULL,
            created_at  TEXT NOT NULL
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_reports_area
         ON reports (district, upazila)",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS area_statistics (
            district           TEXT NOT NULL,
            upazila            TEXT NOT NULL,
            total_alerts       INTEGER NOT NULL DEFAULT 0,
            active_alerts      INTEGER NOT NULL DEFAULT 0,
            resolved_alerts    INTEGER NOT NULL DEFAULT 0,
            total_reports      INTEGER NOT NULL DEFAULT 0,
            missing_persons    INTEGER NOT NULL DEFAULT 0,
            theft_incidents    INTEGER NOT NULL DEFAULT 0,
            violence_incidents INTEGER NOT NULL DEFAULT 0,
            other_incidents    INTEGER NOT NULL DEFAULT 0,
            danger_score       INTEGER NOT NULL DEFAULT 0,
            danger_level       TEXT NOT NULL DEFAULT 'safe',
            monthly_trends     TEXT NOT NULL DEFAULT '[]',
            last_updated       TEXT NOT NULL,
            PRIMARY KEY (district, upazila)
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_area_statistics_score
         ON area_statistics (danger_score DESC)",
    )
    .await?;

    Ok(())
}
