#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Area danger statistics engine.
//!
//! Recomputes an area's cached [`AreaStatistics`] document from live alert
//! and report counts, and serves the read-side views (area, district,
//! dangerous areas, overall, trends) over the stored documents.
//!
//! Recomputes are triggered as a side effect of alert and report writes.
//! [`engine::refresh_area`] takes a [`engine::RecomputePolicy`] so that the
//! same code path serves callers that wait for the result and callers that
//! detach it onto the runtime.
//!
//! [`AreaStatistics`]: khoj_statistics_models::AreaStatistics

pub mod aggregate;
pub mod bulk;
pub mod engine;
pub mod progress;
pub mod reads;

#[cfg(test)]
pub(crate) mod testing;

use khoj_database::DbError;
use khoj_incident_models::InvalidAreaError;

/// Errors from statistics operations.
#[derive(Debug, thiserror::Error)]
pub enum StatisticsError {
    /// The store failed.
    #[error(transparent)]
    Database(#[from] DbError),

    /// The request named an incomplete area.
    #[error(transparent)]
    InvalidArea(#[from] InvalidAreaError),
}

impl StatisticsError {
    /// Whether the error was caused by caller input rather than the store.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidArea(_))
    }
}
