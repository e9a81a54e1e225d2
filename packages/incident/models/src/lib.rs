#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Alert and report document types.
//!
//! Citizens and police officers file missing-person/incident alerts and
//! free-form reports against an administrative area. Both collections are
//! keyed by an [`AreaKey`], the `(district, upazila)` pair that danger
//! statistics are aggregated over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Lifecycle status of an alert.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertStatus {
    /// The alert is open and counts towards an area's danger score.
    Active,
    /// The person was found or the incident closed.
    Resolved,
    /// Withdrawn by the poster.
    Cancelled,
}

impl AlertStatus {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Active, Self::Resolved, Self::Cancelled]
    }
}

/// Error returned when an area key is missing one of its parts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("district and upazila are required")]
pub struct InvalidAreaError;

/// A `(district, upazila)` administrative pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AreaKey {
    /// District name.
    pub district: String,
    /// Sub-district name.
    pub upazila: String,
}

impl AreaKey {
    /// Builds a key from raw input, trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidAreaError`] if either part is empty after trimming.
    pub fn new(district: &str, upazila: &str) -> Result<Self, InvalidAreaError> {
        let district = district.trim();
        let upazila = upazila.trim();
        if district.is_empty() || upazila.is_empty() {
            return Err(InvalidAreaError);
        }
        Ok(Self {
            district: district.to_string(),
            upazila: upazila.to_string(),
        })
    }

    /// Builds a key from optional query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidAreaError`] if either part is absent or blank.
    pub fn from_parts(
        district: Option<&str>,
        upazila: Option<&str>,
    ) -> Result<Self, InvalidAreaError> {
        match (district, upazila) {
            (Some(d), Some(u)) => Self::new(d, u),
            _ => Err(InvalidAreaError),
        }
    }
}

impl std::fmt::Display for AreaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.district, self.upazila)
    }
}

/// A missing-person or incident alert as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Alert UUID.
    pub id: String,
    /// Short headline.
    pub title: String,
    /// Free-form details.
    pub description: Option<String>,
    /// District the alert was filed in.
    pub district: String,
    /// Upazila the alert was filed in.
    pub upazila: String,
    /// Current status.
    pub status: AlertStatus,
    /// When the alert was created.
    pub created_at: DateTime<Utc>,
    /// When the alert was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Alert {
    /// Returns the area this alert belongs to.
    #[must_use]
    pub fn area(&self) -> AreaKey {
        AreaKey {
            district: self.district.clone(),
            upazila: self.upazila.clone(),
        }
    }
}

/// Payload for filing a new alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlert {
    /// Short headline.
    pub title: String,
    /// Free-form details.
    pub description: Option<String>,
    /// District the alert is filed in.
    pub district: String,
    /// Upazila the alert is filed in.
    pub upazila: String,
}

/// A citizen or police report as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Report UUID.
    pub id: String,
    /// Short headline.
    pub title: String,
    /// Free-form details.
    pub description: Option<String>,
    /// District the report was filed in.
    pub district: String,
    /// Upazila the report was filed in.
    pub upazila: String,
    /// When the report was filed.
    pub created_at: DateTime<Utc>,
}

impl Report {
    /// Returns the area this report belongs to.
    #[must_use]
    pub fn area(&self) -> AreaKey {
        AreaKey {
            district: self.district.clone(),
            upazila: self.upazila.clone(),
        }
    }
}

/// Payload for filing a new report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    /// Short headline.
    pub title: String,
    /// Free-form details.
    pub description: Option<String>,
    /// District the report is filed in.
    pub district: String,
    /// Upazila the report is filed in.
    pub upazila: String,
}
