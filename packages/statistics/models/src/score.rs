//! Danger score formula and level thresholds.
//!
//! The score is a weighted sum of live alert and report counts, rounded and
//! clamped to `0..=100`. The formula is part of the external contract:
//! stored scores from earlier deployments must compare equal, so the
//! weights are applied in a fixed order on `f64`.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Highest score an area can reach.
pub const MAX_DANGER_SCORE: u8 = 100;

const ACTIVE_ALERT_WEIGHT: f64 = 10.0;
const ACTIVE_ALERT_SHARE: f64 = 0.4;
const TOTAL_ALERT_WEIGHT: f64 = 2.0;
const TOTAL_ALERT_SHARE: f64 = 0.3;
const REPORT_WEIGHT: f64 = 1.5;
const REPORT_SHARE: f64 = 0.3;

/// Five ordinal risk buckets derived from a danger score.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DangerLevel {
    /// Score 0-9
    Safe,
    /// Score 10-29
    Low,
    /// Score 30-49
    Moderate,
    /// Score 50-74
    High,
    /// Score 75-100
    Critical,
}

impl DangerLevel {
    /// Classifies a danger score.
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        if score >= 75 {
            Self::Critical
        } else if score >= 50 {
            Self::High
        } else if score >= 30 {
            Self::Moderate
        } else if score >= 10 {
            Self::Low
        } else {
            Self::Safe
        }
    }

    /// Whether areas at this level are listed as dangerous.
    #[must_use]
    pub const fn is_dangerous(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    /// Returns all variants of this enum, safest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Safe,
            Self::Low,
            Self::Moderate,
            Self::High,
            Self::Critical,
        ]
    }
}

/// Computes the danger score for an area from its live counts.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn danger_score(total_alerts: u64, active_alerts: u64, total_reports: u64) -> u8 {
    let raw = (active_alerts as f64) * ACTIVE_ALERT_WEIGHT * ACTIVE_ALERT_SHARE
        + (total_alerts as f64) * TOTAL_ALERT_WEIGHT * TOTAL_ALERT_SHARE
        + (total_reports as f64) * REPORT_WEIGHT * REPORT_SHARE;

    raw.round().min(f64::from(MAX_DANGER_SCORE)) as u8
}

/// Computes the score and its level together.
#[must_use]
pub fn assess(total_alerts: u64, active_alerts: u64, total_reports: u64) -> (u8, DangerLevel) {
    let score = danger_score(total_alerts, active_alerts, total_reports);
    (score, DangerLevel::from_score(score))
}
