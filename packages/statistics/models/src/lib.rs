#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Area danger statistics types.
//!
//! One [`AreaStatistics`] document exists per `(district, upazila)` area. It
//! caches live alert/report counts, the derived danger score and level, and
//! a short monthly history. Everything here is pure; loading, counting and
//! persisting live in `khoj_statistics` and `khoj_database`.

pub mod score;
pub mod trend;

use chrono::{DateTime, Utc};
use khoj_incident_models::AreaKey;
use serde::{Deserialize, Serialize};

pub use score::{DangerLevel, MAX_DANGER_SCORE, assess, danger_score};
pub use trend::{
    MONTHLY_TREND_CAPACITY, MonthlyTrend, month_label, month_number, record_monthly_trend,
};

/// Live counts for an area, as tallied from the alert and report stores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaCounts {
    /// Alerts in any status.
    pub total_alerts: u64,
    /// Alerts with status `active`.
    pub active_alerts: u64,
    /// Alerts with status `resolved`.
    pub resolved_alerts: u64,
    /// Reports filed.
    pub total_reports: u64,
}

/// Counter block stored on every area document.
///
/// The incident-category counters are heuristic splits of the totals and
/// are only written by [`AreaStatistics::seed_incident_breakdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaCounters {
    pub total_alerts: u64,
    pub active_alerts: u64,
    pub resolved_alerts: u64,
    pub total_reports: u64,
    pub missing_persons: u64,
    pub theft_incidents: u64,
    pub violence_incidents: u64,
    pub other_incidents: u64,
}

/// Danger statistics document for one area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaStatistics {
    /// District name.
    pub district: String,
    /// Upazila name.
    pub upazila: String,
    /// Cached counters.
    pub statistics: AreaCounters,
    /// Derived score, `0..=100`.
    pub danger_score: u8,
    /// Derived level, always `DangerLevel::from_score(danger_score)`.
    pub danger_level: DangerLevel,
    /// Up to [`MONTHLY_TREND_CAPACITY`] entries in append order.
    pub monthly_trends: Vec<MonthlyTrend>,
    /// When the score was last recomputed.
    pub last_updated: DateTime<Utc>,
}

impl AreaStatistics {
    /// A zero-valued document for an area that has never been scored.
    #[must_use]
    pub fn empty(area: &AreaKey, now: DateTime<Utc>) -> Self {
        Self {
            district: area.district.clone(),
            upazila: area.upazila.clone(),
            statistics: AreaCounters::default(),
            danger_score: 0,
            danger_level: DangerLevel::Safe,
            monthly_trends: Vec::new(),
            last_updated: now,
        }
    }

    /// Returns the area key of this document.
    #[must_use]
    pub fn area(&self) -> AreaKey {
        AreaKey {
            district: self.district.clone(),
            upazila: self.upazila.clone(),
        }
    }

    /// Folds fresh live counts into the document.
    ///
    /// Overwrites the four live counters, rescores, stamps `last_updated`
    /// and records the score against the month containing `now`. The
    /// incident-category counters are left untouched.
    pub fn apply_counts(&mut self, counts: AreaCounts, now: DateTime<Utc>) {
        self.statistics.total_alerts = counts.total_alerts;
        self.statistics.active_alerts = counts.active_alerts;
        self.statistics.resolved_alerts = counts.resolved_alerts;
        self.statistics.total_reports = counts.total_reports;

        let (score, level) = assess(
            counts.total_alerts,
            counts.active_alerts,
            counts.total_reports,
        );
        self.danger_score = score;
        self.danger_level = level;
        self.last_updated = now;

        let (month, year) = month_label(now);
        record_monthly_trend(
            &mut self.monthly_trends,
            MonthlyTrend {
                month,
                year,
                alert_count: counts.total_alerts,
                report_count: counts.total_reports,
                danger_score: score,
            },
        );
    }

    /// Splits the current totals into the illustrative incident categories.
    ///
    /// Missing persons are 40% of alerts; theft and violence are 30% and
    /// 20% of reports, with the remainder of reports counted as other.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn seed_incident_breakdown(&mut self) {
        let fraction = |total: u64, share: f64| (total as f64 * share).round() as u64;

        let stats = &mut self.statistics;
        stats.missing_persons = fraction(stats.total_alerts, 0.4);
        stats.theft_incidents = fraction(stats.total_reports, 0.3);
        stats.violence_incidents = fraction(stats.total_reports, 0.2);
        stats.other_incidents = stats
            .total_reports
            .saturating_sub(stats.theft_incidents)
            .saturating_sub(stats.violence_incidents);
    }
}

/// Totals for one district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictAggregate {
    /// Number of area documents in the district.
    pub total_areas: u64,
    /// Sum of `statistics.totalAlerts`.
    pub total_alerts: u64,
    /// Sum of `statistics.activeAlerts`.
    pub active_alerts: u64,
    /// Sum of `statistics.totalReports`.
    pub total_reports: u64,
    /// Rounded mean of the per-area scores, 0 when there are no areas.
    pub average_danger_score: u8,
    /// Up to five non-safe areas, most dangerous first.
    pub most_dangerous_areas: Vec<AreaStatistics>,
}

/// District view returned by the read API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictStatistics {
    /// District name.
    pub district: String,
    /// Every area document in the district, most dangerous first.
    pub areas: Vec<AreaStatistics>,
    /// Summed and averaged figures.
    pub aggregate: DistrictAggregate,
}

/// Number of area documents at each danger level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDistribution {
    pub safe: u64,
    pub low: u64,
    pub moderate: u64,
    pub high: u64,
    pub critical: u64,
}

impl LevelDistribution {
    /// Counts one document at `level`.
    pub const fn add(&mut self, level: DangerLevel) {
        self.add_many(level, 1);
    }

    /// Counts `count` documents at `level`.
    pub const fn add_many(&mut self, level: DangerLevel, count: u64) {
        match level {
            DangerLevel::Safe => self.safe += count,
            DangerLevel::Low => self.low += count,
            DangerLevel::Moderate => self.moderate += count,
            DangerLevel::High => self.high += count,
            DangerLevel::Critical => self.critical += count,
        }
    }

    /// Returns the count for `level`.
    #[must_use]
    pub const fn get(&self, level: DangerLevel) -> u64 {
        match level {
            DangerLevel::Safe => self.safe,
            DangerLevel::Low => self.low,
            DangerLevel::Moderate => self.moderate,
            DangerLevel::High => self.high,
            DangerLevel::Critical => self.critical,
        }
    }

    /// Sum over all levels.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.safe + self.low + self.moderate + self.high + self.critical
    }
}

impl FromIterator<DangerLevel> for LevelDistribution {
    fn from_iter<I: IntoIterator<Item = DangerLevel>>(iter: I) -> Self {
        let mut tally = Self::default();
        for level in iter {
            tally.add(level);
        }
        tally
    }
}

/// Platform-wide summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStatistics {
    /// Number of area documents.
    pub total_areas: u64,
    /// Alerts in any status across all areas.
    pub total_alerts: u64,
    /// Active alerts across all areas.
    pub active_alerts: u64,
    /// Resolved alerts across all areas.
    pub resolved_alerts: u64,
    /// Reports across all areas.
    pub total_reports: u64,
    /// Area documents per danger level.
    pub level_distribution: LevelDistribution,
}

/// One merged `(month, year)` point across several areas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// Long English month name.
    pub month: String,
    /// Four-digit year.
    pub year: i32,
    /// Summed alert counts.
    pub alert_count: u64,
    /// Summed report counts.
    pub report_count: u64,
    /// Rounded mean danger score.
    pub danger_score: u8,
    /// Number of areas contributing to this point.
    pub area_count: u64,
}
