//! Rolling monthly trend history kept on each area.
//!
//! Entries stay in append order. A repeated `(month, year)` overwrites the
//! matching entry where it sits; the oldest entries fall off the front once
//! the history grows past [`MONTHLY_TREND_CAPACITY`].

use chrono::{DateTime, Datelike as _, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of monthly entries kept per area.
pub const MONTHLY_TREND_CAPACITY: usize = 12;

/// One monthly snapshot of an area's counts and score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    /// Long English month name, e.g. `"March"`.
    pub month: String,
    /// Four-digit year.
    pub year: i32,
    /// Total alerts at the time of the snapshot.
    pub alert_count: u64,
    /// Total reports at the time of the snapshot.
    pub report_count: u64,
    /// Danger score at the time of the snapshot.
    pub danger_score: u8,
}

impl MonthlyTrend {
    /// Whether this entry belongs to the given month label.
    #[must_use]
    pub fn is_period(&self, month: &str, year: i32) -> bool {
        self.year == year && self.month == month
    }
}

/// Returns the `(long month name, year)` label for a timestamp.
#[must_use]
pub fn month_label(at: DateTime<Utc>) -> (String, i32) {
    (at.format("%B").to_string(), at.year())
}

/// Returns the calendar index (1-12) of a long or short English month name,
/// or `None` if the label is not a month.
#[must_use]
pub fn month_number(month: &str) -> Option<u32> {
    month
        .parse::<chrono::Month>()
        .ok()
        .map(|m| m.number_from_month())
}

/// Writes `entry` into the trend history.
pub fn record_monthly_trend(trends: &mut Vec<MonthlyTrend>, entry: MonthlyTrend) {
    if let Some(existing) = trends
        .iter_mut()
        .find(|t| t.is_period(&entry.month, entry.year))
    {
        existing.alert_count = entry.alert_count;
        existing.report_count = entry.report_count;
        existing.danger_score = entry.danger_score;
    } else {
        trends.push(entry);
    }

    if trends.len() > MONTHLY_TREND_CAPACITY {
        let excess = trends.len() - MONTHLY_TREND_CAPACITY;
        trends.drain(..excess);
    }
}
