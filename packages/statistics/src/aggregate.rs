//! Pure grouping helpers over stored area documents.

use std::collections::BTreeMap;

use khoj_statistics_models::{
    AreaStatistics, DangerLevel, DistrictAggregate, TrendPoint, month_number,
};

/// Number of areas listed in [`DistrictAggregate::most_dangerous_areas`].
pub const MOST_DANGEROUS_AREAS: usize = 5;

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn rounded_mean(sum: u64, count: u64) -> u8 {
    if count == 0 {
        return 0;
    }
    (sum as f64 / count as f64).round().min(100.0) as u8
}

/// Sums a district's area documents.
///
/// `areas` must already be ordered most dangerous first; the
/// most-dangerous list keeps that order.
#[must_use]
pub fn summarize_district(areas: &[AreaStatistics]) -> DistrictAggregate {
    let score_sum: u64 = areas.iter().map(|a| u64::from(a.danger_score)).sum();
    let total_areas = areas.len() as u64;

    DistrictAggregate {
        total_areas,
        total_alerts: areas.iter().map(|a| a.statistics.total_alerts).sum(),
        active_alerts: areas.iter().map(|a| a.statistics.active_alerts).sum(),
        total_reports: areas.iter().map(|a| a.statistics.total_reports).sum(),
        average_danger_score: rounded_mean(score_sum, total_areas),
        most_dangerous_areas: areas
            .iter()
            .filter(|a| a.danger_level != DangerLevel::Safe)
            .take(MOST_DANGEROUS_AREAS)
            .cloned()
            .collect(),
    }
}

#[derive(Default)]
struct TrendBucket {
    month: String,
    alert_count: u64,
    report_count: u64,
    score_sum: u64,
    area_count: u64,
}

/// Merges the newest `months` trend entries of every area into one series.
///
/// Entries sharing a `(month, year)` are combined: counts are summed and
/// scores averaged. The result is ordered by year, then calendar month.
#[must_use]
pub fn merge_trends(areas: &[AreaStatistics], months: usize) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<(i32, u32, String), TrendBucket> = BTreeMap::new();

    for area in areas {
        let skip = area.monthly_trends.len().saturating_sub(months);
        for entry in &area.monthly_trends[skip..] {
            let key = (
                entry.year,
                month_number(&entry.month).unwrap_or(0),
                entry.month.clone(),
            );
            let bucket = buckets.entry(key).or_insert_with(|| TrendBucket {
                month: entry.month.clone(),
                ..TrendBucket::default()
            });
            bucket.alert_count += entry.alert_count;
            bucket.report_count += entry.report_count;
            bucket.score_sum += u64::from(entry.danger_score);
            bucket.area_count += 1;
        }
    }

    buckets
        .into_iter()
        .map(|((year, _, _), bucket)| TrendPoint {
            month: bucket.month,
            year,
            alert_count: bucket.alert_count,
            report_count: bucket.report_count,
            danger_score: rounded_mean(bucket.score_sum, bucket.area_count),
            area_count: bucket.area_count,
        })
        .collect()
}
