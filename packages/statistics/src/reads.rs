//! Read-side views over stored area documents.

use chrono::Utc;
use khoj_database::area_db::{self, AreaFilter};
use khoj_database::queries;
use khoj_incident_models::AreaKey;
use khoj_statistics_models::{
    AreaStatistics, DangerLevel, DistrictStatistics, OverallStatistics, TrendPoint,
};
use switchy_database::Database;

use crate::StatisticsError;
use crate::aggregate::{merge_trends, summarize_district};
use crate::engine::recompute_area_statistics;

/// Default number of areas returned by [`get_dangerous_areas`].
pub const DEFAULT_DANGEROUS_LIMIT: u32 = 10;

/// Default number of months merged by [`get_trends`].
pub const DEFAULT_TREND_MONTHS: usize = 6;

const DANGEROUS_LEVELS: &[DangerLevel] = &[DangerLevel::High, DangerLevel::Critical];

/// Returns an area's document, computing and storing it on first access.
///
/// # Errors
///
/// Returns [`StatisticsError`] if the store fails.
pub async fn get_area(
    db: &dyn Database,
    area: &AreaKey,
) -> Result<AreaStatistics, StatisticsError> {
    if let Some(stats) = area_db::get_area(db, area).await? {
        return Ok(stats);
    }
    recompute_area_statistics(db, area, Utc::now()).await
}

/// Returns every area of a district with summed figures.
///
/// # Errors
///
/// Returns [`StatisticsError`] if the store fails.
pub async fn get_district(
    db: &dyn Database,
    district: &str,
) -> Result<DistrictStatistics, StatisticsError> {
    let district = district.trim();
    let areas = area_db::list_areas(
        db,
        &AreaFilter {
            district: Some(district),
            ..AreaFilter::default()
        },
    )
    .await?;

    let aggregate = summarize_district(&areas);

    Ok(DistrictStatistics {
        district: district.to_string(),
        areas,
        aggregate,
    })
}

/// Returns `high` and `critical` areas, most dangerous first.
///
/// # Errors
///
/// Returns [`StatisticsError`] if the store fails.
pub async fn get_dangerous_areas(
    db: &dyn Database,
    limit: Option<u32>,
) -> Result<Vec<AreaStatistics>, StatisticsError> {
    Ok(area_db::list_areas(
        db,
        &AreaFilter {
            levels: DANGEROUS_LEVELS,
            limit: Some(limit.unwrap_or(DEFAULT_DANGEROUS_LIMIT)),
            ..AreaFilter::default()
        },
    )
    .await?)
}

/// Returns platform-wide counts and the number of areas per level.
///
/// Alert and report totals come from the live collections, so they
/// include activity in areas whose documents have not been refreshed yet.
///
/// # Errors
///
/// Returns [`StatisticsError`] if the store fails.
pub async fn get_overall(db: &dyn Database) -> Result<OverallStatistics, StatisticsError> {
    let counts = queries::count_activity(db, None).await?;
    let level_distribution = area_db::level_distribution(db).await?;

    Ok(OverallStatistics {
        total_areas: level_distribution.total(),
        total_alerts: counts.total_alerts,
        active_alerts: counts.active_alerts,
        resolved_alerts: counts.resolved_alerts,
        total_reports: counts.total_reports,
        level_distribution,
    })
}

/// Merges recent monthly trends across matching areas.
///
/// # Errors
///
/// Returns [`StatisticsError`] if the store fails.
pub async fn get_trends(
    db: &dyn Database,
    district: Option<&str>,
    upazila: Option<&str>,
    months: Option<usize>,
) -> Result<Vec<TrendPoint>, StatisticsError> {
    let areas = area_db::list_areas(
        db,
        &AreaFilter {
            district: district.map(str::trim).filter(|d| !d.is_empty()),
            upazila: upazila.map(str::trim).filter(|u| !u.is_empty()),
            ..AreaFilter::default()
        },
    )
    .await?;

    Ok(merge_trends(&areas, months.unwrap_or(DEFAULT_TREND_MONTHS)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_alerts, seed_reports, temp_db};

    #[tokio::test]
    async fn area_is_materialized_on_first_read() {
        let db = temp_db("reads_area").await;
        let area = AreaKey::new("Dhaka", "Mirpur").unwrap();
        seed_alerts(db.as_ref(), &area, 5, 2).await;
        seed_reports(db.as_ref(), &area, 3).await;

        assert!(
            area_db::get_area(db.as_ref(), &area)
                .await
                .unwrap()
                .is_none()
        );
        let stats = get_area(db.as_ref(), &area).await.unwrap();
        assert_eq!(stats.danger_score, 12);
        assert!(
            area_db::get_area(db.as_ref(), &area)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn unknown_area_reads_as_safe() {
        let db = temp_db("reads_unknown").await;
        let area = AreaKey::new("Rangpur", "Pirganj").unwrap();
        let stats = get_area(db.as_ref(), &area).await.unwrap();
        assert_eq!(stats.danger_score, 0);
        assert_eq!(stats.danger_level, DangerLevel::Safe);
    }

    #[tokio::test]
    async fn district_view_sums_its_areas() {
        let db = temp_db("reads_district").await;
        let savar = AreaKey::new("Dhaka", "Savar").unwrap();
        let mirpur = AreaKey::new("Dhaka", "Mirpur").unwrap();
        let other = AreaKey::new("Sylhet", "Sadar").unwrap();
        seed_alerts(db.as_ref(), &savar, 20, 20).await;
        seed_alerts(db.as_ref(), &mirpur, 2, 0).await;
        seed_alerts(db.as_ref(), &other, 4, 4).await;
        for area in [&savar, &mirpur, &other] {
            recompute_area_statistics(db.as_ref(), area, Utc::now())
                .await
                .unwrap();
        }

        let district = get_district(db.as_ref(), "Dhaka").await.unwrap();

        assert_eq!(district.district, "Dhaka");
        assert_eq!(district.areas.len(), 2);
        assert_eq!(district.areas[0].upazila, "Savar");
        assert_eq!(district.aggregate.total_alerts, 22);
        assert_eq!(district.aggregate.active_alerts, 20);
        // Savar 92, Mirpur 1
        assert_eq!(district.aggregate.average_danger_score, 47);
        assert_eq!(district.aggregate.most_dangerous_areas.len(), 1);
    }

    #[tokio::test]
    async fn dangerous_areas_are_filtered_sorted_and_limited() {
        let db = temp_db("reads_dangerous").await;
        let areas = [
            (AreaKey::new("Dhaka", "Savar").unwrap(), 20),
            (AreaKey::new("Dhaka", "Mirpur").unwrap(), 13),
            (AreaKey::new("Khulna", "Sadar").unwrap(), 1),
            (AreaKey::new("Sylhet", "Sadar").unwrap(), 30),
        ];
        for (area, active) in &areas {
            seed_alerts(db.as_ref(), area, *active, *active).await;
            recompute_area_statistics(db.as_ref(), area, Utc::now())
                .await
                .unwrap();
        }

        let all = get_dangerous_areas(db.as_ref(), None).await.unwrap();
        let names: Vec<_> = all.iter().map(|a| a.upazila.as_str()).collect();
        // Sylhet 100, Savar 92, Mirpur 60; Khulna 5 is safe
        assert_eq!(names, vec!["Sadar", "Savar", "Mirpur"]);
        assert!(all.iter().all(|a| a.danger_level.is_dangerous()));

        let top = get_dangerous_areas(db.as_ref(), Some(1)).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].district, "Sylhet");
    }

    #[tokio::test]
    async fn overall_counts_live_collections_and_levels() {
        let db = temp_db("reads_overall").await;
        let a = AreaKey::new("Dhaka", "Savar").unwrap();
        let b = AreaKey::new("Dhaka", "Mirpur").unwrap();
        seed_alerts(db.as_ref(), &a, 20, 20).await;
        seed_alerts(db.as_ref(), &b, 3, 1).await;
        seed_reports(db.as_ref(), &b, 4).await;
        recompute_area_statistics(db.as_ref(), &a, Utc::now())
            .await
            .unwrap();
        recompute_area_statistics(db.as_ref(), &b, Utc::now())
            .await
            .unwrap();

        let overall = get_overall(db.as_ref()).await.unwrap();

        assert_eq!(overall.total_areas, 2);
        assert_eq!(overall.total_alerts, 23);
        assert_eq!(overall.active_alerts, 21);
        assert_eq!(overall.resolved_alerts, 2);
        assert_eq!(overall.total_reports, 4);
        assert_eq!(overall.level_distribution.critical, 1);
        assert_eq!(overall.level_distribution.safe, 1);
    }

    #[tokio::test]
    async fn trends_filter_by_district() {
        let db = temp_db("reads_trends").await;
        let a = AreaKey::new("Dhaka", "Savar").unwrap();
        let b = AreaKey::new("Sylhet", "Sadar").unwrap();
        seed_alerts(db.as_ref(), &a, 2, 2).await;
        seed_alerts(db.as_ref(), &b, 5, 5).await;
        recompute_area_statistics(db.as_ref(), &a, Utc::now())
            .await
            .unwrap();
        recompute_area_statistics(db.as_ref(), &b, Utc::now())
            .await
            .unwrap();

        let dhaka = get_trends(db.as_ref(), Some("Dhaka"), None, None)
            .await
            .unwrap();
        assert_eq!(dhaka.len(), 1);
        assert_eq!(dhaka[0].alert_count, 2);
        assert_eq!(dhaka[0].area_count, 1);

        let everywhere = get_trends(db.as_ref(), None, None, Some(3)).await.unwrap();
        assert_eq!(everywhere.len(), 1);
        assert_eq!(everywhere[0].alert_count, 7);
        assert_eq!(everywhere[0].area_count, 2);
    }
}
