//! Whole-platform maintenance jobs.

use std::sync::Arc;

use chrono::Utc;
use khoj_database::{area_db, queries};
use switchy_database::Database;

use crate::StatisticsError;
use crate::engine::recompute_area_statistics;
use crate::progress::ProgressCallback;

/// Recomputes every area that has at least one alert or report.
///
/// A failure for one area is logged and the job moves on. Returns the
/// number of areas refreshed.
///
/// # Errors
///
/// Returns [`StatisticsError`] if the list of areas cannot be loaded.
pub async fn recompute_all_areas(
    db: &dyn Database,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<u64, StatisticsError> {
    let areas = queries::list_active_areas(db).await?;
    progress.set_total(areas.len() as u64);

    let mut refreshed = 0u64;
    for area in &areas {
        progress.set_message(area.to_string());
        match recompute_area_statistics(db, area, Utc::now()).await {
            Ok(_) => refreshed += 1,
            Err(e) => log::error!("Failed to recompute statistics for {area}: {e}"),
        }
        progress.inc(1);
    }

    progress.finish(format!("Recomputed {refreshed}/{} areas", areas.len()));
    log::info!("Recomputed statistics for {refreshed} of {} areas", areas.len());

    Ok(refreshed)
}

/// Rewrites the incident-category counters of every stored area from its
/// current totals.
///
/// This is the only writer of those counters; regular recomputes leave
/// them as they were at the last seed. Returns the number of areas seeded.
///
/// # Errors
///
/// Returns [`StatisticsError`] if loading or saving any area fails.
pub async fn seed_incident_breakdown(db: &dyn Database) -> Result<u64, StatisticsError> {
    let areas = area_db::list_areas(db, &area_db::AreaFilter::default())
        .await?;

    for mut area in areas.iter().cloned() {
        area.seed_incident_breakdown();
        area_db::upsert_area(db, &area).await?;
    }

    log::info!("Seeded incident breakdown for {} areas", areas.len());

    Ok(areas.len() as u64)
}
