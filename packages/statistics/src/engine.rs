//! Recompute and upsert of area statistics documents.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use khoj_database::{area_db, queries};
use khoj_incident_models::AreaKey;
use khoj_statistics_models::AreaStatistics;
use switchy_database::Database;
use tokio::task::JoinHandle;

use crate::StatisticsError;

/// Recounts an area's alerts and reports, rescores it, and writes the
/// document back.
///
/// A missing document is created zero-valued first. Only the live counters
/// are replaced; the incident-category counters keep their stored values.
/// The read and write are not guarded, so two concurrent recomputes for
/// the same area resolve as last-write-wins.
///
/// # Errors
///
/// Returns [`StatisticsError`] if counting, loading or persisting fails.
pub async fn recompute_area_statistics(
    db: &dyn Database,
    area: &AreaKey,
    now: DateTime<Utc>,
) -> Result<AreaStatistics, StatisticsError> {
    let counts = queries::count_activity(db, Some(area)).await?;

    let mut stats = match area_db::get_area(db, area).await? {
        Some(existing) => existing,
        None => {
            log::info!("Creating statistics for new area {area}");
            AreaStatistics::empty(area, now)
        }
    };

    stats.apply_counts(counts, now);
    area_db::upsert_area(db, &stats).await?;

    log::debug!(
        "Recomputed {area}: score={} level={} alerts={} active={} reports={}",
        stats.danger_score,
        stats.danger_level,
        counts.total_alerts,
        counts.active_alerts,
        counts.total_reports,
    );

    Ok(stats)
}

/// How a side-effect recompute relates to the request that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputePolicy {
    /// Run inside the caller and hand back the refreshed document.
    Await,
    /// Spawn onto the runtime and return immediately.
    Detach,
}

/// Result of [`refresh_area`].
#[derive(Debug)]
pub enum Refresh {
    /// The recompute ran to completion. `None` means it failed and the
    /// failure was logged.
    Completed(Option<AreaStatistics>),
    /// The recompute was spawned. Dropping the handle leaves it running.
    Scheduled(JoinHandle<()>),
}

impl Refresh {
    /// Returns the refreshed document if the recompute already finished
    /// successfully.
    #[must_use]
    pub fn into_completed(self) -> Option<AreaStatistics> {
        match self {
            Self::Completed(stats) => stats,
            Self::Scheduled(_) => None,
        }
    }
}

/// Recomputes an area as a side effect of an alert or report write.
///
/// Failures are logged and swallowed under both policies so the triggering
/// write never fails because of a recompute.
pub async fn refresh_area(
    db: &Arc<dyn Database>,
    area: AreaKey,
    policy: RecomputePolicy,
) -> Refresh {
    match policy {
        RecomputePolicy::Await => Refresh::Completed(recompute_logged(db.as_ref(), &area).await),
        RecomputePolicy::Detach => {
            let db = Arc::clone(db);
            Refresh::Scheduled(tokio::spawn(async move {
                recompute_logged(db.as_ref(), &area).await;
            }))
        }
    }
}

async fn recompute_logged(db: &dyn Database, area: &AreaKey) -> Option<AreaStatistics> {
    match recompute_area_statistics(db, area, Utc::now()).await {
        Ok(stats) => Some(stats),
        Err(e) => {
            log::error!("Failed to recompute statistics for {area}: {e}");
            None
        }
    }
}
