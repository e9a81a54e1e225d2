//! Area statistics documents.
//!
//! One row per `(district, upazila)`. Writes always replace the whole
//! document; there is no version column, so concurrent writers for the
//! same area resolve as last-write-wins.

use std::fmt::Write as _;

use khoj_incident_models::AreaKey;
use khoj_statistics_models::{
    AreaCounters, AreaStatistics, DangerLevel, LevelDistribution, MonthlyTrend,
};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};

use crate::{DbError, conversion, from_count, parse_timestamp, to_count};

const AREA_COLUMNS: &str = "district, upazila, total_alerts, active_alerts, resolved_alerts,
    total_reports, missing_persons, theft_incidents, violence_incidents, other_incidents,
    danger_score, danger_level, monthly_trends, last_updated";

fn counter(row: &Row, column: &'static str) -> Result<u64, DbError> {
    let value: i64 = row.to_value(column).map_err(conversion(column))?;
    Ok(to_count(value))
}

fn area_from_row(row: &Row) -> Result<AreaStatistics, DbError> {
    let danger_score: i64 = row.to_value("danger_score").map_err(conversion("danger_score"))?;
    let danger_level: String = row.to_value("danger_level").map_err(conversion("danger_level"))?;
    let trends_json: String = row
        .to_value("monthly_trends")
        .map_err(conversion("monthly_trends"))?;
    let last_updated: String = row.to_value("last_updated").map_err(conversion("last_updated"))?;

    let monthly_trends: Vec<MonthlyTrend> = serde_json::from_str(&trends_json)?;

    Ok(AreaStatistics {
        district: row.to_value("district").map_err(conversion("district"))?,
        upazila: row.to_value("upazila").map_err(conversion("upazila"))?,
        statistics: AreaCounters {
            total_alerts: counter(row, "total_alerts")?,
            active_alerts: counter(row, "active_alerts")?,
            resolved_alerts: counter(row, "resolved_alerts")?,
            total_reports: counter(row, "total_reports")?,
            missing_persons: counter(row, "missing_persons")?,
            theft_incidents: counter(row, "theft_incidents")?,
            violence_incidents: counter(row, "violence_incidents")?,
            other_incidents: counter(row, "other_incidents")?,
        },
        danger_score: u8::try_from(danger_score).map_err(conversion("danger_score"))?,
        danger_level: danger_level.parse().map_err(conversion("danger_level"))?,
        monthly_trends,
        last_updated: parse_timestamp("last_updated", &last_updated)?,
    })
}

/// Loads the statistics document for an area.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails or a column cannot
/// be decoded.
pub async fn get_area(
    db: &dyn Database,
    area: &AreaKey,
) -> Result<Option<AreaStatistics>, DbError> {
    let rows = db
        .query_raw_params(
            &format!(
                "SELECT {AREA_COLUMNS} FROM area_statistics WHERE district = $1 AND upazila = $2"
            ),
            &[
                DatabaseValue::String(area.district.clone()),
                DatabaseValue::String(area.upazila.clone()),
            ],
        )
        .await?;

    rows.first().map(area_from_row).transpose()
}

/// Inserts the document, or replaces the existing one for the same area.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn upsert_area(db: &dyn Database, stats: &AreaStatistics) -> Result<(), DbError> {
    let trends_json = serde_json::to_string(&stats.monthly_trends)?;
    let c = &stats.statistics;

    db.exec_raw_params(
        "INSERT INTO area_statistics (
            district, upazila, total_alerts, active_alerts, resolved_alerts,
            total_reports, missing_persons, theft_incidents, violence_incidents,
            other_incidents, danger_score, danger_level, monthly_trends, last_updated
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        ON CONFLICT (district, upazila) DO UPDATE SET
            total_alerts = excluded.total_alerts,
            active_alerts = excluded.active_alerts,
            resolved_alerts = excluded.resolved_alerts,
            total_reports = excluded.total_reports,
            missing_persons = excluded.missing_persons,
            theft_incidents = excluded.theft_incidents,
            violence_incidents = excluded.violence_incidents,
            other_incidents = excluded.other_incidents,
            danger_score = excluded.danger_score,
            danger_level = excluded.danger_level,
            monthly_trends = excluded.monthly_trends,
            last_updated = excluded.last_updated",
        &[
            DatabaseValue::String(stats.district.clone()),
            DatabaseValue::String(stats.upazila.clone()),
            from_count(c.total_alerts),
            from_count(c.active_alerts),
            from_count(c.resolved_alerts),
            from_count(c.total_reports),
            from_count(c.missing_persons),
            from_count(c.theft_incidents),
            from_count(c.violence_incidents),
            from_count(c.other_incidents),
            DatabaseValue::Int32(i32::from(stats.danger_score)),
            DatabaseValue::String(stats.danger_level.to_string()),
            DatabaseValue::String(trends_json),
            DatabaseValue::String(stats.last_updated.to_rfc3339()),
        ],
    )
    .await?;

    Ok(())
}

/// Filter for listing area documents.
#[derive(Debug, Clone, Default)]
pub struct AreaFilter<'a> {
    /// Restrict to one district.
    pub district: Option<&'a str>,
    /// Restrict to one upazila name (in any district unless `district` is set).
    pub upazila: Option<&'a str>,
    /// Restrict to these levels; empty means any level.
    pub levels: &'a [DangerLevel],
    /// Maximum number of rows.
    pub limit: Option<u32>,
}

/// Lists area documents ordered by danger score, most dangerous first.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails or a row cannot be
/// decoded.
pub async fn list_areas(
    db: &dyn Database,
    filter: &AreaFilter<'_>,
) -> Result<Vec<AreaStatistics>, DbError> {
    let mut sql = format!("SELECT {AREA_COLUMNS} FROM area_statistics WHERE 1=1");
    let mut params: Vec<DatabaseValue> = Vec::new();
    let mut idx = 1u32;

    if let Some(district) = filter.district {
        write!(sql, " AND district = ${idx}").unwrap();
        params.push(DatabaseValue::String(district.to_string()));
        idx += 1;
    }

    if let Some(upazila) = filter.upazila {
        write!(sql, " AND upazila = ${idx}").unwrap();
        params.push(DatabaseValue::String(upazila.to_string()));
        idx += 1;
    }

    if !filter.levels.is_empty() {
        let placeholders: Vec<String> = filter
            .levels
            .iter()
            .map(|level| {
                let p = format!("${idx}");
                params.push(DatabaseValue::String(level.to_string()));
                idx += 1;
                p
            })
            .collect();
        write!(sql, " AND danger_level IN ({})", placeholders.join(", ")).unwrap();
    }

    sql.push_str(" ORDER BY danger_score DESC, district, upazila");

    if let Some(limit) = filter.limit {
        write!(sql, " LIMIT ${idx}").unwrap();
        params.push(DatabaseValue::Int64(i64::from(limit)));
    }

    let rows = db.query_raw_params(&sql, &params).await?;

    rows.iter().map(area_from_row).collect()
}

/// Returns how many area documents sit at each danger level.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn level_distribution(db: &dyn Database) -> Result<LevelDistribution, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT danger_level, COUNT(*) AS cnt FROM area_statistics GROUP BY danger_level",
            &[],
        )
        .await?;

    let mut tally = LevelDistribution::default();
    for row in &rows {
        let level: String = row.to_value("danger_level").map_err(conversion("danger_level"))?;
        let Ok(level) = level.parse::<DangerLevel>() else {
            log::warn!("Skipping unknown danger level '{level}' in area_statistics");
            continue;
        };
        tally.add_many(level, counter(row, "cnt")?);
    }

    Ok(tally)
}
