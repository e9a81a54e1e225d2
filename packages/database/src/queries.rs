//! Alert and report queries.
//!
//! The statistics engine only ever reads counts from these collections;
//! the insert/update/delete functions exist for the request handlers that
//! trigger recomputes.

use chrono::{DateTime, Utc};
use khoj_incident_models::{Alert, AlertStatus, AreaKey, NewAlert, NewReport, Report};
use khoj_statistics_models::AreaCounts;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};

use crate::{DbError, conversion, parse_timestamp, to_count};

const ALERT_COLUMNS: &str =
    "id, title, description, district, upazila, status, created_at, updated_at";

const REPORT_COLUMNS: &str = "id, title, description, district, upazila, created_at";

/// Tallies live alert and report counts.
///
/// With `Some(area)` the counts are restricted to that area; with `None`
/// they cover every area. This is the only counting path used by the
/// statistics engine.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn count_activity(
    db: &dyn Database,
    area: Option<&AreaKey>,
) -> Result<AreaCounts, DbError> {
    let (filter, params) = area.map_or_else(
        || (String::new(), Vec::new()),
        |area| {
            (
                " WHERE district = $1 AND upazila = $2".to_string(),
                vec![
                    DatabaseValue::String(area.district.clone()),
                    DatabaseValue::String(area.upazila.clone()),
                ],
            )
        },
    );

    let sql = format!(
        "SELECT COUNT(*) AS total_alerts,
                COALESCE(SUM(CASE WHEN status = 'active' THEN 1 ELSE 0 END), 0) AS active_alerts,
                COALESCE(SUM(CASE WHEN status = 'resolved' THEN 1 ELSE 0 END), 0)
                    AS resolved_alerts,
                (SELECT COUNT(*) FROM reports{filter}) AS total_reports
         FROM alerts{filter}"
    );

    let rows = db.query_raw_params(&sql, &params).await?;
    let Some(row) = rows.first() else {
        return Ok(AreaCounts::default());
    };

    let total_alerts: i64 = row.to_value("total_alerts").map_err(conversion("total_alerts"))?;
    let active_alerts: i64 = row
        .to_value("active_alerts")
        .map_err(conversion("active_alerts"))?;
    let resolved_alerts: i64 = row
        .to_value("resolved_alerts")
        .map_err(conversion("resolved_alerts"))?;
    let total_reports: i64 = row
        .to_value("total_reports")
        .map_err(conversion("total_reports"))?;

    Ok(AreaCounts {
        total_alerts: to_count(total_alerts),
        active_alerts: to_count(active_alerts),
        resolved_alerts: to_count(resolved_alerts),
        total_reports: to_count(total_reports),
    })
}

/// Returns every area that has at least one alert or report.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_active_areas(db: &dyn Database) -> Result<Vec<AreaKey>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT district, upazila FROM alerts
             UNION
             SELECT district, upazila FROM reports
             ORDER BY district, upazila",
            &[],
        )
        .await?;

    rows.iter()
        .map(|row| {
            Ok(AreaKey {
                district: row.to_value("district").map_err(conversion("district"))?,
                upazila: row.to_value("upazila").map_err(conversion("upazila"))?,
            })
        })
        .collect()
}

fn alert_from_row(row: &Row) -> Result<Alert, DbError> {
    let status: String = row.to_value("status").map_err(conversion("status"))?;
    let created_at: String = row.to_value("created_at").map_err(conversion("created_at"))?;
    let updated_at: String = row.to_value("updated_at").map_err(conversion("updated_at"))?;

    Ok(Alert {
        id: row.to_value("id").map_err(conversion("id"))?,
        title: row.to_value("title").map_err(conversion("title"))?,
        description: row.to_value("description").unwrap_or(None),
        district: row.to_value("district").map_err(conversion("district"))?,
        upazila: row.to_value("upazila").map_err(conversion("upazila"))?,
        status: status.parse().map_err(conversion("status"))?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

fn report_from_row(row: &Row) -> Result<Report, DbError> {
    let created_at: String = row.to_value("created_at").map_err(conversion("created_at"))?;

    Ok(Report {
        id: row.to_value("id").map_err(conversion("id"))?,
        title: row.to_value("title").map_err(conversion("title"))?,
        description: row.to_value("description").unwrap_or(None),
        district: row.to_value("district").map_err(conversion("district"))?,
        upazila: row.to_value("upazila").map_err(conversion("upazila"))?,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

/// Files a new active alert for `area`.
///
/// The district and upazila stored are the normalized ones from `area`,
/// not the raw payload values.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn insert_alert(
    db: &dyn Database,
    area: &AreaKey,
    alert: &NewAlert,
    now: DateTime<Utc>,
) -> Result<Alert, DbError> {
    let stored = Alert {
        id: uuid::Uuid::new_v4().to_string(),
        title: alert.title.trim().to_string(),
        description: alert.description.clone(),
        district: area.district.clone(),
        upazila: area.upazila.clone(),
        status: AlertStatus::Active,
        created_at: now,
        updated_at: now,
    };

    db.exec_raw_params(
        "INSERT INTO alerts
             (id, title, description, district, upazila, status, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $7)",
        &[
            DatabaseValue::String(stored.id.clone()),
            DatabaseValue::String(stored.title.clone()),
            stored
                .description
                .clone()
                .map_or(DatabaseValue::Null, DatabaseValue::String),
            DatabaseValue::String(stored.district.clone()),
            DatabaseValue::String(stored.upazila.clone()),
            DatabaseValue::String(stored.status.to_string()),
            DatabaseValue::String(now.to_rfc3339()),
        ],
    )
    .await?;

    Ok(stored)
}

/// Loads an alert by id.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_alert(db: &dyn Database, id: &str) -> Result<Option<Alert>, DbError> {
    let rows = db
        .query_raw_params(
            &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = $1"),
            &[DatabaseValue::String(id.to_string())],
        )
        .await?;

    rows.first().map(alert_from_row).transpose()
}

/// Changes an alert's status and returns the updated alert, or `None` if
/// no alert has that id.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn update_alert_status(
    db: &dyn Database,
    id: &str,
    status: AlertStatus,
    now: DateTime<Utc>,
) -> Result<Option<Alert>, DbError> {
    let updated = db
        .exec_raw_params(
            "UPDATE alerts SET status = $2, updated_at = $3 WHERE id = $1",
            &[
                DatabaseValue::String(id.to_string()),
                DatabaseValue::String(status.to_string()),
                DatabaseValue::String(now.to_rfc3339()),
            ],
        )
        .await?;

    if updated == 0 {
        return Ok(None);
    }

    get_alert(db, id).await
}

/// Files a new report for `area`.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn insert_report(
    db: &dyn Database,
    area: &AreaKey,
    report: &NewReport,
    now: DateTime<Utc>,
) -> Result<Report, DbError> {
    let stored = Report {
        id: uuid::Uuid::new_v4().to_string(),
        title: report.title.trim().to_string(),
        description: report.description.clone(),
        district: area.district.clone(),
        upazila: area.upazila.clone(),
        created_at: now,
    };

    db.exec_raw_params(
        "INSERT INTO reports (id, title, description, district, upazila, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
        &[
            DatabaseValue::String(stored.id.clone()),
            DatabaseValue::String(stored.title.clone()),
            stored
                .description
                .clone()
                .map_or(DatabaseValue::Null, DatabaseValue::String),
            DatabaseValue::String(stored.district.clone()),
            DatabaseValue::String(stored.upazila.clone()),
            DatabaseValue::String(now.to_rfc3339()),
        ],
    )
    .await?;

    Ok(stored)
}

/// Loads a report by id.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_report(db: &dyn Database, id: &str) -> Result<Option<Report>, DbError> {
    let rows = db
        .query_raw_params(
            &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"),
            &[DatabaseValue::String(id.to_string())],
        )
        .await?;

    rows.first().map(report_from_row).transpose()
}

/// Deletes a report and returns what was deleted, or `None` if no report
/// has that id.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn delete_report(db: &dyn Database, id: &str) -> Result<Option<Report>, DbError> {
    let Some(report) = get_report(db, id).await? else {
        return Ok(None);
    };

    db.exec_raw_params(
        "DELETE FROM reports WHERE id = $1",
        &[DatabaseValue::String(id.to_string())],
    )
    .await?;

    Ok(Some(report))
}
