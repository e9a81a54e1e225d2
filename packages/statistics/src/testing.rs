use std::sync::Arc;

use chrono::Utc;
use khoj_database::queries;
use khoj_incident_models::{AlertStatus, AreaKey, NewAlert, NewReport};
use switchy_database::Database;

pub async fn temp_db(name: &str) -> Arc<dyn Database> {
    let path = std::env::temp_dir().join(format!("khoj_statistics_test_{name}.db"));
    let _ = std::fs::remove_file(&path);
    Arc::from(khoj_database::db::open(&path).await.unwrap())
}

/// Files `total` alerts in `area`, resolving all but `active` of them.
pub async fn seed_alerts(db: &dyn Database, area: &AreaKey, total: usize, active: usize) {
    for i in 0..total {
        let alert = queries::insert_alert(
            db,
            area,
            &NewAlert {
                title: format!("Alert {i}"),
                description: None,
                district: area.district.clone(),
                upazila: area.upazila.clone(),
            },
            Utc::now(),
        )
        .await
        .unwrap();
        if i >= active {
            queries::update_alert_status(db, &alert.id, AlertStatus::Resolved, Utc::now())
                .await
                .unwrap();
        }
    }
}

pub async fn seed_reports(db: &dyn Database, area: &AreaKey, total: usize) {
    for i in 0..total {
        queries::insert_report(
            db,
            area,
            &NewReport {
                title: format!("Report {i}"),
                description: None,
                district: area.district.clone(),
                upazila: area.upazila.clone(),
            },
            Utc::now(),
        )
        .await
        .unwrap();
    }
}
