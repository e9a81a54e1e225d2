#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the Khoj safety platform.
//!
//! Serves the area danger statistics endpoints, the alert and report write
//! endpoints that keep those statistics fresh, and a Server-Sent Events
//! stream of realtime alert notifications. All state lives in one `SQLite`
//! database opened from `DATABASE_PATH`.

pub mod config;
pub mod error;
mod handlers;
pub mod interactive;
pub mod realtime;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use khoj_database::db;
use switchy_database::Database;

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::realtime::ConnectionRegistry;

/// Shared application state.
pub struct AppState {
    /// `SQLite` database holding alerts, reports and area statistics.
    pub db: Arc<dyn Database>,
    /// Connected notification streams.
    pub connections: Arc<ConnectionRegistry>,
}

impl AppState {
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            db,
            connections: Arc::new(ConnectionRegistry::new()),
        }
    }
}

/// Registers the `/api` routes and the extractor error handlers.
///
/// Malformed query strings and JSON bodies are answered with the same
/// `{success: false, error}` envelope as every other validation failure.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route(
                "/statistics/area",
                web::get().to(handlers::area_statistics),
            )
            .route(
                "/statistics/district/{district}",
                web::get().to(handlers::district_statistics),
            )
            .route(
                "/statistics/dangerous-areas",
                web::get().to(handlers::dangerous_areas),
            )
            .route(
                "/statistics/overall",
                web::get().to(handlers::overall_statistics),
            )
            .route("/statistics/trends", web::get().to(handlers::trends))
            .route(
                "/statistics/update",
                web::post().to(handlers::update_statistics),
            )
            .route("/alerts", web::post().to(handlers::create_alert))
            .route(
                "/alerts/{id}/status",
                web::patch().to(handlers::update_alert_status),
            )
            .route("/reports", web::post().to(handlers::create_report))
            .route("/reports/{id}", web::delete().to(handlers::delete_report))
            .route(
                "/notifications/stream",
                web::get().to(handlers::notification_stream),
            ),
    );
}

/// Starts the Khoj API server with settings from the environment.
///
/// The caller provides the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Error` if the database cannot be opened or the
/// HTTP server fails to bind.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    serve(ServerConfig::from_env()).await
}

/// Opens the database named by `config` (creating the schema if needed)
/// and serves until shut down.
///
/// # Errors
///
/// Returns an `std::io::Error` if the database cannot be opened or the
/// HTTP server fails to bind.
#[allow(clippy::future_not_send)]
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    log::info!("Opening database at {}...", config.database_path.display());
    let db_conn = db::open(&config.database_path)
        .await
        .map_err(std::io::Error::other)?;

    let state = web::Data::new(AppState::new(Arc::from(db_conn)));

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use actix_web::http::StatusCode;
    use actix_web::test;
    use khoj_database::area_db;
    use khoj_incident_models::{Alert, AlertStatus, AreaKey, Report};
    use khoj_server_models::AlertStatusResponse;
    use khoj_statistics_models::{AreaStatistics, DangerLevel, OverallStatistics};
    use serde_json::{Value, json};

    use super::*;

    async fn state(name: &str) -> web::Data<AppState> {
        let path: PathBuf = std::env::temp_dir().join(format!("khoj_server_test_{name}.db"));
        let _ = std::fs::remove_file(&path);
        let db = db::open(&path).await.unwrap();
        web::Data::new(AppState::new(Arc::from(db)))
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(App::new().app_data($state.clone()).configure(configure)).await
        };
    }

    fn data<T: serde::de::DeserializeOwned>(body: Value) -> T {
        assert_eq!(body["success"], true, "unexpected body: {body}");
        serde_json::from_value(body["data"].clone()).unwrap()
    }

    /// Polls the stored document until `ready` holds, since write endpoints
    /// refresh their area in the background.
    async fn wait_for_area(
        state: &web::Data<AppState>,
        area: &AreaKey,
        ready: impl Fn(&AreaStatistics) -> bool,
    ) -> AreaStatistics {
        for _ in 0..200 {
            let stored = area_db::get_area(state.db.as_ref(), area).await.unwrap();
            if let Some(stats) = stored.filter(|s| ready(s)) {
                return stats;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{area} was never refreshed");
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let state = state("health").await;
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["healthy"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn area_requires_district_and_upazila() {
        let state = state("area_missing").await;
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/api/statistics/area?district=Dhaka")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("required"));
    }

    #[actix_web::test]
    async fn unknown_area_is_materialized_as_safe() {
        let state = state("area_unknown").await;
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/api/statistics/area?district=Rangpur&upazila=Pirganj")
            .to_request();
        let stats: AreaStatistics = data(test::call_and_read_body_json(&app, req).await);

        assert_eq!(stats.danger_score, 0);
        assert_eq!(stats.danger_level, DangerLevel::Safe);
        assert_eq!(stats.monthly_trends.len(), 1);
    }

    #[actix_web::test]
    async fn status_change_recomputes_before_responding() {
        let state = state("alert_status").await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/alerts")
            .set_json(json!({
                "title": "Missing child",
                "district": " Dhaka ",
                "upazila": "Mirpur",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let alert: Alert = data(test::read_body_json(resp).await);
        assert_eq!(alert.district, "Dhaka");
        assert_eq!(alert.status, AlertStatus::Active);

        let req = test::TestRequest::patch()
            .uri(&format!("/api/alerts/{}/status", alert.id))
            .set_json(json!({"status": "resolved"}))
            .to_request();
        let updated: AlertStatusResponse = data(test::call_and_read_body_json(&app, req).await);

        assert_eq!(updated.alert.status, AlertStatus::Resolved);
        let stats = updated.statistics.unwrap();
        assert_eq!(stats.statistics.total_alerts, 1);
        assert_eq!(stats.statistics.active_alerts, 0);
        assert_eq!(stats.statistics.resolved_alerts, 1);
        // 1 * 2 * 0.3 = 0.6
        assert_eq!(stats.danger_score, 1);
    }

    #[actix_web::test]
    async fn status_change_for_missing_alert_is_not_found() {
        let state = state("alert_missing").await;
        let app = app!(state);

        let req = test::TestRequest::patch()
            .uri("/api/alerts/nope/status")
            .set_json(json!({"status": "cancelled"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn alert_in_blank_area_is_rejected() {
        let state = state("alert_blank").await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/alerts")
            .set_json(json!({"title": "x", "district": "Dhaka", "upazila": "  "}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn malformed_json_uses_the_error_envelope() {
        let state = state("bad_json").await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/statistics/update")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn update_endpoint_recomputes_and_feeds_overall() {
        let state = state("update_overall").await;
        let app = app!(state);

        for _ in 0..3 {
            let req = test::TestRequest::post()
                .uri("/api/reports")
                .set_json(json!({"title": "Theft", "district": "Sylhet", "upazila": "Sadar"}))
                .to_request();
            assert_eq!(
                test::call_service(&app, req).await.status(),
                StatusCode::CREATED
            );
        }

        let req = test::TestRequest::post()
            .uri("/api/statistics/update")
            .set_json(json!({"district": "Sylhet", "upazila": "Sadar"}))
            .to_request();
        let stats: AreaStatistics = data(test::call_and_read_body_json(&app, req).await);
        // 3 * 1.5 * 0.3 = 1.35
        assert_eq!(stats.danger_score, 1);
        assert_eq!(stats.statistics.total_reports, 3);

        let req = test::TestRequest::get()
            .uri("/api/statistics/overall")
            .to_request();
        let overall: OverallStatistics = data(test::call_and_read_body_json(&app, req).await);
        assert_eq!(overall.total_reports, 3);
        assert_eq!(overall.total_areas, 1);
        assert_eq!(overall.level_distribution.safe, 1);
    }

    #[actix_web::test]
    async fn deleting_a_report_returns_it_once() {
        let state = state("report_delete").await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/reports")
            .set_json(json!({"title": "Assault", "district": "Khulna", "upazila": "Sadar"}))
            .to_request();
        let report: Report = data(test::call_and_read_body_json(&app, req).await);

        let uri = format!("/api/reports/{}", report.id);
        let req = test::TestRequest::delete().uri(&uri).to_request();
        let deleted: Report = data(test::call_and_read_body_json(&app, req).await);
        assert_eq!(deleted.id, report.id);

        let req = test::TestRequest::delete().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn report_writes_refresh_the_stored_area() {
        let state = state("report_refresh").await;
        let app = app!(state);
        let area = AreaKey::new("Chattogram", "Patiya").unwrap();

        let mut last = None;
        for filed in 1..=10u64 {
            let req = test::TestRequest::post()
                .uri("/api/reports")
                .set_json(json!({"title": "Theft", "district": "Chattogram", "upazila": "Patiya"}))
                .to_request();
            let report: Report = data(test::call_and_read_body_json(&app, req).await);
            last = Some(report);
            wait_for_area(&state, &area, |s| s.statistics.total_reports == filed).await;
        }

        let stats = wait_for_area(&state, &area, |s| s.statistics.total_reports == 10).await;
        // 10 * 1.5 * 0.3 = 4.5
        assert_eq!(stats.danger_score, 5);

        let uri = format!("/api/reports/{}", last.unwrap().id);
        let req = test::TestRequest::delete().uri(&uri).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let stats = wait_for_area(&state, &area, |s| s.statistics.total_reports == 9).await;
        // 9 * 1.5 * 0.3 = 4.05
        assert_eq!(stats.danger_score, 4);
    }

    #[actix_web::test]
    async fn new_alerts_refresh_the_stored_area() {
        let state = state("alert_refresh").await;
        let app = app!(state);
        let area = AreaKey::new("Barishal", "Bakerganj").unwrap();

        let req = test::TestRequest::post()
            .uri("/api/alerts")
            .set_json(json!({"title": "Missing", "district": "Barishal", "upazila": "Bakerganj"}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CREATED
        );

        let stats = wait_for_area(&state, &area, |s| s.statistics.total_alerts == 1).await;
        assert_eq!(stats.statistics.active_alerts, 1);
        // 1 * 10 * 0.4 + 1 * 2 * 0.3 = 4.6
        assert_eq!(stats.danger_score, 5);
        assert_eq!(stats.danger_level, DangerLevel::Safe);
    }

    #[actix_web::test]
    async fn dangerous_areas_default_to_an_empty_list() {
        let state = state("dangerous_empty").await;
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/api/statistics/dangerous-areas?limit=3")
            .to_request();
        let areas: Vec<AreaStatistics> = data(test::call_and_read_body_json(&app, req).await);

        assert!(areas.is_empty());
    }

    #[actix_web::test]
    async fn new_alerts_reach_connected_users() {
        let state = state("alert_broadcast").await;
        let (_, mut rx) = state.connections.register("watcher").await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/alerts")
            .set_json(json!({"title": "Flood", "district": "Sylhet", "upazila": "Sadar"}))
            .to_request();
        let alert: Alert = data(test::call_and_read_body_json(&app, req).await);

        match rx.recv().await.unwrap() {
            khoj_server_models::RealtimeEvent::AlertCreated(sent) => assert_eq!(sent.id, alert.id),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[actix_web::test]
    async fn stream_requires_a_user() {
        let state = state("stream_blank").await;
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/api/notifications/stream?userId=%20")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn stream_registers_the_user() {
        let state = state("stream_open").await;
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/api/notifications/stream?userId=u1")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "text/event-stream"
        );
        assert_eq!(state.connections.connection_count().await, 1);
    }
}
