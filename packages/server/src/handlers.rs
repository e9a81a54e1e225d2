//! HTTP handler functions for the Khoj API.

use std::sync::Arc;

use actix_web::{HttpResponse, web};
use chrono::Utc;
use khoj_database::queries;
use khoj_incident_models::{AreaKey, NewAlert, NewReport};
use khoj_server_models::{
    AlertStatusResponse, AlertStatusUpdate, ApiHealth, ApiResponse, AreaQueryParams,
    DangerousAreasParams, NotificationStreamParams, RealtimeEvent, TrendQueryParams,
    UpdateStatisticsRequest,
};
use khoj_statistics::engine::{self, RecomputePolicy};
use khoj_statistics::reads;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use crate::realtime::ConnectionRegistry;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/statistics/area?district=&upazila=`
///
/// Returns the area's statistics document, creating it on first access.
pub async fn area_statistics(
    state: web::Data<AppState>,
    params: web::Query<AreaQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let area = AreaKey::from_parts(params.district.as_deref(), params.upazila.as_deref())?;
    let stats = reads::get_area(state.db.as_ref(), &area).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}

/// `GET /api/statistics/district/{district}`
pub async fn district_statistics(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let district = path.into_inner();
    if district.trim().is_empty() {
        return Err(ApiError::Validation("district is required".to_string()));
    }
    let stats = reads::get_district(state.db.as_ref(), &district).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}

/// `GET /api/statistics/dangerous-areas?limit=`
pub async fn dangerous_areas(
    state: web::Data<AppState>,
    params: web::Query<DangerousAreasParams>,
) -> Result<HttpResponse, ApiError> {
    let areas = reads::get_dangerous_areas(state.db.as_ref(), params.limit)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(areas)))
}

/// `GET /api/statistics/overall`
pub async fn overall_statistics(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let overall = reads::get_overall(state.db.as_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(overall)))
}

/// `GET /api/statistics/trends?district=&upazila=&months=`
pub async fn trends(
    state: web::Data<AppState>,
    params: web::Query<TrendQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let points = reads::get_trends(
        state.db.as_ref(),
        params.district.as_deref(),
        params.upazila.as_deref(),
        params.months,
    )
    .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(points)))
}

/// `POST /api/statistics/update`
///
/// Recomputes one area and returns the fresh document. Unlike the
/// side-effect recomputes, failures here are reported to the caller.
pub async fn update_statistics(
    state: web::Data<AppState>,
    body: web::Json<UpdateStatisticsRequest>,
) -> Result<HttpResponse, ApiError> {
    let area = AreaKey::from_parts(body.district.as_deref(), body.upazila.as_deref())?;
    let stats = engine::recompute_area_statistics(state.db.as_ref(), &area, Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}

fn require_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".to_string()));
    }
    Ok(())
}

/// `POST /api/alerts`
///
/// Files the alert, schedules a recompute of its area, and broadcasts it
/// to connected users.
pub async fn create_alert(
    state: web::Data<AppState>,
    body: web::Json<NewAlert>,
) -> Result<HttpResponse, ApiError> {
    let alert = body.into_inner();
    require_title(&alert.title)?;
    let area = AreaKey::new(&alert.district, &alert.upazila)?;

    let stored = queries::insert_alert(state.db.as_ref(), &area, &alert, Utc::now())
        .await?;
    log::info!("Alert {} filed in {area}", stored.id);

    engine::refresh_area(&state.db, area, RecomputePolicy::Detach)
        .await;
    state
        .connections
        .broadcast(&RealtimeEvent::AlertCreated(stored.clone()))
        .await;

    Ok(HttpResponse::Created().json(ApiResponse::ok(stored)))
}

/// `PATCH /api/alerts/{id}/status`
///
/// Responds only after the area has been recomputed.
pub async fn update_alert_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<AlertStatusUpdate>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let Some(alert) = queries::update_alert_status(state.db.as_ref(), &id, body.status, Utc::now())
        .await?
    else {
        return Err(ApiError::NotFound(format!("Alert {id} not found")));
    };
    log::info!("Alert {id} is now {}", alert.status);

    let statistics = engine::refresh_area(&state.db, alert.area(), RecomputePolicy::Await)
        .await
        .into_completed();
    state
        .connections
        .broadcast(&RealtimeEvent::AlertStatusChanged(alert.clone()))
        .await;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(AlertStatusResponse { alert, statistics })))
}

/// `POST /api/reports`
pub async fn create_report(
    state: web::Data<AppState>,
    body: web::Json<NewReport>,
) -> Result<HttpResponse, ApiError> {
    let report = body.into_inner();
    require_title(&report.title)?;
    let area = AreaKey::new(&report.district, &report.upazila)?;

    let stored = queries::insert_report(state.db.as_ref(), &area, &report, Utc::now())
        .await?;
    log::info!("Report {} filed in {area}", stored.id);

    engine::refresh_area(&state.db, area, RecomputePolicy::Detach)
        .await;

    Ok(HttpResponse::Created().json(ApiResponse::ok(stored)))
}

/// `DELETE /api/reports/{id}`
pub async fn delete_report(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let Some(report) = queries::delete_report(state.db.as_ref(), &id).await? else {
        return Err(ApiError::NotFound(format!("Report {id} not found")));
    };
    log::info!("Report {id} deleted from {}", report.area());

    engine::refresh_area(&state.db, report.area(), RecomputePolicy::Detach)
        .await;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(report)))
}

/// Unregisters a stream's connection when the client goes away.
struct StreamGuard {
    connections: Arc<ConnectionRegistry>,
    user_id: String,
    connection_id: Uuid,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let connections = Arc::clone(&self.connections);
        let user_id = std::mem::take(&mut self.user_id);
        let connection_id = self.connection_id;
        handle.spawn(async move {
            connections.unregister(&user_id, connection_id).await;
        });
    }
}

fn sse_frame(event: &RealtimeEvent) -> Result<web::Bytes, serde_json::Error> {
    let data = serde_json::to_string(event)?;
    Ok(web::Bytes::from(format!(
        "event: {}\ndata: {data}\n\n",
        event.kind()
    )))
}

/// `GET /api/notifications/stream?userId=`
///
/// Streams realtime events to one user as Server-Sent Events. Opening a
/// second stream for the same user closes the first.
pub async fn notification_stream(
    state: web::Data<AppState>,
    params: web::Query<NotificationStreamParams>,
) -> Result<HttpResponse, ApiError> {
    let user_id = params.into_inner().user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(ApiError::Validation("userId is required".to_string()));
    }

    let connections = Arc::clone(&state.connections);
    let (connection_id, mut rx) = connections.register(&user_id).await;
    let guard = StreamGuard {
        connections,
        user_id,
        connection_id,
    };

    let stream = async_stream::stream! {
        let _guard = guard;
        yield Ok::<_, actix_web::Error>(web::Bytes::from_static(b": connected\n\n"));

        while let Some(event) = rx.recv().await {
            match sse_frame(&event) {
                Ok(frame) => yield Ok(frame),
                Err(e) => log::error!("Failed to encode {} event: {e}", event.kind()),
            }
        }
    };

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(stream))
}
