#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the Khoj server.
//!
//! Every JSON response is wrapped in an [`ApiResponse`] envelope of the
//! shape `{success, data}` or `{success, error}`. Realtime events pushed
//! over the notification stream are [`RealtimeEvent`]s.

use khoj_incident_models::{Alert, AlertStatus};
use khoj_statistics_models::AreaStatistics;
use serde::{Deserialize, Serialize};

/// Response envelope shared by all endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request succeeded.
    pub success: bool,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// A successful response carrying `data`.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    /// A failed response carrying `message`.
    #[must_use]
    pub const fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Query parameters naming one area.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AreaQueryParams {
    /// District name.
    pub district: Option<String>,
    /// Upazila name.
    pub upazila: Option<String>,
}

/// Query parameters for the dangerous-areas endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DangerousAreasParams {
    /// Maximum number of areas (default 10).
    pub limit: Option<u32>,
}

/// Query parameters for the trends endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendQueryParams {
    /// Restrict to one district.
    pub district: Option<String>,
    /// Restrict to one upazila.
    pub upazila: Option<String>,
    /// Newest entries taken per area (default 6).
    pub months: Option<usize>,
}

/// Body of `POST /statistics/update`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStatisticsRequest {
    /// District name.
    pub district: Option<String>,
    /// Upazila name.
    pub upazila: Option<String>,
}

/// Body of `PATCH /alerts/{id}/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertStatusUpdate {
    /// New status.
    pub status: AlertStatus,
}

/// Response of `PATCH /alerts/{id}/status`.
///
/// `statistics` is the area document as recomputed after the change, or
/// `None` if that recompute failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStatusResponse {
    /// The updated alert.
    pub alert: Alert,
    /// The alert's area after recompute.
    pub statistics: Option<AreaStatistics>,
}

/// Query parameters for the notification stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStreamParams {
    /// User the stream belongs to.
    pub user_id: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// An event pushed to connected users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RealtimeEvent {
    /// A new alert was filed.
    AlertCreated(Alert),
    /// An alert changed status.
    AlertStatusChanged(Alert),
}

impl RealtimeEvent {
    /// The `type` tag this event serializes with.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AlertCreated(_) => "alert_created",
            Self::AlertStatusChanged(_) => "alert_status_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_omits_absent_fields() {
        let ok = serde_json::to_value(ApiResponse::ok(3)).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "data": 3}));

        let err = serde_json::to_value(ApiResponse::error("boom".to_string()))
            .unwrap();
        assert_eq!(err, serde_json::json!({"success": false, "error": "boom"}));
    }

    #[test]
    fn status_update_accepts_snake_case() {
        let update: AlertStatusUpdate = serde_json::from_str(r#"{"status":"resolved"}"#).unwrap();
        assert_eq!(update.status, AlertStatus::Resolved);
    }

    #[test]
    fn realtime_events_are_tagged_by_kind() {
        let alert = Alert {
            id: "a1".to_string(),
            title: "Missing child".to_string(),
            description: None,
            district: "Dhaka".to_string(),
            upazila: "Mirpur".to_string(),
            status: AlertStatus::Active,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let event = RealtimeEvent::AlertCreated(alert);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind());
        assert_eq!(json["data"]["upazila"], "Mirpur");
    }

    #[test]
    fn stream_params_use_camel_case() {
        let params: NotificationStreamParams = serde_json::from_str(r#"{"userId":"u1"}"#).unwrap();
        assert_eq!(params.user_id, "u1");
    }
}
