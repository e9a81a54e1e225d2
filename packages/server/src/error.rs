//! Mapping of domain errors onto HTTP responses.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use khoj_database::DbError;
use khoj_incident_models::InvalidAreaError;
use khoj_server_models::ApiResponse;
use khoj_statistics::StatisticsError;

/// Errors returned by request handlers.
///
/// Every variant renders as `{success: false, error}`. Database failures
/// carry the underlying message unredacted.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request was missing or had malformed fields.
    #[error("{0}")]
    Validation(String),

    /// The addressed alert or report does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The store failed.
    #[error("{0}")]
    Internal(String),
}

impl From<InvalidAreaError> for ApiError {
    fn from(e: InvalidAreaError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<StatisticsError> for ApiError {
    fn from(e: StatisticsError) -> Self {
        if e.is_validation() {
            Self::Validation(e.to_string())
        } else {
            Self::Internal(e.to_string())
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let Self::Internal(message) = self {
            log::error!("Request failed: {message}");
        }
        HttpResponse::build(self.status_code()).json(ApiResponse::error(self.to_string()))
    }
}
