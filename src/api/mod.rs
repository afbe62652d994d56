//! API route definitions
//!
//! Thin REST adapters over the repository layer and the workflow
//! services; all semantics live below this layer.

pub mod backup;
pub mod configuration;
pub mod customers;
pub mod health;
pub mod time_sheets;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::app::AppState;
use crate::services::ExportError;

/// Build the /api router
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/health", health::router())
        .merge(configuration::router())
        .merge(backup::router())
        .merge(customers::router())
        .merge(time_sheets::router())
}

/// Error envelope returned by the REST handlers.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Storage error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage error")
    }
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::SchemaMismatch { .. } => {
                Self::new(StatusCode::BAD_REQUEST, e.to_string())
            }
            ExportError::Storage(inner) => inner.into(),
        }
    }
}
