//! Dataset export/import endpoints

use axum::extract::{Query, State};
use axum::{Json, Router, routing::get, routing::post};
use serde::Serialize;

use super::ApiError;
use crate::app::AppState;
use crate::services::{DatabaseExport, ExportRange, ExportService};

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImportResponse {
    pub time_sheets: usize,
    pub customers: usize,
}

/// Export the whole dataset, optionally narrowed to a date range.
async fn export(
    State(state): State<AppState>,
    Query(range): Query<ExportRange>,
) -> Result<Json<DatabaseExport>, ApiError> {
    let document = ExportService::new(state.db.clone())
        .export(Some(range))
        .await?;
    Ok(Json(document))
}

/// Replace the whole dataset with the posted document. Rejected with 400
/// when the document's schema fingerprint doesn't match this database.
async fn import(
    State(state): State<AppState>,
    Json(document): Json<DatabaseExport>,
) -> Result<Json<ImportResponse>, ApiError> {
    let response = ImportResponse {
        time_sheets: document.time_sheets.len(),
        customers: document.customers.len(),
    };
    ExportService::new(state.db.clone()).import(document).await?;
    Ok(Json(response))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/export", get(export))
        .route("/import", post(import))
}
