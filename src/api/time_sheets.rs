//! Time sheet list endpoint

use axum::extract::{Query, State};
use axum::{Json, Router, routing::get};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use uuid::Uuid;

use super::ApiError;
use crate::app::AppState;
use crate::db::entities::{TimeSheet, TimeSheetFilter};
use crate::db::orm::{DateFilter, EntityQuery, IdFilter, OrderBy};

#[derive(Deserialize, Default)]
pub struct TimeSheetListParams {
    pub customer_id: Option<Uuid>,
    pub from: Option<DateTime<FixedOffset>>,
    pub to: Option<DateTime<FixedOffset>>,
}

async fn list(
    State(state): State<AppState>,
    Query(params): Query<TimeSheetListParams>,
) -> Result<Json<Vec<TimeSheet>>, ApiError> {
    let date_range = match (params.from, params.to) {
        (None, None) => None,
        (from, to) => Some(DateFilter {
            gte: from,
            lte: to,
            ..Default::default()
        }),
    };
    let filter = TimeSheetFilter {
        customer_id: params.customer_id.map(IdFilter::eq),
        start_date: date_range,
        ..Default::default()
    };

    let rows = state
        .db
        .time_sheets()
        .get(
            EntityQuery::new()
                .filter(&filter)
                .order_by(&OrderBy::date_asc("start_date")),
        )
        .await?;
    Ok(Json(rows))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/timesheets", get(list))
}
