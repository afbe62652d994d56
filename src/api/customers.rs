//! Customer list endpoint

use axum::extract::{Query, State};
use axum::{Json, Router, routing::get};
use serde::Deserialize;

use super::ApiError;
use crate::app::AppState;
use crate::db::entities::{Customer, CustomerFilter};
use crate::db::orm::{BoolFilter, EntityQuery, OrderBy, StringFilter};

#[derive(Deserialize, Default)]
pub struct CustomerListParams {
    /// Substring match on the customer title
    pub search: Option<String>,
    /// Include hidden customers (default: visible only)
    pub show_hidden: Option<bool>,
}

async fn list(
    State(state): State<AppState>,
    Query(params): Query<CustomerListParams>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let filter = CustomerFilter {
        title: params.search.map(StringFilter::contains),
        hidden: match params.show_hidden {
            Some(true) => None,
            _ => Some(BoolFilter::is_false()),
        },
        ..Default::default()
    };

    let rows = state
        .db
        .customers()
        .get(
            EntityQuery::new()
                .filter(&filter)
                .order_by(&OrderBy::asc("title")),
        )
        .await?;
    Ok(Json(rows))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/customers", get(list))
}
