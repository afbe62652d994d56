//! Client configuration endpoint
//!
//! What a frontend needs to boot: whether authorization is enforced and
//! which identity provider realm/client to authenticate against.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::app::AppState;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientConfiguration {
    pub authorization_enabled: bool,
    pub keycloak_url: Option<String>,
    pub keycloak_realm: String,
    pub keycloak_client_id: String,
}

async fn configuration(State(state): State<AppState>) -> Json<ClientConfiguration> {
    Json(ClientConfiguration {
        authorization_enabled: state.config.auth_enabled,
        keycloak_url: state.config.keycloak_url.clone(),
        keycloak_realm: state.config.keycloak_realm.clone(),
        keycloak_client_id: state.config.keycloak_client_id.clone(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/configuration", get(configuration))
}
