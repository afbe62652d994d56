//! Timekeeper Backend - time-tracking service
//!
//! Entry point: loads configuration, connects and migrates the
//! database, provisions the identity provider when authorization is
//! enabled, starts the background scheduler and serves the REST API.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use timekeeper::app::{AppState, build_app};
use timekeeper::config::Config;
use timekeeper::db::Database;
use timekeeper::jobs;
use timekeeper::services::{KeycloakClient, ProvisioningService, ResetService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env()?);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timekeeper=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Timekeeper Backend");

    let db = Database::connect(&config.database_path).await?;
    let sync_result = db.sync_schemas().await;
    tracing::info!(
        tables_created = sync_result.tables_created.len(),
        columns_added = sync_result.columns_added.len(),
        "Database schema synced"
    );
    for error in &sync_result.errors {
        tracing::warn!("Schema sync: {}", error);
    }

    // Provision the identity provider when authorization is enabled
    if config.auth_enabled {
        if let Some(url) = &config.keycloak_url {
            let admin_credentials = config
                .keycloak_admin_user
                .clone()
                .zip(config.keycloak_admin_password.clone());
            let client = match &admin_credentials {
                Some((user, password)) => {
                    Arc::new(KeycloakClient::new(url.clone(), user.clone(), password.clone()))
                }
                None => Arc::new(KeycloakClient::new(url.clone(), "admin", "admin")),
            };
            let provisioning = ProvisioningService::new(
                client,
                config.keycloak_realm.clone(),
                config.keycloak_client_id.clone(),
                admin_credentials,
            );
            if let Err(e) = provisioning.provision().await {
                tracing::warn!(error = %e, "Identity provisioning failed - authorization may not work");
            }
        } else {
            tracing::warn!("AUTH_ENABLED is set but KEYCLOAK_URL is missing");
        }
    }

    let reset_service = Arc::new(ResetService::new(db.clone(), &config));
    if config.reset_enabled {
        // Bring the demo dataset up to date before serving
        if let Err(e) = reset_service.reset().await {
            tracing::error!(error = %e, "Initial database reset failed");
        }
    }
    let _scheduler = jobs::start_scheduler(reset_service).await?;

    let state = AppState {
        config: config.clone(),
        db,
    };
    let app = build_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
