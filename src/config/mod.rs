//! Application configuration management

use std::env;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host (for generating URLs)
    pub host: Option<String>,

    /// Server port
    pub port: u16,

    /// SQLite database path (DATABASE_PATH, or DATABASE_URL with
    /// sqlite:// prefix)
    pub database_path: String,

    /// Whether the destructive demo reset is available at all
    pub reset_enabled: bool,

    /// Backup document restored by the demo reset
    pub reset_backup_path: String,

    /// Shift restored dates forward so the dataset ends "now"
    pub reset_adjust_timestamps: bool,

    /// Whether requests are authorized against the identity provider
    pub auth_enabled: bool,

    /// Identity provider base URL (required when auth is enabled)
    pub keycloak_url: Option<String>,

    /// Realm provisioned for this installation
    pub keycloak_realm: String,

    /// Public client the frontend authenticates with
    pub keycloak_client_id: String,

    /// Admin credentials for provisioning (and the initial realm user)
    pub keycloak_admin_user: Option<String>,
    pub keycloak_admin_password: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let database_path = env::var("DATABASE_PATH")
            .or_else(|_| env::var("DATABASE_URL"))
            .unwrap_or_else(|_| "./data/timekeeper.db".to_string());

        Ok(Self {
            host: env::var("HOST").ok(),

            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .context("Invalid PORT")?,

            database_path,

            reset_enabled: env::var("RESET_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),

            reset_backup_path: env::var("RESET_BACKUP_PATH")
                .unwrap_or_else(|_| "./data/backup.json".to_string()),

            reset_adjust_timestamps: env::var("RESET_ADJUST_TIMESTAMPS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),

            auth_enabled: env::var("AUTH_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),

            keycloak_url: env::var("KEYCLOAK_URL").ok(),

            keycloak_realm: env::var("KEYCLOAK_REALM")
                .unwrap_or_else(|_| "timekeeper".to_string()),

            keycloak_client_id: env::var("KEYCLOAK_CLIENT_ID")
                .unwrap_or_else(|_| "timekeeper-web".to_string()),

            keycloak_admin_user: env::var("KEYCLOAK_ADMIN_USER").ok(),

            keycloak_admin_password: env::var("KEYCLOAK_ADMIN_PASSWORD").ok(),
        })
    }
}
