//! Database connection and operations

pub mod entities;
pub mod orm;
pub mod schema_sync;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use entities::{Activity, Customer, Holiday, Order, Project, Setting, TimeSheet};
use orm::{ChangeTracker, DbRepository, TransactionScope};
use schema_sync::SchemaSyncResult;

/// Database wrapper providing connection pool access and the typed
/// repositories. All repositories created from one wrapper share a
/// single staged unit-of-work.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    tracker: Arc<ChangeTracker>,
}

impl Database {
    /// Create a new database wrapper from an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            tracker: Arc::new(ChangeTracker::new()),
        }
    }

    /// Get the maximum connection pool size from environment or default
    fn get_max_connections() -> u32 {
        std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10)
    }

    fn connect_options(path: &str) -> Result<SqliteConnectOptions> {
        // Accept both a bare path and a sqlite:// URL
        let options = if path.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(path)?
        } else {
            SqliteConnectOptions::new().filename(path)
        };
        Ok(options
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5)))
    }

    /// Create a new database connection pool
    pub async fn connect(path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(Self::get_max_connections())
            .connect_with(Self::connect_options(path)?)
            .await?;

        Ok(Self::new(pool))
    }

    /// Create a new database connection pool with retry logic
    /// Retries every `retry_interval` until successful
    pub async fn connect_with_retry(path: &str, retry_interval: Duration) -> Self {
        loop {
            match Self::connect(path).await {
                Ok(db) => {
                    return db;
                }
                Err(e) => {
                    tracing::error!(
                        "Database connection failed: {}. Retrying in {} seconds...",
                        e,
                        retry_interval.as_secs()
                    );
                    tokio::time::sleep(retry_interval).await;
                }
            }
        }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get a settings repository
    pub fn settings(&self) -> DbRepository<Setting> {
        DbRepository::new(self.pool.clone(), self.tracker.clone())
    }

    /// Get a holidays repository
    pub fn holidays(&self) -> DbRepository<Holiday> {
        DbRepository::new(self.pool.clone(), self.tracker.clone())
    }

    /// Get a customers repository
    pub fn customers(&self) -> DbRepository<Customer> {
        DbRepository::new(self.pool.clone(), self.tracker.clone())
    }

    /// Get a projects repository
    pub fn projects(&self) -> DbRepository<Project> {
        DbRepository::new(self.pool.clone(), self.tracker.clone())
    }

    /// Get an activities repository
    pub fn activities(&self) -> DbRepository<Activity> {
        DbRepository::new(self.pool.clone(), self.tracker.clone())
    }

    /// Get an orders repository
    pub fn orders(&self) -> DbRepository<Order> {
        DbRepository::new(self.pool.clone(), self.tracker.clone())
    }

    /// Get a time sheets repository
    pub fn time_sheets(&self) -> DbRepository<TimeSheet> {
        DbRepository::new(self.pool.clone(), self.tracker.clone())
    }

    /// Begin a transaction scope. Work runs on the scope's connection and
    /// persists only if the scope is explicitly completed.
    pub async fn begin_scope(&self) -> Result<TransactionScope, sqlx::Error> {
        Ok(TransactionScope::new(self.pool.begin().await?))
    }

    /// Fingerprint of the current schema shape, used to gate data import.
    pub fn model_hash(&self) -> String {
        schema_sync::model_hash()
    }

    /// Create or migrate all entity tables
    pub async fn sync_schemas(&self) -> SchemaSyncResult {
        schema_sync::sync_all_entity_schemas(&self.pool).await
    }
}
