//! Automatic schema synchronization from entity definitions
//!
//! ORM-like auto-migration, run at startup:
//! - Compares entity definitions to the current database schema
//! - Creates missing tables automatically
//! - Adds missing columns automatically
//! - Does NOT handle column renames or type changes (requires DB wipe)
//!
//! The same entity definitions feed the schema fingerprint
//! ([model_hash]) that gates data import: a dataset exported under one
//! schema shape can only be loaded into a database with the identical
//! shape.

use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::db::entities::{Activity, Customer, Holiday, Order, Project, Setting, TimeSheet};
use crate::db::orm::{ColumnDef, DatabaseSchema};

/// Result of a schema sync operation
#[derive(Debug, Default)]
pub struct SchemaSyncResult {
    pub tables_created: Vec<String>,
    pub columns_added: Vec<(String, String)>, // (table, column)
    pub errors: Vec<String>,
}

/// Check if a table exists in the database
async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool, sqlx::Error> {
    let result: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table_name)
            .fetch_optional(pool)
            .await?;

    Ok(result.is_some())
}

/// Get existing columns for a table
async fn get_table_columns(
    pool: &SqlitePool,
    table_name: &str,
) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(i32, String, String, i32, Option<String>, i32)> =
        sqlx::query_as(&format!("PRAGMA table_info({})", table_name))
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|(_, name, _, _, _, _)| name).collect())
}

/// Sync a single entity's table to the database
pub async fn sync_entity<E: DatabaseSchema>(
    pool: &SqlitePool,
) -> Result<SchemaSyncResult, sqlx::Error> {
    let mut result = SchemaSyncResult::default();
    let table_name = E::TABLE_NAME;

    if !table_exists(pool, table_name).await? {
        let create_sql = E::create_table_sql();
        debug!("Creating table {}: {}", table_name, create_sql);

        match sqlx::query(&create_sql).execute(pool).await {
            Ok(_) => {
                info!("Created table: {}", table_name);
                result.tables_created.push(table_name.to_string());
            }
            Err(e) => {
                let msg = format!("Failed to create table {}: {}", table_name, e);
                warn!("{}", msg);
                result.errors.push(msg);
            }
        }
    } else {
        // Table exists, check for missing columns
        let existing_columns = get_table_columns(pool, table_name).await?;
        let defined_columns = E::columns();

        for col_def in defined_columns {
            if !existing_columns.iter().any(|c| c == col_def.name) {
                let alter_sql = generate_add_column_sql(table_name, col_def);
                debug!("Adding column to {}: {}", table_name, alter_sql);

                match sqlx::query(&alter_sql).execute(pool).await {
                    Ok(_) => {
                        info!("Added column {}.{}", table_name, col_def.name);
                        result
                            .columns_added
                            .push((table_name.to_string(), col_def.name.to_string()));
                    }
                    Err(e) => {
                        let msg = format!(
                            "Failed to add column {}.{}: {}",
                            table_name, col_def.name, e
                        );
                        warn!("{}", msg);
                        result.errors.push(msg);
                    }
                }
            }
        }
    }

    Ok(result)
}

/// Generate ALTER TABLE ADD COLUMN SQL
fn generate_add_column_sql(table_name: &str, col: &ColumnDef) -> String {
    let mut sql = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        table_name, col.name, col.sql_type
    );

    // Note: SQLite has restrictions on ALTER TABLE ADD COLUMN:
    // - Cannot add PRIMARY KEY columns
    // - Cannot add NOT NULL columns without a default
    // - Cannot add UNIQUE columns

    if let Some(target) = col.references {
        sql.push_str(&format!(" REFERENCES {} ON DELETE RESTRICT", target));
    }

    if let Some(default) = col.default {
        sql.push_str(&format!(" DEFAULT {}", default));
    } else if !col.nullable {
        // If NOT NULL without default, we must provide a default for SQLite
        let default_val = match col.sql_type {
            "TEXT" => "''",
            "INTEGER" => "0",
            "REAL" => "0.0",
            _ => "''",
        };
        sql.push_str(&format!(" NOT NULL DEFAULT {}", default_val));
    }

    sql
}

/// Sync all entity tables to the database.
///
/// Called at startup to ensure all entity tables exist and have the
/// correct columns. Parents are synced before children so foreign keys
/// resolve.
pub async fn sync_all_entity_schemas(pool: &SqlitePool) -> SchemaSyncResult {
    let mut total_result = SchemaSyncResult::default();

    // Helper macro to reduce boilerplate
    macro_rules! sync_one {
        ($entity:ty) => {
            match sync_entity::<$entity>(pool).await {
                Ok(result) => {
                    total_result.tables_created.extend(result.tables_created);
                    total_result.columns_added.extend(result.columns_added);
                    total_result.errors.extend(result.errors);
                }
                Err(e) => {
                    total_result.errors.push(format!(
                        "Error syncing {}: {}",
                        stringify!($entity),
                        e
                    ));
                }
            }
        };
    }

    sync_one!(Setting);
    sync_one!(Holiday);
    sync_one!(Customer);
    sync_one!(Project);
    sync_one!(Activity);
    sync_one!(Order);
    sync_one!(TimeSheet);

    total_result
}

/// The full schema description: every entity's CREATE TABLE statement in
/// fixed dependency order. This is the input to [model_hash].
pub fn schema_description() -> String {
    [
        Setting::create_table_sql(),
        Holiday::create_table_sql(),
        Customer::create_table_sql(),
        Project::create_table_sql(),
        Activity::create_table_sql(),
        Order::create_table_sql(),
        TimeSheet::create_table_sql(),
    ]
    .join("\n")
}

/// Stable fingerprint of the database schema: lowercase hex SHA-256 of
/// the schema description with line endings normalized, so the same
/// entity definitions hash identically across platforms.
pub fn model_hash() -> String {
    let normalized = schema_description().replace("\r\n", "\n");
    let digest = Sha256::digest(normalized.as_bytes());
    format!("{:x}", digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_hash_is_stable() {
        assert_eq!(model_hash(), model_hash());
        assert_eq!(model_hash().len(), 64);
    }

    #[test]
    fn schema_description_lists_every_table() {
        let description = schema_description();
        for table in [
            "settings",
            "holidays",
            "customers",
            "projects",
            "activities",
            "orders",
            "time_sheets",
        ] {
            assert!(
                description.contains(&format!("CREATE TABLE IF NOT EXISTS {}", table)),
                "missing table {}",
                table
            );
        }
    }

    #[test]
    fn foreign_keys_are_delete_restricted() {
        let sql = TimeSheet::create_table_sql();
        assert!(sql.contains("REFERENCES customers(id) ON DELETE RESTRICT"));
        assert!(sql.contains("REFERENCES activities(id) ON DELETE RESTRICT"));
    }
}
