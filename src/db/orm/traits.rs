//! Core traits for the database ORM layer
//!
//! Each entity in `crate::db::entities` implements these by hand; the
//! query builder and repository are generic over them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

/// Column definition for schema generation.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Column name in the database
    pub name: &'static str,
    /// SQLite column type (TEXT, INTEGER, REAL, BLOB)
    pub sql_type: &'static str,
    /// Whether the column can be NULL
    pub nullable: bool,
    /// Whether this is the primary key
    pub is_primary_key: bool,
    /// Default value expression (e.g., "datetime('now')")
    pub default: Option<&'static str>,
    /// Referenced table and column (e.g., "customers(id)").
    /// Referenced rows are delete-restricted, never cascaded.
    pub references: Option<&'static str>,
}

impl ColumnDef {
    /// Generate the column definition SQL
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);

        if self.is_primary_key {
            sql.push_str(" PRIMARY KEY");
        }

        if !self.nullable && !self.is_primary_key {
            sql.push_str(" NOT NULL");
        }

        if let Some(default) = self.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }

        if let Some(target) = self.references {
            sql.push_str(&format!(" REFERENCES {} ON DELETE RESTRICT", target));
        }

        sql
    }
}

/// Trait for database schema generation and migration.
pub trait DatabaseSchema: DatabaseEntity {
    /// Get all column definitions for this entity's table
    fn columns() -> &'static [ColumnDef];

    /// Generate CREATE TABLE IF NOT EXISTS SQL
    fn create_table_sql() -> String {
        let column_defs: Vec<String> = Self::columns().iter().map(|c| c.to_sql()).collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            Self::TABLE_NAME,
            column_defs.join(",\n  ")
        )
    }

    /// Get column names that exist in the entity definition
    fn defined_column_names() -> Vec<&'static str> {
        Self::columns().iter().map(|c| c.name).collect()
    }
}

/// Metadata about a database entity (table).
pub trait DatabaseEntity: Sized + Send + Sync {
    /// The SQL table name (e.g., "customers")
    const TABLE_NAME: &'static str;

    /// The primary key column name
    const PRIMARY_KEY: &'static str = "id";

    /// Default sort column for list queries (e.g., "title")
    const DEFAULT_SORT: &'static str;

    /// Default sort direction
    const DEFAULT_SORT_DIR: &'static str = "ASC";

    /// List of all column names in the table
    fn column_names() -> &'static [&'static str];

    /// Build a SELECT query for all columns
    fn select_sql(distinct: bool) -> String {
        let columns = Self::column_names().join(", ");
        if distinct {
            format!("SELECT DISTINCT {} FROM {}", columns, Self::TABLE_NAME)
        } else {
            format!("SELECT {} FROM {}", columns, Self::TABLE_NAME)
        }
    }
}

/// Trait for applying filters to a SQL query.
///
/// Implemented by the per-entity `*Filter` structs.
pub trait DatabaseFilter: Send + Sync {
    /// Apply this filter to a query builder, returning the WHERE clause fragments
    /// and the values to bind.
    fn to_sql_conditions(&self) -> (Vec<String>, Vec<SqlValue>);

    /// Check if the filter has any conditions
    fn is_empty(&self) -> bool;
}

/// Trait for applying sort order to a SQL query.
pub trait DatabaseOrderBy: Send + Sync {
    /// Get the ORDER BY clause fragment (e.g., "title ASC, created DESC")
    fn to_sql_order(&self) -> Option<String>;
}

/// Trait for decoding a database row into an entity.
pub trait FromSqlRow: Sized {
    /// Decode a SQLite row into this entity type
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error>;
}

/// Trait for rows whose identifier and audit stamps are maintained by the
/// repository.
///
/// `add` assigns a fresh id when the current one is nil and stamps
/// `created == modified`; `update` advances `modified` and leaves `created`
/// alone. `bind_values` must yield one value per column, in
/// [DatabaseEntity::column_names] order.
pub trait TrackedEntity: DatabaseEntity {
    fn id(&self) -> Uuid;

    fn assign_id(&mut self, id: Uuid);

    fn created(&self) -> DateTime<Utc>;

    fn modified(&self) -> DateTime<Utc>;

    /// Set both audit stamps.
    fn stamp(&mut self, created: DateTime<Utc>, modified: DateTime<Utc>);

    /// All column values in [DatabaseEntity::column_names] order.
    fn bind_values(&self) -> Vec<SqlValue>;
}

/// Trait for eagerly loading related entities requested via
/// [EntityQuery::include](super::EntityQuery::include).
///
/// Loads relations for a batch of rows with one query per relation type
/// to avoid N+1 queries. Relation names are matched case-insensitively.
#[async_trait]
pub trait RelationLoader: Sized + Send + Sync {
    async fn bulk_load_related(
        rows: &mut [Self],
        relations: &[String],
        pool: &SqlitePool,
    ) -> Result<(), sqlx::Error>;
}

/// Sort direction for ORDER BY clauses.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum OrderDirection {
    /// Ascending order (A-Z, 1-9, oldest-newest)
    #[default]
    Asc,
    /// Descending order (Z-A, 9-1, newest-oldest)
    Desc,
}

impl OrderDirection {
    /// Convert to SQL order string
    pub fn to_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// Represents a SQL value that can be bound to a query.
///
/// Used by filters and staged writes to collect values for parameterized
/// queries.
#[derive(Debug, Clone)]
pub enum SqlValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl SqlValue {
    /// Bind this value to a sqlx query builder
    pub fn bind_to<'q>(
        &'q self,
        query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        match self {
            SqlValue::String(s) => query.bind(s.as_str()),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Bool(b) => query.bind(if *b { 1i32 } else { 0i32 }),
            SqlValue::Null => query.bind(None::<String>),
        }
    }

    /// Render a timestamp as a bindable TEXT value (RFC 3339).
    pub fn timestamp<Tz: chrono::TimeZone>(value: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        SqlValue::String(value.to_rfc3339())
    }

    /// Render an optional timestamp, binding NULL when absent.
    pub fn timestamp_opt<Tz: chrono::TimeZone>(value: &Option<DateTime<Tz>>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        match value {
            Some(v) => Self::timestamp(v),
            None => SqlValue::Null,
        }
    }

    /// Render an identifier as a bindable TEXT value.
    pub fn id(value: &Uuid) -> Self {
        SqlValue::String(value.to_string())
    }

    /// Render an optional identifier, binding NULL when absent.
    pub fn id_opt(value: &Option<Uuid>) -> Self {
        match value {
            Some(v) => Self::id(v),
            None => SqlValue::Null,
        }
    }

    /// Render an optional string, binding NULL when absent.
    pub fn text_opt(value: &Option<String>) -> Self {
        match value {
            Some(v) => SqlValue::String(v.clone()),
            None => SqlValue::Null,
        }
    }
}
