//! Entity definitions
//!
//! One module per table. Every entity carries an `id` plus `created` /
//! `modified` audit stamps maintained by the repository, implements the
//! ORM traits by hand, and ships a `*Filter` struct for query
//! composition. Date ranges are local time + UTC offset, persisted as
//! RFC 3339 TEXT.

pub mod activity;
pub mod customer;
pub mod holiday;
pub mod order;
pub mod project;
pub mod setting;
pub mod time_sheet;

pub use activity::{Activity, ActivityFilter};
pub use customer::{Customer, CustomerFilter};
pub use holiday::{Holiday, HolidayFilter};
pub use order::{Order, OrderFilter};
pub use project::{Project, ProjectFilter};
pub use setting::{Setting, SettingFilter};
pub use time_sheet::{TimeSheet, TimeSheetFilter};

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::orm::{FromSqlRow, TrackedEntity};

fn decode_error(column: &str, source: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

pub(crate) fn decode_uuid(row: &SqliteRow, column: &str) -> Result<Uuid, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(|e| decode_error(column, e))
}

pub(crate) fn decode_uuid_opt(row: &SqliteRow, column: &str) -> Result<Option<Uuid>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|v| Uuid::parse_str(&v).map_err(|e| decode_error(column, e)))
        .transpose()
}

pub(crate) fn decode_utc(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|v| v.with_timezone(&Utc))
        .map_err(|e| decode_error(column, e))
}

pub(crate) fn decode_offset(
    row: &SqliteRow,
    column: &str,
) -> Result<DateTime<FixedOffset>, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw).map_err(|e| decode_error(column, e))
}

pub(crate) fn decode_offset_opt(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<DateTime<FixedOffset>>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|v| DateTime::parse_from_rfc3339(&v).map_err(|e| decode_error(column, e)))
        .transpose()
}

pub(crate) fn relation_requested(relations: &[String], name: &str) -> bool {
    relations.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// Load a batch of parent rows by primary key, keyed for assignment to
/// their referencing children. One query per relation type, no N+1.
pub(crate) async fn load_by_ids<P>(
    pool: &SqlitePool,
    mut ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, P>, sqlx::Error>
where
    P: TrackedEntity + FromSqlRow,
{
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "{} WHERE {} IN ({})",
        P::select_sql(false),
        P::PRIMARY_KEY,
        placeholders
    );

    let mut query = sqlx::query(&sql);
    for id in &ids {
        query = query.bind(id.to_string());
    }

    let rows = query.fetch_all(pool).await?;
    let mut map = HashMap::with_capacity(rows.len());
    for row in &rows {
        let parent = P::from_row(row)?;
        map.insert(parent.id(), parent);
    }
    Ok(map)
}
