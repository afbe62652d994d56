//! Holiday entity
//!
//! Public holidays and vacation spans. Not referenced by other tables.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use super::{decode_offset, decode_utc, decode_uuid};
use crate::db::orm::{
    ColumnDef, Conditions, DatabaseEntity, DatabaseFilter, DatabaseSchema, DateFilter, FromSqlRow,
    RelationLoader, SqlValue, StringFilter, TrackedEntity,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Holiday {
    pub id: Uuid,
    pub title: String,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    /// Free-form kind marker, e.g. "PublicHoliday" or "Vacation"
    pub holiday_type: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Holiday {
    pub fn new(
        title: impl Into<String>,
        start_date: DateTime<FixedOffset>,
        end_date: DateTime<FixedOffset>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            title: title.into(),
            start_date,
            end_date,
            holiday_type: "PublicHoliday".to_string(),
            created: now,
            modified: now,
        }
    }
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef {
        name: "id",
        sql_type: "TEXT",
        nullable: false,
        is_primary_key: true,
        default: None,
        references: None,
    },
    ColumnDef {
        name: "title",
        sql_type: "TEXT",
        nullable: false,
        is_primary_key: false,
        default: None,
        references: None,
    },
    ColumnDef {
        name: "start_date",
        sql_type: "TEXT",
        nullable: false,
        is_primary_key: false,
        default: None,
        references: None,
    },
    ColumnDef {
        name: "end_date",
        sql_type: "TEXT",
        nullable: false,
        is_primary_key: false,
        default: None,
        references: None,
    },
    ColumnDef {
        name: "holiday_type",
        sql_type: "TEXT",
        nullable: false,
        is_primary_key: false,
        default: None,
        references: None,
    },
    ColumnDef {
        name: "created",
        sql_type: "TEXT",
        nullable: false,
        is_primary_key: false,
        default: None,
        references: None,
    },
    ColumnDef {
        name: "modified",
        sql_type: "TEXT",
        nullable: false,
        is_primary_key: false,
        default: None,
        references: None,
    },
];

impl DatabaseEntity for Holiday {
    const TABLE_NAME: &'static str = "holidays";
    const DEFAULT_SORT: &'static str = "title";

    fn column_names() -> &'static [&'static str] {
        &[
            "id",
            "title",
            "start_date",
            "end_date",
            "holiday_type",
            "created",
            "modified",
        ]
    }
}

impl DatabaseSchema for Holiday {
    fn columns() -> &'static [ColumnDef] {
        COLUMNS
    }
}

impl FromSqlRow for Holiday {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: decode_uuid(row, "id")?,
            title: row.try_get("title")?,
            start_date: decode_offset(row, "start_date")?,
            end_date: decode_offset(row, "end_date")?,
            holiday_type: row.try_get("holiday_type")?,
            created: decode_utc(row, "created")?,
            modified: decode_utc(row, "modified")?,
        })
    }
}

impl TrackedEntity for Holiday {
    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    fn stamp(&mut self, created: DateTime<Utc>, modified: DateTime<Utc>) {
        self.created = created;
        self.modified = modified;
    }

    fn bind_values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::id(&self.id),
            SqlValue::String(self.title.clone()),
            SqlValue::timestamp(&self.start_date),
            SqlValue::timestamp(&self.end_date),
            SqlValue::String(self.holiday_type.clone()),
            SqlValue::timestamp(&self.created),
            SqlValue::timestamp(&self.modified),
        ]
    }
}

#[async_trait]
impl RelationLoader for Holiday {
    async fn bulk_load_related(
        _rows: &mut [Self],
        _relations: &[String],
        _pool: &SqlitePool,
    ) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

#[derive(Default, Clone, Debug)]
pub struct HolidayFilter {
    pub title: Option<StringFilter>,
    pub start_date: Option<DateFilter>,
}

impl DatabaseFilter for HolidayFilter {
    fn to_sql_conditions(&self) -> (Vec<String>, Vec<SqlValue>) {
        let mut out = Conditions::default();
        if let Some(f) = &self.title {
            f.apply("title", &mut out);
        }
        if let Some(f) = &self.start_date {
            f.apply("start_date", &mut out);
        }
        out.into_parts()
    }

    fn is_empty(&self) -> bool {
        self.title.as_ref().is_none_or(StringFilter::is_empty)
            && self.start_date.as_ref().is_none_or(DateFilter::is_empty)
    }
}
