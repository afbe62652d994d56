//! Customer entity

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use super::{decode_utc, decode_uuid};
use crate::db::orm::{
    BoolFilter, ColumnDef, Conditions, DatabaseEntity, DatabaseFilter, DatabaseSchema, FromSqlRow,
    RelationLoader, SqlValue, StringFilter, TrackedEntity,
};

/// A customer work is billed to. Referenced by projects, orders and time
/// sheets; deletion is restricted while any of those exist.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Customer {
    pub id: Uuid,
    pub title: String,
    /// Customer number used on invoices
    pub number: String,
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub department: Option<String>,
    pub hourly_rate: f64,
    /// Hidden customers are kept for bookkeeping but left out of pickers
    pub hidden: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Customer {
    pub fn new(title: impl Into<String>, number: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            title: title.into(),
            number: number.into(),
            company_name: None,
            contact_name: None,
            department: None,
            hourly_rate: 0.0,
            hidden: false,
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
        name: "number",
        sql_type: "TEXT",
        nullable: false,
        is_primary_key: false,
        default: None,
        references: None,
    },
    ColumnDef {
        name: "company_name",
        sql_type: "TEXT",
        nullable: true,
        is_primary_key: false,
        default: None,
        references: None,
    },
    ColumnDef {
        name: "contact_name",
        sql_type: "TEXT",
        nullable: true,
        is_primary_key: false,
        default: None,
        references: None,
    },
    ColumnDef {
        name: "department",
        sql_type: "TEXT",
        nullable: true,
        is_primary_key: false,
        default: None,
        references: None,
    },
    ColumnDef {
        name: "hourly_rate",
        sql_type: "REAL",
        nullable: false,
        is_primary_key: false,
        default: Some("0"),
        references: None,
    },
    ColumnDef {
        name: "hidden",
        sql_type: "INTEGER",
        nullable: false,
        is_primary_key: false,
        default: Some("0"),
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

impl DatabaseEntity for Customer {
    const TABLE_NAME: &'static str = "customers";
    const DEFAULT_SORT: &'static str = "title";

    fn column_names() -> &'static [&'static str] {
        &[
            "id",
            "title",
            "number",
            "company_name",
            "contact_name",
            "department",
            "hourly_rate",
            "hidden",
            "created",
            "modified",
        ]
    }
}

impl DatabaseSchema for Customer {
    fn columns() -> &'static [ColumnDef] {
        COLUMNS
    }
}

impl FromSqlRow for Customer {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: decode_uuid(row, "id")?,
            title: row.try_get("title")?,
            number: row.try_get("number")?,
            company_name: row.try_get("company_name")?,
            contact_name: row.try_get("contact_name")?,
            department: row.try_get("department")?,
            hourly_rate: row.try_get("hourly_rate")?,
            hidden: row.try_get("hidden")?,
            created: decode_utc(row, "created")?,
            modified: decode_utc(row, "modified")?,
        })
    }
}

impl TrackedEntity for Customer {
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
            SqlValue::String(self.number.clone()),
            SqlValue::text_opt(&self.company_name),
            SqlValue::text_opt(&self.contact_name),
            SqlValue::text_opt(&self.department),
            SqlValue::Float(self.hourly_rate),
            SqlValue::Bool(self.hidden),
            SqlValue::timestamp(&self.created),
            SqlValue::timestamp(&self.modified),
        ]
    }
}

#[async_trait]
impl RelationLoader for Customer {
    async fn bulk_load_related(
        _rows: &mut [Self],
        _relations: &[String],
        _pool: &SqlitePool,
    ) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

/// Filter for customer queries
#[derive(Default, Clone, Debug)]
pub struct CustomerFilter {
    pub title: Option<StringFilter>,
    pub number: Option<StringFilter>,
    pub hidden: Option<BoolFilter>,
}

impl DatabaseFilter for CustomerFilter {
    fn to_sql_conditions(&self) -> (Vec<String>, Vec<SqlValue>) {
        let mut out = Conditions::default();
        if let Some(f) = &self.title {
            f.apply("title", &mut out);
        }
        if let Some(f) = &self.number {
            f.apply("number", &mut out);
        }
        if let Some(f) = &self.hidden {
            f.apply("hidden", &mut out);
        }
        out.into_parts()
    }

    fn is_empty(&self) -> bool {
        self.title.as_ref().is_none_or(StringFilter::is_empty)
            && self.number.as_ref().is_none_or(StringFilter::is_empty)
            && self.hidden.as_ref().is_none_or(BoolFilter::is_empty)
    }
}
