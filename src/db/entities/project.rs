//! Project entity

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use super::{Customer, decode_utc, decode_uuid, load_by_ids, relation_requested};
use crate::db::orm::{
    BoolFilter, ColumnDef, Conditions, DatabaseEntity, DatabaseFilter, DatabaseSchema, FromSqlRow,
    IdFilter, RelationLoader, SqlValue, StringFilter, TrackedEntity,
};

/// A project belonging to exactly one customer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub customer_id: Uuid,
    pub hidden: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,

    /// Eagerly loaded owning customer, populated via `include("Customer")`
    #[serde(skip)]
    pub customer: Option<Customer>,
}

impl Project {
    pub fn new(title: impl Into<String>, customer_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            title: title.into(),
            customer_id,
            hidden: false,
            created: now,
            modified: now,
            customer: None,
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
        name: "customer_id",
        sql_type: "TEXT",
        nullable: false,
        is_primary_key: false,
        default: None,
        references: Some("customers(id)"),
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

impl DatabaseEntity for Project {
    const TABLE_NAME: &'static str = "projects";
    const DEFAULT_SORT: &'static str = "title";

    fn column_names() -> &'static [&'static str] {
        &["id", "title", "customer_id", "hidden", "created", "modified"]
    }
}

impl DatabaseSchema for Project {
    fn columns() -> &'static [ColumnDef] {
        COLUMNS
    }
}

impl FromSqlRow for Project {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: decode_uuid(row, "id")?,
            title: row.try_get("title")?,
            customer_id: decode_uuid(row, "customer_id")?,
            hidden: row.try_get("hidden")?,
            created: decode_utc(row, "created")?,
            modified: decode_utc(row, "modified")?,
            customer: None,
        })
    }
}

impl TrackedEntity for Project {
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
            SqlValue::id(&self.customer_id),
            SqlValue::Bool(self.hidden),
            SqlValue::timestamp(&self.created),
            SqlValue::timestamp(&self.modified),
        ]
    }
}

#[async_trait]
impl RelationLoader for Project {
    async fn bulk_load_related(
        rows: &mut [Self],
        relations: &[String],
        pool: &SqlitePool,
    ) -> Result<(), sqlx::Error> {
        if relation_requested(relations, "customer") {
            let ids = rows.iter().map(|r| r.customer_id).collect();
            let customers = load_by_ids::<Customer>(pool, ids).await?;
            for row in rows {
                row.customer = customers.get(&row.customer_id).cloned();
            }
        }
        Ok(())
    }
}

#[derive(Default, Clone, Debug)]
pub struct ProjectFilter {
    pub title: Option<StringFilter>,
    pub customer_id: Option<IdFilter>,
    pub hidden: Option<BoolFilter>,
}

impl DatabaseFilter for ProjectFilter {
    fn to_sql_conditions(&self) -> (Vec<String>, Vec<SqlValue>) {
        let mut out = Conditions::default();
        if let Some(f) = &self.title {
            f.apply("title", &mut out);
        }
        if let Some(f) = &self.customer_id {
            f.apply("customer_id", &mut out);
        }
        if let Some(f) = &self.hidden {
            f.apply("hidden", &mut out);
        }
        out.into_parts()
    }

    fn is_empty(&self) -> bool {
        self.title.as_ref().is_none_or(StringFilter::is_empty)
            && self.customer_id.as_ref().is_none_or(IdFilter::is_empty)
            && self.hidden.as_ref().is_none_or(BoolFilter::is_empty)
    }
}
