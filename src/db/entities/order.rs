//! Order entity
//!
//! A purchase order with a validity span and a budget, owned by one
//! customer. Time sheets may book against an order.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use super::{Customer, decode_offset, decode_utc, decode_uuid, load_by_ids, relation_requested};
use crate::db::orm::{
    BoolFilter, ColumnDef, Conditions, DatabaseEntity, DatabaseFilter, DatabaseSchema, DateFilter,
    FromSqlRow, IdFilter, RelationLoader, SqlValue, StringFilter, TrackedEntity,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Order {
    pub id: Uuid,
    pub title: String,
    /// Order number as printed on the customer's purchase order
    pub number: String,
    pub customer_id: Uuid,
    pub start_date: DateTime<FixedOffset>,
    pub due_date: DateTime<FixedOffset>,
    pub hourly_rate: f64,
    /// Budget in hours
    pub budget: f64,
    pub hidden: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,

    #[serde(skip)]
    pub customer: Option<Customer>,
}

impl Order {
    pub fn new(
        title: impl Into<String>,
        number: impl Into<String>,
        customer_id: Uuid,
        start_date: DateTime<FixedOffset>,
        due_date: DateTime<FixedOffset>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            title: title.into(),
            number: number.into(),
            customer_id,
            start_date,
            due_date,
            hourly_rate: 0.0,
            budget: 0.0,
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
        name: "number",
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
        name: "start_date",
        sql_type: "TEXT",
        nullable: false,
        is_primary_key: false,
        default: None,
        references: None,
    },
    ColumnDef {
        name: "due_date",
        sql_type: "TEXT",
        nullable: false,
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
        name: "budget",
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

impl DatabaseEntity for Order {
    const TABLE_NAME: &'static str = "orders";
    const DEFAULT_SORT: &'static str = "title";

    fn column_names() -> &'static [&'static str] {
        &[
            "id",
            "title",
            "number",
            "customer_id",
            "start_date",
            "due_date",
            "hourly_rate",
            "budget",
            "hidden",
            "created",
            "modified",
        ]
    }
}

impl DatabaseSchema for Order {
    fn columns() -> &'static [ColumnDef] {
        COLUMNS
    }
}

impl FromSqlRow for Order {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: decode_uuid(row, "id")?,
            title: row.try_get("title")?,
            number: row.try_get("number")?,
            customer_id: decode_uuid(row, "customer_id")?,
            start_date: decode_offset(row, "start_date")?,
            due_date: decode_offset(row, "due_date")?,
            hourly_rate: row.try_get("hourly_rate")?,
            budget: row.try_get("budget")?,
            hidden: row.try_get("hidden")?,
            created: decode_utc(row, "created")?,
            modified: decode_utc(row, "modified")?,
            customer: None,
        })
    }
}

impl TrackedEntity for Order {
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
            SqlValue::id(&self.customer_id),
            SqlValue::timestamp(&self.start_date),
            SqlValue::timestamp(&self.due_date),
            SqlValue::Float(self.hourly_rate),
            SqlValue::Float(self.budget),
            SqlValue::Bool(self.hidden),
            SqlValue::timestamp(&self.created),
            SqlValue::timestamp(&self.modified),
        ]
    }
}

#[async_trait]
impl RelationLoader for Order {
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
pub struct OrderFilter {
    pub title: Option<StringFilter>,
    pub number: Option<StringFilter>,
    pub customer_id: Option<IdFilter>,
    pub start_date: Option<DateFilter>,
    pub hidden: Option<BoolFilter>,
}

impl DatabaseFilter for OrderFilter {
    fn to_sql_conditions(&self) -> (Vec<String>, Vec<SqlValue>) {
        let mut out = Conditions::default();
        if let Some(f) = &self.title {
            f.apply("title", &mut out);
        }
        if let Some(f) = &self.number {
            f.apply("number", &mut out);
        }
        if let Some(f) = &self.customer_id {
            f.apply("customer_id", &mut out);
        }
        if let Some(f) = &self.start_date {
            f.apply("start_date", &mut out);
        }
        if let Some(f) = &self.hidden {
            f.apply("hidden", &mut out);
        }
        out.into_parts()
    }

    fn is_empty(&self) -> bool {
        self.title.as_ref().is_none_or(StringFilter::is_empty)
            && self.number.as_ref().is_none_or(StringFilter::is_empty)
            && self.customer_id.as_ref().is_none_or(IdFilter::is_empty)
            && self.start_date.as_ref().is_none_or(DateFilter::is_empty)
            && self.hidden.as_ref().is_none_or(BoolFilter::is_empty)
    }
}
