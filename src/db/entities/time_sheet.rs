//! TimeSheet entity
//!
//! One booked span of work. Customer and activity are required; project
//! and order are optional. `end_date` is empty while the entry is still
//! running.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use super::{
    Activity, Customer, Order, Project, decode_offset, decode_offset_opt, decode_utc, decode_uuid,
    decode_uuid_opt, load_by_ids, relation_requested,
};
use crate::db::orm::{
    BoolFilter, ColumnDef, Conditions, DatabaseEntity, DatabaseFilter, DatabaseSchema, DateFilter,
    FromSqlRow, IdFilter, RelationLoader, SqlValue, TrackedEntity,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimeSheet {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub project_id: Option<Uuid>,
    pub activity_id: Uuid,
    pub order_id: Option<Uuid>,
    /// External issue reference, e.g. a ticket key
    pub issue: Option<String>,
    pub comment: Option<String>,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: Option<DateTime<FixedOffset>>,
    pub billable: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,

    #[serde(skip)]
    pub customer: Option<Customer>,
    #[serde(skip)]
    pub project: Option<Project>,
    #[serde(skip)]
    pub activity: Option<Activity>,
    #[serde(skip)]
    pub order: Option<Order>,
}

impl TimeSheet {
    pub fn new(customer_id: Uuid, activity_id: Uuid, start_date: DateTime<FixedOffset>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            customer_id,
            project_id: None,
            activity_id,
            order_id: None,
            issue: None,
            comment: None,
            start_date,
            end_date: None,
            billable: true,
            created: now,
            modified: now,
            customer: None,
            project: None,
            activity: None,
            order: None,
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
        name: "customer_id",
        sql_type: "TEXT",
        nullable: false,
        is_primary_key: false,
        default: None,
        references: Some("customers(id)"),
    },
    ColumnDef {
        name: "project_id",
        sql_type: "TEXT",
        nullable: true,
        is_primary_key: false,
        default: None,
        references: Some("projects(id)"),
    },
    ColumnDef {
        name: "activity_id",
        sql_type: "TEXT",
        nullable: false,
        is_primary_key: false,
        default: None,
        references: Some("activities(id)"),
    },
    ColumnDef {
        name: "order_id",
        sql_type: "TEXT",
        nullable: true,
        is_primary_key: false,
        default: None,
        references: Some("orders(id)"),
    },
    ColumnDef {
        name: "issue",
        sql_type: "TEXT",
        nullable: true,
        is_primary_key: false,
        default: None,
        references: None,
    },
    ColumnDef {
        name: "comment",
        sql_type: "TEXT",
        nullable: true,
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
        nullable: true,
        is_primary_key: false,
        default: None,
        references: None,
    },
    ColumnDef {
        name: "billable",
        sql_type: "INTEGER",
        nullable: false,
        is_primary_key: false,
        default: Some("1"),
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

impl DatabaseEntity for TimeSheet {
    const TABLE_NAME: &'static str = "time_sheets";
    const DEFAULT_SORT: &'static str = "start_date";

    fn column_names() -> &'static [&'static str] {
        &[
            "id",
            "customer_id",
            "project_id",
            "activity_id",
            "order_id",
            "issue",
            "comment",
            "start_date",
            "end_date",
            "billable",
            "created",
            "modified",
        ]
    }
}

impl DatabaseSchema for TimeSheet {
    fn columns() -> &'static [ColumnDef] {
        COLUMNS
    }
}

impl FromSqlRow for TimeSheet {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: decode_uuid(row, "id")?,
            customer_id: decode_uuid(row, "customer_id")?,
            project_id: decode_uuid_opt(row, "project_id")?,
            activity_id: decode_uuid(row, "activity_id")?,
            order_id: decode_uuid_opt(row, "order_id")?,
            issue: row.try_get("issue")?,
            comment: row.try_get("comment")?,
            start_date: decode_offset(row, "start_date")?,
            end_date: decode_offset_opt(row, "end_date")?,
            billable: row.try_get("billable")?,
            created: decode_utc(row, "created")?,
            modified: decode_utc(row, "modified")?,
            customer: None,
            project: None,
            activity: None,
            order: None,
        })
    }
}

impl TrackedEntity for TimeSheet {
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
            SqlValue::id(&self.customer_id),
            SqlValue::id_opt(&self.project_id),
            SqlValue::id(&self.activity_id),
            SqlValue::id_opt(&self.order_id),
            SqlValue::text_opt(&self.issue),
            SqlValue::text_opt(&self.comment),
            SqlValue::timestamp(&self.start_date),
            SqlValue::timestamp_opt(&self.end_date),
            SqlValue::Bool(self.billable),
            SqlValue::timestamp(&self.created),
            SqlValue::timestamp(&self.modified),
        ]
    }
}

#[async_trait]
impl RelationLoader for TimeSheet {
    async fn bulk_load_related(
        rows: &mut [Self],
        relations: &[String],
        pool: &SqlitePool,
    ) -> Result<(), sqlx::Error> {
        if relation_requested(relations, "customer") {
            let ids = rows.iter().map(|r| r.customer_id).collect();
            let customers = load_by_ids::<Customer>(pool, ids).await?;
            for row in rows.iter_mut() {
                row.customer = customers.get(&row.customer_id).cloned();
            }
        }
        if relation_requested(relations, "project") {
            let ids = rows.iter().filter_map(|r| r.project_id).collect();
            let projects = load_by_ids::<Project>(pool, ids).await?;
            for row in rows.iter_mut() {
                row.project = row.project_id.and_then(|id| projects.get(&id).cloned());
            }
        }
        if relation_requested(relations, "activity") {
            let ids = rows.iter().map(|r| r.activity_id).collect();
            let activities = load_by_ids::<Activity>(pool, ids).await?;
            for row in rows.iter_mut() {
                row.activity = activities.get(&row.activity_id).cloned();
            }
        }
        if relation_requested(relations, "order") {
            let ids = rows.iter().filter_map(|r| r.order_id).collect();
            let orders = load_by_ids::<Order>(pool, ids).await?;
            for row in rows.iter_mut() {
                row.order = row.order_id.and_then(|id| orders.get(&id).cloned());
            }
        }
        Ok(())
    }
}

#[derive(Default, Clone, Debug)]
pub struct TimeSheetFilter {
    pub customer_id: Option<IdFilter>,
    pub project_id: Option<IdFilter>,
    pub activity_id: Option<IdFilter>,
    pub order_id: Option<IdFilter>,
    pub start_date: Option<DateFilter>,
    pub billable: Option<BoolFilter>,
}

impl DatabaseFilter for TimeSheetFilter {
    fn to_sql_conditions(&self) -> (Vec<String>, Vec<SqlValue>) {
        let mut out = Conditions::default();
        if let Some(f) = &self.customer_id {
            f.apply("customer_id", &mut out);
        }
        if let Some(f) = &self.project_id {
            f.apply("project_id", &mut out);
        }
        if let Some(f) = &self.activity_id {
            f.apply("activity_id", &mut out);
        }
        if let Some(f) = &self.order_id {
            f.apply("order_id", &mut out);
        }
        if let Some(f) = &self.start_date {
            f.apply("start_date", &mut out);
        }
        if let Some(f) = &self.billable {
            f.apply("billable", &mut out);
        }
        out.into_parts()
    }

    fn is_empty(&self) -> bool {
        self.customer_id.as_ref().is_none_or(IdFilter::is_empty)
            && self.project_id.as_ref().is_none_or(IdFilter::is_empty)
            && self.activity_id.as_ref().is_none_or(IdFilter::is_empty)
            && self.order_id.as_ref().is_none_or(IdFilter::is_empty)
            && self.start_date.as_ref().is_none_or(DateFilter::is_empty)
            && self.billable.as_ref().is_none_or(BoolFilter::is_empty)
    }
}
