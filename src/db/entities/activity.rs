//! Activity entity
//!
//! What was worked on (development, support, travel). Optionally scoped
//! to a project; required on every time sheet.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use super::{Project, decode_utc, decode_uuid, decode_uuid_opt, load_by_ids, relation_requested};
use crate::db::orm::{
    BoolFilter, ColumnDef, Conditions, DatabaseEntity, DatabaseFilter, DatabaseSchema, FromSqlRow,
    IdFilter, RelationLoader, SqlValue, StringFilter, TrackedEntity,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Activity {
    pub id: Uuid,
    pub title: String,
    pub project_id: Option<Uuid>,
    pub hidden: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,

    #[serde(skip)]
    pub project: Option<Project>,
}

impl Activity {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            title: title.into(),
            project_id: None,
            hidden: false,
            created: now,
            modified: now,
            project: None,
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
        name: "project_id",
        sql_type: "TEXT",
        nullable: true,
        is_primary_key: false,
        default: None,
        references: Some("projects(id)"),
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

impl DatabaseEntity for Activity {
    const TABLE_NAME: &'static str = "activities";
    const DEFAULT_SORT: &'static str = "title";

    fn column_names() -> &'static [&'static str] {
        &["id", "title", "project_id", "hidden", "created", "modified"]
    }
}

impl DatabaseSchema for Activity {
    fn columns() -> &'static [ColumnDef] {
        COLUMNS
    }
}

impl FromSqlRow for Activity {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: decode_uuid(row, "id")?,
            title: row.try_get("title")?,
            project_id: decode_uuid_opt(row, "project_id")?,
            hidden: row.try_get("hidden")?,
            created: decode_utc(row, "created")?,
            modified: decode_utc(row, "modified")?,
            project: None,
        })
    }
}

impl TrackedEntity for Activity {
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
            SqlValue::id_opt(&self.project_id),
            SqlValue::Bool(self.hidden),
            SqlValue::timestamp(&self.created),
            SqlValue::timestamp(&self.modified),
        ]
    }
}

#[async_trait]
impl RelationLoader for Activity {
    async fn bulk_load_related(
        rows: &mut [Self],
        relations: &[String],
        pool: &SqlitePool,
    ) -> Result<(), sqlx::Error> {
        if relation_requested(relations, "project") {
            let ids = rows.iter().filter_map(|r| r.project_id).collect();
            let projects = load_by_ids::<Project>(pool, ids).await?;
            for row in rows {
                row.project = row.project_id.and_then(|id| projects.get(&id).cloned());
            }
        }
        Ok(())
    }
}

#[derive(Default, Clone, Debug)]
pub struct ActivityFilter {
    pub title: Option<StringFilter>,
    pub project_id: Option<IdFilter>,
    pub hidden: Option<BoolFilter>,
}

impl DatabaseFilter for ActivityFilter {
    fn to_sql_conditions(&self) -> (Vec<String>, Vec<SqlValue>) {
        let mut out = Conditions::default();
        if let Some(f) = &self.title {
            f.apply("title", &mut out);
        }
        if let Some(f) = &self.project_id {
            f.apply("project_id", &mut out);
        }
        if let Some(f) = &self.hidden {
            f.apply("hidden", &mut out);
        }
        out.into_parts()
    }

    fn is_empty(&self) -> bool {
        self.title.as_ref().is_none_or(StringFilter::is_empty)
            && self.project_id.as_ref().is_none_or(IdFilter::is_empty)
            && self.hidden.as_ref().is_none_or(BoolFilter::is_empty)
    }
}
