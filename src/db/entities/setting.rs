//! Application settings, stored as key/value rows

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use super::{decode_utc, decode_uuid};
use crate::db::orm::{
    ColumnDef, Conditions, DatabaseEntity, DatabaseFilter, DatabaseSchema, FromSqlRow,
    RelationLoader, SqlValue, StringFilter, TrackedEntity,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Setting {
    pub id: Uuid,
    pub key: String,
    pub value: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Setting {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            key: key.into(),
            value: value.into(),
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
        name: "key",
        sql_type: "TEXT",
        nullable: false,
        is_primary_key: false,
        default: None,
        references: None,
    },
    ColumnDef {
        name: "value",
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

impl DatabaseEntity for Setting {
    const TABLE_NAME: &'static str = "settings";
    const DEFAULT_SORT: &'static str = "key";

    fn column_names() -> &'static [&'static str] {
        &["id", "key", "value", "created", "modified"]
    }
}

impl DatabaseSchema for Setting {
    fn columns() -> &'static [ColumnDef] {
        COLUMNS
    }
}

impl FromSqlRow for Setting {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: decode_uuid(row, "id")?,
            key: row.try_get("key")?,
            value: row.try_get("value")?,
            created: decode_utc(row, "created")?,
            modified: decode_utc(row, "modified")?,
        })
    }
}

impl TrackedEntity for Setting {
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
            SqlValue::String(self.key.clone()),
            SqlValue::String(self.value.clone()),
            SqlValue::timestamp(&self.created),
            SqlValue::timestamp(&self.modified),
        ]
    }
}

#[async_trait]
impl RelationLoader for Setting {
    async fn bulk_load_related(
        _rows: &mut [Self],
        _relations: &[String],
        _pool: &SqlitePool,
    ) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

#[derive(Default, Clone, Debug)]
pub struct SettingFilter {
    pub key: Option<StringFilter>,
}

impl DatabaseFilter for SettingFilter {
    fn to_sql_conditions(&self) -> (Vec<String>, Vec<SqlValue>) {
        let mut out = Conditions::default();
        if let Some(f) = &self.key {
            f.apply("key", &mut out);
        }
        out.into_parts()
    }

    fn is_empty(&self) -> bool {
        self.key.as_ref().is_none_or(StringFilter::is_empty)
    }
}
