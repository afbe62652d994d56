//! Database export and import
//!
//! Serializes the entire dataset into one portable document and loads
//! such a document back, replacing everything. Import is gated on the
//! schema fingerprint: a document exported under a different schema
//! shape is rejected before anything is written.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::db::Database;
use crate::db::entities::{
    Activity, ActivityFilter, Customer, CustomerFilter, Holiday, HolidayFilter, Order, OrderFilter,
    Project, ProjectFilter, Setting, SettingFilter, TimeSheet, TimeSheetFilter,
};
use crate::db::orm::{DateFilter, EntityQuery, OrderBy};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("schema fingerprint mismatch: document has {document}, database has {database}")]
    SchemaMismatch { document: String, database: String },
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

/// Portable snapshot of the whole dataset plus the fingerprint of the
/// schema it was taken under. Built fresh per export, consumed once on
/// import. Collections are ordered deterministically so two exports of
/// the same data diff cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatabaseExport {
    pub database_model_hash: String,
    pub settings: Vec<Setting>,
    pub holidays: Vec<Holiday>,
    pub customers: Vec<Customer>,
    pub projects: Vec<Project>,
    pub activities: Vec<Activity>,
    pub orders: Vec<Order>,
    pub time_sheets: Vec<TimeSheet>,
}

/// Optional date range narrowing an export. Applied to the start date of
/// the date-bearing entity types (holidays, orders, time sheets); the
/// reference types are always exported whole.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ExportRange {
    pub from: Option<DateTime<FixedOffset>>,
    pub to: Option<DateTime<FixedOffset>>,
}

impl ExportRange {
    fn to_date_filter(self) -> Option<DateFilter> {
        if self.from.is_none() && self.to.is_none() {
            None
        } else {
            Some(DateFilter {
                gte: self.from,
                lte: self.to,
                ..Default::default()
            })
        }
    }
}

/// Export, import and truncate of the full dataset.
pub struct ExportService {
    db: Database,
}

impl ExportService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Serialize every entity collection, deterministically ordered, and
    /// bundle it with the live schema fingerprint.
    pub async fn export(&self, range: Option<ExportRange>) -> Result<DatabaseExport, ExportError> {
        let date_filter = range.and_then(ExportRange::to_date_filter);

        let settings = self
            .db
            .settings()
            .get(EntityQuery::new().order_by(&OrderBy::asc("key")))
            .await?;

        let mut holidays_query =
            EntityQuery::new().order_by(&OrderBy::date_asc("start_date").then_asc("title"));
        if let Some(filter) = &date_filter {
            holidays_query = holidays_query.filter(&HolidayFilter {
                start_date: Some(filter.clone()),
                ..Default::default()
            });
        }
        let holidays = self.db.holidays().get(holidays_query).await?;

        let customers = self
            .db
            .customers()
            .get(EntityQuery::new().order_by(&OrderBy::asc("title")))
            .await?;

        let projects = self
            .db
            .projects()
            .get(EntityQuery::new().order_by(&OrderBy::asc("title")))
            .await?;

        let activities = self
            .db
            .activities()
            .get(EntityQuery::new().order_by(&OrderBy::asc("title")))
            .await?;

        let mut orders_query =
            EntityQuery::new().order_by(&OrderBy::date_asc("start_date").then_asc("title"));
        if let Some(filter) = &date_filter {
            orders_query = orders_query.filter(&OrderFilter {
                start_date: Some(filter.clone()),
                ..Default::default()
            });
        }
        let orders = self.db.orders().get(orders_query).await?;

        let mut sheets_query =
            EntityQuery::new().order_by(&OrderBy::date_asc("start_date").then_asc("id"));
        if let Some(filter) = &date_filter {
            sheets_query = sheets_query.filter(&TimeSheetFilter {
                start_date: Some(filter.clone()),
                ..Default::default()
            });
        }
        let time_sheets = self.db.time_sheets().get(sheets_query).await?;

        info!(
            settings = settings.len(),
            holidays = holidays.len(),
            customers = customers.len(),
            projects = projects.len(),
            activities = activities.len(),
            orders = orders.len(),
            time_sheets = time_sheets.len(),
            "Dataset exported"
        );

        Ok(DatabaseExport {
            database_model_hash: self.db.model_hash(),
            settings,
            holidays,
            customers,
            projects,
            activities,
            orders,
            time_sheets,
        })
    }

    /// Replace the whole dataset with the document's contents.
    ///
    /// Fails fast on a schema fingerprint mismatch (compared
    /// case-insensitively) without touching any data. On match the
    /// database is truncated, then every collection is bulk-inserted in
    /// dependency order within one transaction scope; a failure in any
    /// step rolls the load back whole.
    pub async fn import(&self, document: DatabaseExport) -> Result<(), ExportError> {
        let database = self.db.model_hash();
        if !document.database_model_hash.eq_ignore_ascii_case(&database) {
            return Err(ExportError::SchemaMismatch {
                document: document.database_model_hash,
                database,
            });
        }

        self.truncate().await?;

        let mut scope = self.db.begin_scope().await?;
        self.db
            .settings()
            .bulk_add_range_within(&mut scope, &document.settings)
            .await?;
        self.db
            .holidays()
            .bulk_add_range_within(&mut scope, &document.holidays)
            .await?;
        self.db
            .customers()
            .bulk_add_range_within(&mut scope, &document.customers)
            .await?;
        self.db
            .projects()
            .bulk_add_range_within(&mut scope, &document.projects)
            .await?;
        self.db
            .activities()
            .bulk_add_range_within(&mut scope, &document.activities)
            .await?;
        self.db
            .orders()
            .bulk_add_range_within(&mut scope, &document.orders)
            .await?;
        self.db
            .time_sheets()
            .bulk_add_range_within(&mut scope, &document.time_sheets)
            .await?;
        scope.complete().await?;

        info!(
            time_sheets = document.time_sheets.len(),
            customers = document.customers.len(),
            "Dataset imported"
        );
        Ok(())
    }

    /// Remove every row of every managed entity type, children before
    /// parents to satisfy the delete-restricted foreign keys, atomically.
    pub async fn truncate(&self) -> Result<(), ExportError> {
        let mut scope = self.db.begin_scope().await?;
        self.db
            .time_sheets()
            .bulk_remove_within(&mut scope, None::<&TimeSheetFilter>)
            .await?;
        self.db
            .orders()
            .bulk_remove_within(&mut scope, None::<&OrderFilter>)
            .await?;
        self.db
            .activities()
            .bulk_remove_within(&mut scope, None::<&ActivityFilter>)
            .await?;
        self.db
            .projects()
            .bulk_remove_within(&mut scope, None::<&ProjectFilter>)
            .await?;
        self.db
            .customers()
            .bulk_remove_within(&mut scope, None::<&CustomerFilter>)
            .await?;
        self.db
            .holidays()
            .bulk_remove_within(&mut scope, None::<&HolidayFilter>)
            .await?;
        self.db
            .settings()
            .bulk_remove_within(&mut scope, None::<&SettingFilter>)
            .await?;
        scope.complete().await?;

        info!("Dataset truncated");
        Ok(())
    }
}
