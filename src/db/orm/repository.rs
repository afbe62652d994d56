//! Repository pattern for entity data access
//!
//! `DbRepository<E>` is the single data-access surface for one entity
//! type: composed reads via [EntityQuery], staged Add/Update/Remove
//! through the shared [ChangeTracker], and direct bulk operations that
//! bypass the staged unit-of-work for throughput.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use timekeeper::db::entities::{Customer, CustomerFilter};
//! use timekeeper::db::orm::{EntityQuery, StringFilter};
//!
//! let customers = db.customers();
//!
//! // Find visible customers matching a title fragment
//! let rows = customers
//!     .get(EntityQuery::new().filter(&CustomerFilter {
//!         title: Some(StringFilter::contains("gmbh")),
//!         ..Default::default()
//!     }))
//!     .await?;
//!
//! // Stage and commit a new row
//! let mut customer = Customer::new("ACME", "K-0001");
//! customers.add(&mut customer);
//! customers.save_changes().await?;
//! ```

use std::sync::Arc;

use chrono::Utc;
use sqlx::sqlite::{Sqlite, SqliteConnection};
use sqlx::{SqlitePool, Transaction};
use uuid::Uuid;

use super::builder::{EntityQuery, execute_with_binds, execute_with_binds_on};
use super::tracker::{
    ChangeTracker, render_delete, render_insert, render_row_update, render_update,
};
use super::traits::{DatabaseFilter, FromSqlRow, RelationLoader, SqlValue, TrackedEntity};

/// A transaction handle bounding one atomic multi-step operation.
///
/// Work executes on [TransactionScope::connection]; nothing persists
/// unless [TransactionScope::complete] is called. Dropping the scope
/// rolls the transaction back.
pub struct TransactionScope {
    tx: Transaction<'static, Sqlite>,
}

impl TransactionScope {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }

    /// The connection enrolled in this transaction.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Commit the transaction. Without this call the transaction rolls
    /// back when the scope is dropped.
    pub async fn complete(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }
}

/// Typed repository over one entity table.
pub struct DbRepository<E> {
    pool: SqlitePool,
    tracker: Arc<ChangeTracker>,
    _marker: std::marker::PhantomData<E>,
}

impl<E> DbRepository<E>
where
    E: TrackedEntity + FromSqlRow + RelationLoader,
{
    pub fn new(pool: SqlitePool, tracker: Arc<ChangeTracker>) -> Self {
        Self {
            pool,
            tracker,
            _marker: std::marker::PhantomData,
        }
    }

    /// Start a query against this entity's table.
    pub fn query(&self) -> EntityQuery<E> {
        EntityQuery::new()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Fetch all rows matching the query, resolving eager includes.
    pub async fn get(&self, query: EntityQuery<E>) -> Result<Vec<E>, sqlx::Error> {
        let includes = query.includes().to_vec();
        let mut rows = query.fetch_all(&self.pool).await?;
        if !includes.is_empty() {
            E::bulk_load_related(&mut rows, &includes, &self.pool).await?;
        }
        Ok(rows)
    }

    /// Fetch the first row matching the query, or `None`.
    pub async fn first_or_default(&self, query: EntityQuery<E>) -> Result<Option<E>, sqlx::Error> {
        let includes = query.includes().to_vec();
        match query.fetch_optional(&self.pool).await? {
            Some(row) => {
                let mut rows = [row];
                if !includes.is_empty() {
                    E::bulk_load_related(&mut rows, &includes, &self.pool).await?;
                }
                let [row] = rows;
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    /// Fetch one row by primary key.
    pub async fn find(&self, id: Uuid) -> Result<Option<E>, sqlx::Error> {
        let query = self
            .query()
            .where_clause(&format!("{} = ?", E::PRIMARY_KEY), SqlValue::id(&id));
        self.first_or_default(query).await
    }

    /// Count rows matching the query.
    pub async fn count(&self, query: EntityQuery<E>) -> Result<i64, sqlx::Error> {
        query.count(&self.pool).await
    }

    /// Whether any row matches the query.
    pub async fn exists(&self, query: EntityQuery<E>) -> Result<bool, sqlx::Error> {
        query.exists(&self.pool).await
    }

    /// Sum a numeric column over the rows matching the query; 0 for none.
    pub async fn sum(&self, column: &str, query: EntityQuery<E>) -> Result<f64, sqlx::Error> {
        query.sum(column, &self.pool).await
    }

    /// Minimum of a numeric column over the rows matching the query.
    pub async fn min(
        &self,
        column: &str,
        query: EntityQuery<E>,
    ) -> Result<Option<f64>, sqlx::Error> {
        query.min(column, &self.pool).await
    }

    /// Maximum of a numeric column over the rows matching the query.
    pub async fn max(
        &self,
        column: &str,
        query: EntityQuery<E>,
    ) -> Result<Option<f64>, sqlx::Error> {
        query.max(column, &self.pool).await
    }

    // ------------------------------------------------------------------
    // Staged writes (committed by save_changes)
    // ------------------------------------------------------------------

    /// Stage an insert. Assigns an identifier when the entity has none and
    /// stamps `created` and `modified` with the same instant.
    pub fn add(&self, entity: &mut E) {
        if entity.id().is_nil() {
            entity.assign_id(Uuid::new_v4());
        }
        let now = Utc::now();
        entity.stamp(now, now);
        self.tracker.stage(render_insert(entity));
    }

    /// Stage inserts for a batch of entities.
    pub fn add_range(&self, entities: &mut [E]) {
        for entity in entities {
            self.add(entity);
        }
    }

    /// Stage an update. Every column is written except `created`, which is
    /// preserved from the stored row; `modified` advances to now.
    pub fn update(&self, entity: &mut E) {
        entity.stamp(entity.created(), Utc::now());
        self.tracker.stage(render_update(entity));
    }

    /// Stage a delete by primary key.
    pub fn remove(&self, entity: &E) {
        self.tracker.stage(render_delete(entity));
    }

    /// Stage deletes for a batch of entities.
    pub fn remove_range(&self, entities: &[E]) {
        for entity in entities {
            self.remove(entity);
        }
    }

    /// Commit every staged write, across all repositories sharing this
    /// database, in one transaction. Serialized process-wide; the staged
    /// set is cleared only after the commit succeeds.
    pub async fn save_changes(&self) -> Result<usize, sqlx::Error> {
        self.tracker.flush(&self.pool).await
    }

    /// Number of staged writes awaiting [DbRepository::save_changes].
    pub fn pending_changes(&self) -> usize {
        self.tracker.pending()
    }

    // ------------------------------------------------------------------
    // Bulk operations (immediate, bypass the staged unit-of-work)
    // ------------------------------------------------------------------

    /// Delete all rows matching the filter immediately; the whole table
    /// when no filter is given. Returns the number of rows removed.
    pub async fn bulk_remove<F: DatabaseFilter>(
        &self,
        filter: Option<&F>,
    ) -> Result<u64, sqlx::Error> {
        let (sql, values) = self.delete_parts(filter);
        let result = execute_with_binds(&sql, &values, &self.pool).await?;
        Ok(result.rows_affected())
    }

    /// [DbRepository::bulk_remove], executed on a transaction scope.
    pub async fn bulk_remove_within<F: DatabaseFilter>(
        &self,
        scope: &mut TransactionScope,
        filter: Option<&F>,
    ) -> Result<u64, sqlx::Error> {
        let (sql, values) = self.delete_parts(filter);
        let result = execute_with_binds_on(scope.connection(), &sql, &values).await?;
        Ok(result.rows_affected())
    }

    /// Insert rows immediately, preserving their supplied identifiers.
    pub async fn bulk_add_range(&self, rows: &[E]) -> Result<(), sqlx::Error> {
        for row in rows {
            let write = render_insert(row);
            execute_with_binds(&write.sql, &write.values, &self.pool).await?;
        }
        Ok(())
    }

    /// [DbRepository::bulk_add_range], executed on a transaction scope.
    pub async fn bulk_add_range_within(
        &self,
        scope: &mut TransactionScope,
        rows: &[E],
    ) -> Result<(), sqlx::Error> {
        for row in rows {
            let write = render_insert(row);
            execute_with_binds_on(scope.connection(), &write.sql, &write.values).await?;
        }
        Ok(())
    }

    /// Apply a transformation to every row matching the filter and write
    /// the full rows back immediately (including `created`, so callers may
    /// re-stamp audit fields). Returns the number of rows written.
    pub async fn bulk_update<F: DatabaseFilter>(
        &self,
        filter: Option<&F>,
        mut apply: impl FnMut(&mut E) + Send,
    ) -> Result<u64, sqlx::Error> {
        let mut query = self.query();
        if let Some(filter) = filter {
            query = query.filter(filter);
        }
        let mut rows = query.fetch_all(&self.pool).await?;

        let mut written = 0;
        for row in &mut rows {
            apply(row);
            let (sql, values) = render_row_update(row, false);
            execute_with_binds(&sql, &values, &self.pool).await?;
            written += 1;
        }
        Ok(written)
    }

    fn delete_parts<F: DatabaseFilter>(&self, filter: Option<&F>) -> (String, Vec<SqlValue>) {
        let mut query = self.query();
        if let Some(filter) = filter {
            query = query.filter(filter);
        }
        query.build_delete_sql()
    }
}
