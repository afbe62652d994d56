//! Staged unit-of-work shared by all typed repositories of one database
//!
//! Add/Update/Remove calls stage their writes here as already-rendered
//! parameterized SQL; nothing touches storage until `save_changes`
//! flushes the whole set in a single transaction. The flush is serialized
//! process-wide because the staged set is not concurrency-safe across
//! overlapping commits, and the set is cleared only after a successful
//! commit so a failed flush can be retried.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use sqlx::SqlitePool;

use super::builder::execute_with_binds_on;
use super::traits::{SqlValue, TrackedEntity};

/// At most one flush may be in flight at a time, across every repository
/// and tracker in the process.
static COMMIT_LOCK: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

/// Kind of staged write, for logging and inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

/// One pending write, rendered to SQL at stage time.
#[derive(Debug, Clone)]
pub(crate) struct StagedWrite {
    pub table: &'static str,
    pub action: ChangeAction,
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// The staged-change set for one [Database](crate::db::Database).
#[derive(Default)]
pub struct ChangeTracker {
    staged: Mutex<Vec<StagedWrite>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn stage(&self, write: StagedWrite) {
        self.staged.lock().push(write);
    }

    /// Number of staged writes not yet committed.
    pub fn pending(&self) -> usize {
        self.staged.lock().len()
    }

    /// Drop all staged writes without committing them.
    pub fn clear(&self) {
        self.staged.lock().clear();
    }

    /// Commit every staged write in one transaction, serialized against all
    /// other flushes in the process. Returns the number of writes committed.
    ///
    /// Writes staged while a flush is in flight stay queued for the next
    /// flush; only the snapshot that was committed is removed.
    pub async fn flush(&self, pool: &SqlitePool) -> Result<usize, sqlx::Error> {
        let _commit = COMMIT_LOCK.lock().await;

        let snapshot: Vec<StagedWrite> = self.staged.lock().clone();
        if snapshot.is_empty() {
            return Ok(0);
        }

        let mut tx = pool.begin().await?;
        for write in &snapshot {
            tracing::debug!(
                table = write.table,
                action = ?write.action,
                "Applying staged write"
            );
            execute_with_binds_on(&mut tx, &write.sql, &write.values).await?;
        }
        tx.commit().await?;

        self.staged.lock().drain(..snapshot.len());
        tracing::debug!(count = snapshot.len(), "Flushed staged changes");
        Ok(snapshot.len())
    }
}

/// Render the INSERT for all columns of an entity.
pub(crate) fn render_insert<E: TrackedEntity>(entity: &E) -> StagedWrite {
    let columns = E::column_names();
    let placeholders = vec!["?"; columns.len()].join(", ");
    StagedWrite {
        table: E::TABLE_NAME,
        action: ChangeAction::Created,
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            E::TABLE_NAME,
            columns.join(", "),
            placeholders
        ),
        values: entity.bind_values(),
    }
}

/// Render the UPDATE for an entity, writing every column except the
/// primary key and `created`, which is preserved from the stored row.
pub(crate) fn render_update<E: TrackedEntity>(entity: &E) -> StagedWrite {
    let (sql, values) = render_row_update(entity, true);
    StagedWrite {
        table: E::TABLE_NAME,
        action: ChangeAction::Updated,
        sql,
        values,
    }
}

/// Render the DELETE for an entity by primary key.
pub(crate) fn render_delete<E: TrackedEntity>(entity: &E) -> StagedWrite {
    StagedWrite {
        table: E::TABLE_NAME,
        action: ChangeAction::Deleted,
        sql: format!(
            "DELETE FROM {} WHERE {} = ?",
            E::TABLE_NAME,
            E::PRIMARY_KEY
        ),
        values: vec![SqlValue::id(&entity.id())],
    }
}

/// Render a whole-row UPDATE. With `preserve_created` the `created`
/// column is left untouched (staged updates); without it every non-key
/// column is written (bulk updates, which may re-stamp `created`).
pub(crate) fn render_row_update<E: TrackedEntity>(
    entity: &E,
    preserve_created: bool,
) -> (String, Vec<SqlValue>) {
    let columns = E::column_names();
    let all_values = entity.bind_values();

    let mut assignments = Vec::new();
    let mut values = Vec::new();
    for (column, value) in columns.iter().zip(all_values) {
        if *column == E::PRIMARY_KEY || (preserve_created && *column == "created") {
            continue;
        }
        assignments.push(format!("{} = ?", column));
        values.push(value);
    }
    values.push(SqlValue::id(&entity.id()));

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        E::TABLE_NAME,
        assignments.join(", "),
        E::PRIMARY_KEY
    );
    (sql, values)
}
