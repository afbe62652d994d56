//! SQL query builder for the entity layer
//!
//! Composes the optional clauses of a query (filter, eager includes,
//! ordering, distinct, skip/take) into a single parameterized SELECT.
//! All clauses are independent; omitting every clause yields the whole
//! table. Uses parameterized queries via sqlx to prevent SQL injection.

use sqlx::sqlite::{SqliteConnection, SqliteQueryResult};
use sqlx::{Row, SqlitePool};

use super::traits::{
    DatabaseEntity, DatabaseFilter, DatabaseOrderBy, FromSqlRow, OrderDirection, SqlValue,
};

/// A single- or multi-key ordering usable with [EntityQuery::order_by].
#[derive(Clone, Debug, Default)]
pub struct OrderBy {
    keys: Vec<String>,
}

impl OrderBy {
    pub fn asc(column: &str) -> Self {
        Self::new(column, OrderDirection::Asc, false)
    }

    pub fn desc(column: &str) -> Self {
        Self::new(column, OrderDirection::Desc, false)
    }

    /// Order chronologically on an RFC 3339 TEXT column.
    pub fn date_asc(column: &str) -> Self {
        Self::new(column, OrderDirection::Asc, true)
    }

    pub fn date_desc(column: &str) -> Self {
        Self::new(column, OrderDirection::Desc, true)
    }

    pub fn then_asc(mut self, column: &str) -> Self {
        self.keys.push(format!("{} ASC", column));
        self
    }

    pub fn then_desc(mut self, column: &str) -> Self {
        self.keys.push(format!("{} DESC", column));
        self
    }

    fn new(column: &str, direction: OrderDirection, chronological: bool) -> Self {
        let key = if chronological {
            format!("datetime({}) {}", column, direction.to_sql())
        } else {
            format!("{} {}", column, direction.to_sql())
        };
        Self { keys: vec![key] }
    }
}

impl DatabaseOrderBy for OrderBy {
    fn to_sql_order(&self) -> Option<String> {
        if self.keys.is_empty() {
            None
        } else {
            Some(self.keys.join(", "))
        }
    }
}

/// A query builder for database entities.
///
/// Clauses are applied in a fixed order regardless of call order:
/// filter, include, order, distinct, offset, limit.
pub struct EntityQuery<E: DatabaseEntity> {
    _phantom: std::marker::PhantomData<E>,
    where_clauses: Vec<String>,
    values: Vec<SqlValue>,
    order_by: Option<String>,
    includes: Vec<String>,
    distinct: bool,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl<E: DatabaseEntity + FromSqlRow> EntityQuery<E> {
    /// Create a new query builder for the entity type.
    pub fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
            where_clauses: Vec::new(),
            values: Vec::new(),
            order_by: None,
            includes: Vec::new(),
            distinct: false,
            limit: None,
            offset: None,
        }
    }

    /// Add a filter to the query.
    pub fn filter<F: DatabaseFilter>(mut self, filter: &F) -> Self {
        if !filter.is_empty() {
            let (conditions, values) = filter.to_sql_conditions();
            self.where_clauses.extend(conditions);
            self.values.extend(values);
        }
        self
    }

    /// Add a raw WHERE clause condition with one bind value.
    pub fn where_clause(mut self, condition: &str, value: SqlValue) -> Self {
        self.where_clauses.push(condition.to_string());
        self.values.push(value);
        self
    }

    /// Add sorting to the query. Only one ordering is in effect per query;
    /// a later call replaces an earlier one.
    pub fn order_by<O: DatabaseOrderBy>(mut self, order: &O) -> Self {
        if let Some(order_sql) = order.to_sql_order() {
            self.order_by = Some(order_sql);
        }
        self
    }

    /// Add default sorting if no order is specified.
    pub fn default_order(mut self) -> Self {
        if self.order_by.is_none() {
            self.order_by = Some(format!("{} {}", E::DEFAULT_SORT, E::DEFAULT_SORT_DIR));
        }
        self
    }

    /// Request eager loading of a related entity by name
    /// (matched case-insensitively by the entity's relation loader).
    pub fn include(mut self, relation: &str) -> Self {
        self.includes.push(relation.to_string());
        self
    }

    /// Requested eager includes.
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// Return only distinct rows.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Set limit directly.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set offset directly.
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Build the SQL query string.
    fn build_sql(&self) -> String {
        let mut sql = E::select_sql(self.distinct);

        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.join(" AND "));
        }

        if let Some(ref order) = self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset {
            if offset > 0 {
                if self.limit.is_none() {
                    // SQLite requires LIMIT before OFFSET
                    sql.push_str(" LIMIT -1");
                }
                sql.push_str(&format!(" OFFSET {}", offset));
            }
        }

        sql
    }

    /// Build an aggregate query string over the filtered set.
    fn build_aggregate_sql(&self, expression: &str) -> String {
        let mut sql = format!("SELECT {} FROM {}", expression, E::TABLE_NAME);

        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.join(" AND "));
        }

        sql
    }

    /// Build a DELETE query string and bind values for bulk delete by filter.
    /// Returns `(sql, values)` so the caller can run it with the execute helpers.
    pub fn build_delete_sql(&self) -> (String, Vec<SqlValue>) {
        let mut sql = format!("DELETE FROM {}", E::TABLE_NAME);
        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.join(" AND "));
        }
        (sql, self.values.clone())
    }

    /// Execute the query and return all matching entities.
    pub async fn fetch_all(self, pool: &SqlitePool) -> Result<Vec<E>, sqlx::Error> {
        let sql = self.build_sql();
        tracing::debug!(sql = %sql, "Executing entity query");

        let mut query = sqlx::query(&sql);
        for value in &self.values {
            query = value.bind_to(query);
        }

        let rows = query.fetch_all(pool).await?;
        rows.iter().map(E::from_row).collect()
    }

    /// Execute the query and return a single optional entity.
    pub async fn fetch_optional(self, pool: &SqlitePool) -> Result<Option<E>, sqlx::Error> {
        let first = self.limit(1);
        let sql = first.build_sql();
        tracing::debug!(sql = %sql, "Executing entity query (one)");

        let mut query = sqlx::query(&sql);
        for value in &first.values {
            query = value.bind_to(query);
        }

        match query.fetch_optional(pool).await? {
            Some(row) => Ok(Some(E::from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Execute a COUNT over the filtered set.
    pub async fn count(&self, pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let sql = self.build_aggregate_sql("COUNT(*)");
        let row = self.fetch_aggregate_row(&sql, pool).await?;
        row.try_get(0)
    }

    /// Execute an existence check over the filtered set.
    pub async fn exists(&self, pool: &SqlitePool) -> Result<bool, sqlx::Error> {
        let mut inner = format!("SELECT 1 FROM {}", E::TABLE_NAME);
        if !self.where_clauses.is_empty() {
            inner.push_str(" WHERE ");
            inner.push_str(&self.where_clauses.join(" AND "));
        }
        let sql = format!("SELECT EXISTS({})", inner);
        let row = self.fetch_aggregate_row(&sql, pool).await?;
        let flag: i64 = row.try_get(0)?;
        Ok(flag != 0)
    }

    /// SUM over a numeric column of the filtered set; 0 when no rows match.
    pub async fn sum(&self, column: &str, pool: &SqlitePool) -> Result<f64, sqlx::Error> {
        let sql = self.build_aggregate_sql(&format!("CAST(COALESCE(SUM({}), 0) AS REAL)", column));
        let row = self.fetch_aggregate_row(&sql, pool).await?;
        row.try_get(0)
    }

    /// MIN over a numeric column of the filtered set.
    pub async fn min(&self, column: &str, pool: &SqlitePool) -> Result<Option<f64>, sqlx::Error> {
        let sql = self.build_aggregate_sql(&format!("CAST(MIN({}) AS REAL)", column));
        let row = self.fetch_aggregate_row(&sql, pool).await?;
        row.try_get(0)
    }

    /// MAX over a numeric column of the filtered set.
    pub async fn max(&self, column: &str, pool: &SqlitePool) -> Result<Option<f64>, sqlx::Error> {
        let sql = self.build_aggregate_sql(&format!("CAST(MAX({}) AS REAL)", column));
        let row = self.fetch_aggregate_row(&sql, pool).await?;
        row.try_get(0)
    }

    async fn fetch_aggregate_row(
        &self,
        sql: &str,
        pool: &SqlitePool,
    ) -> Result<sqlx::sqlite::SqliteRow, sqlx::Error> {
        tracing::debug!(sql = %sql, "Executing aggregate query");

        let mut query = sqlx::query(sql);
        for value in &self.values {
            query = value.bind_to(query);
        }
        query.fetch_one(pool).await
    }
}

impl<E: DatabaseEntity + FromSqlRow> Default for EntityQuery<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Execute an INSERT/UPDATE/DELETE with bound values against the pool.
pub async fn execute_with_binds(
    sql: &str,
    values: &[SqlValue],
    pool: &SqlitePool,
) -> Result<SqliteQueryResult, sqlx::Error> {
    let mut query = sqlx::query(sql);
    for value in values {
        query = value.bind_to(query);
    }
    query.execute(pool).await
}

/// Execute an INSERT/UPDATE/DELETE with bound values on a single connection,
/// typically one enrolled in a transaction.
pub async fn execute_with_binds_on(
    conn: &mut SqliteConnection,
    sql: &str,
    values: &[SqlValue],
) -> Result<SqliteQueryResult, sqlx::Error> {
    let mut query = sqlx::query(sql);
    for value in values {
        query = value.bind_to(query);
    }
    query.execute(&mut *conn).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::entities::{Customer, CustomerFilter};
    use crate::db::orm::{BoolFilter, StringFilter};

    fn query() -> EntityQuery<Customer> {
        EntityQuery::new()
    }

    #[test]
    fn empty_query_selects_everything() {
        let sql = query().build_sql();
        assert!(sql.starts_with("SELECT id, title,"));
        assert!(!sql.contains("WHERE"));
        assert!(!sql.contains("ORDER BY"));
    }

    #[test]
    fn clauses_compose_in_fixed_order() {
        let filter = CustomerFilter {
            title: Some(StringFilter::contains("gmbh")),
            hidden: Some(BoolFilter::is_false()),
            ..Default::default()
        };
        let sql = query()
            .limit(10)
            .order_by(&OrderBy::asc("title"))
            .filter(&filter)
            .distinct()
            .offset(20)
            .build_sql();

        let where_pos = sql.find("WHERE").unwrap();
        let order_pos = sql.find("ORDER BY").unwrap();
        let limit_pos = sql.find("LIMIT").unwrap();
        let offset_pos = sql.find("OFFSET").unwrap();
        assert!(sql.starts_with("SELECT DISTINCT"));
        assert!(where_pos < order_pos && order_pos < limit_pos && limit_pos < offset_pos);
    }

    #[test]
    fn offset_without_limit_is_valid_sqlite() {
        let sql = query().offset(5).build_sql();
        assert!(sql.ends_with("LIMIT -1 OFFSET 5"));
    }

    #[test]
    fn delete_sql_without_filter_targets_whole_table() {
        let (sql, values) = query().build_delete_sql();
        assert_eq!(sql, "DELETE FROM customers");
        assert!(values.is_empty());
    }

    #[test]
    fn multi_key_ordering_renders_in_declaration_order() {
        let order = OrderBy::date_asc("start_date").then_asc("title");
        assert_eq!(
            order.to_sql_order().unwrap(),
            "datetime(start_date) ASC, title ASC"
        );
    }
}
