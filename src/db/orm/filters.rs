//! Reusable field filter types for entity queries
//!
//! The per-entity `*Filter` structs compose these into WHERE clauses:
//! - Eq, Ne (equals, not equals)
//! - Contains (substring match)
//! - Gte, Gt, Lte, Lt (date comparisons, evaluated through `datetime()`
//!   so rows with differing UTC offsets still compare chronologically)
//! - In (list membership for identifiers)

use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use super::traits::SqlValue;

/// Accumulates WHERE clause fragments and their bind values.
#[derive(Default, Debug)]
pub struct Conditions {
    pub clauses: Vec<String>,
    pub values: Vec<SqlValue>,
}

impl Conditions {
    pub fn push(&mut self, clause: impl Into<String>, value: SqlValue) {
        self.clauses.push(clause.into());
        self.values.push(value);
    }

    pub fn push_clause(&mut self, clause: impl Into<String>) {
        self.clauses.push(clause.into());
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<SqlValue>) {
        (self.clauses, self.values)
    }
}

/// Filter for string fields
#[derive(Default, Clone, Debug)]
pub struct StringFilter {
    /// Equals
    pub eq: Option<String>,
    /// Not equals
    pub ne: Option<String>,
    /// Contains substring (case-insensitive via LIKE)
    pub contains: Option<String>,
}

impl StringFilter {
    pub fn eq(value: impl Into<String>) -> Self {
        Self {
            eq: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn contains(value: impl Into<String>) -> Self {
        Self {
            contains: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.eq.is_none() && self.ne.is_none() && self.contains.is_none()
    }

    pub fn apply(&self, column: &str, out: &mut Conditions) {
        if let Some(v) = &self.eq {
            out.push(format!("{} = ?", column), SqlValue::String(v.clone()));
        }
        if let Some(v) = &self.ne {
            out.push(format!("{} <> ?", column), SqlValue::String(v.clone()));
        }
        if let Some(v) = &self.contains {
            out.push(format!("{} LIKE ?", column), SqlValue::String(format!("%{}%", v)));
        }
    }
}

/// Filter for identifier (foreign key) fields
#[derive(Default, Clone, Debug)]
pub struct IdFilter {
    /// Equals
    pub eq: Option<Uuid>,
    /// Not equals
    pub ne: Option<Uuid>,
    /// List membership
    pub r#in: Option<Vec<Uuid>>,
}

impl IdFilter {
    pub fn eq(value: Uuid) -> Self {
        Self {
            eq: Some(value),
            ..Default::default()
        }
    }

    pub fn one_of(values: Vec<Uuid>) -> Self {
        Self {
            r#in: Some(values),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.eq.is_none() && self.ne.is_none() && self.r#in.is_none()
    }

    pub fn apply(&self, column: &str, out: &mut Conditions) {
        if let Some(v) = &self.eq {
            out.push(format!("{} = ?", column), SqlValue::id(v));
        }
        if let Some(v) = &self.ne {
            out.push(format!("{} <> ?", column), SqlValue::id(v));
        }
        if let Some(ids) = &self.r#in {
            if ids.is_empty() {
                // Empty membership list matches nothing
                out.push_clause("1 = 0");
            } else {
                let placeholders = vec!["?"; ids.len()].join(", ");
                out.push_clause(format!("{} IN ({})", column, placeholders));
                for id in ids {
                    out.values.push(SqlValue::id(id));
                }
            }
        }
    }
}

/// Filter for boolean fields
#[derive(Default, Clone, Debug)]
pub struct BoolFilter {
    /// Equals
    pub eq: Option<bool>,
}

impl BoolFilter {
    pub fn eq(value: bool) -> Self {
        Self { eq: Some(value) }
    }

    pub fn is_true() -> Self {
        Self::eq(true)
    }

    pub fn is_false() -> Self {
        Self::eq(false)
    }

    pub fn is_empty(&self) -> bool {
        self.eq.is_none()
    }

    pub fn apply(&self, column: &str, out: &mut Conditions) {
        if let Some(v) = self.eq {
            out.push(format!("{} = ?", column), SqlValue::Bool(v));
        }
    }
}

/// Filter for date fields stored as RFC 3339 TEXT.
///
/// Comparisons go through SQLite's `datetime()` so values carrying
/// different UTC offsets order chronologically rather than lexically.
#[derive(Default, Clone, Debug)]
pub struct DateFilter {
    /// On or after
    pub gte: Option<DateTime<FixedOffset>>,
    /// Strictly after
    pub gt: Option<DateTime<FixedOffset>>,
    /// On or before
    pub lte: Option<DateTime<FixedOffset>>,
    /// Strictly before
    pub lt: Option<DateTime<FixedOffset>>,
}

impl DateFilter {
    pub fn on_or_after(value: DateTime<FixedOffset>) -> Self {
        Self {
            gte: Some(value),
            ..Default::default()
        }
    }

    pub fn before(value: DateTime<FixedOffset>) -> Self {
        Self {
            lt: Some(value),
            ..Default::default()
        }
    }

    pub fn between(from: DateTime<FixedOffset>, to: DateTime<FixedOffset>) -> Self {
        Self {
            gte: Some(from),
            lte: Some(to),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gte.is_none() && self.gt.is_none() && self.lte.is_none() && self.lt.is_none()
    }

    pub fn apply(&self, column: &str, out: &mut Conditions) {
        if let Some(v) = &self.gte {
            out.push(
                format!("datetime({}) >= datetime(?)", column),
                SqlValue::timestamp(v),
            );
        }
        if let Some(v) = &self.gt {
            out.push(
                format!("datetime({}) > datetime(?)", column),
                SqlValue::timestamp(v),
            );
        }
        if let Some(v) = &self.lte {
            out.push(
                format!("datetime({}) <= datetime(?)", column),
                SqlValue::timestamp(v),
            );
        }
        if let Some(v) = &self.lt {
            out.push(
                format!("datetime({}) < datetime(?)", column),
                SqlValue::timestamp(v),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_filter_contains_wraps_pattern() {
        let mut out = Conditions::default();
        StringFilter::contains("acme").apply("title", &mut out);
        assert_eq!(out.clauses, vec!["title LIKE ?"]);
        match &out.values[0] {
            SqlValue::String(s) => assert_eq!(s, "%acme%"),
            other => panic!("unexpected bind value: {:?}", other),
        }
    }

    #[test]
    fn id_filter_empty_membership_matches_nothing() {
        let mut out = Conditions::default();
        IdFilter::one_of(Vec::new()).apply("customer_id", &mut out);
        assert_eq!(out.clauses, vec!["1 = 0"]);
        assert!(out.values.is_empty());
    }

    #[test]
    fn date_filter_compares_through_datetime() {
        let from = DateTime::parse_from_rfc3339("2024-03-01T00:00:00+02:00").unwrap();
        let mut out = Conditions::default();
        DateFilter::on_or_after(from).apply("start_date", &mut out);
        assert_eq!(out.clauses, vec!["datetime(start_date) >= datetime(?)"]);
    }
}
