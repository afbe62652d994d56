//! Demo dataset reset
//!
//! Feature-flagged restore of a fixed backup document. Disabled by
//! default and a silent no-op when disabled, so the operation is always
//! safe to call. When timestamp adjustment is configured the restored
//! dataset is shifted forward so its last booked month is the current
//! month, keeping a demo installation looking current.

use std::path::PathBuf;

use chrono::{DateTime, Datelike, FixedOffset, Months, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::db::Database;
use crate::db::entities::{HolidayFilter, OrderFilter, TimeSheetFilter};
use crate::db::orm::EntityQuery;
use crate::services::export::{DatabaseExport, ExportError, ExportService};

#[derive(Debug, Error)]
pub enum ResetError {
    #[error("backup document {path} could not be read: {source}")]
    BackupUnavailable {
        path: String,
        source: std::io::Error,
    },
    #[error("backup document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

pub struct ResetService {
    db: Database,
    enabled: bool,
    backup_path: PathBuf,
    adjust_timestamps: bool,
}

impl ResetService {
    pub fn new(db: Database, config: &Config) -> Self {
        Self {
            db,
            enabled: config.reset_enabled,
            backup_path: PathBuf::from(&config.reset_backup_path),
            adjust_timestamps: config.reset_adjust_timestamps,
        }
    }

    /// Replace the dataset with the configured backup document.
    pub async fn reset(&self) -> Result<(), ResetError> {
        if !self.enabled {
            debug!("Database reset is disabled, skipping");
            return Ok(());
        }

        let raw = tokio::fs::read_to_string(&self.backup_path)
            .await
            .map_err(|source| ResetError::BackupUnavailable {
                path: self.backup_path.display().to_string(),
                source,
            })?;
        let document: DatabaseExport = serde_json::from_str(&raw)?;

        // Import truncates before loading
        ExportService::new(self.db.clone()).import(document).await?;

        if self.adjust_timestamps {
            self.adjust_dataset_dates().await?;
        }

        info!("Database reset complete");
        Ok(())
    }

    /// Shift every dated row forward so the latest time-sheet month
    /// becomes the current month: time-sheet and order dates move by that
    /// whole-month count, holiday dates by the whole-year difference
    /// between the new and old earliest time-sheet dates. All shifted
    /// rows get `created`/`modified` re-stamped to the new earliest date.
    async fn adjust_dataset_dates(&self) -> Result<(), ResetError> {
        let sheets = self.db.time_sheets().get(EntityQuery::new()).await?;
        let Some(earliest) = sheets.iter().map(|s| s.start_date).min() else {
            debug!("No time sheets in dataset, nothing to shift");
            return Ok(());
        };
        let latest = sheets.iter().map(|s| s.start_date).max().unwrap_or(earliest);

        let months = months_between(latest, Utc::now().fixed_offset());
        if months <= 0 {
            debug!("Dataset already ends in the current month");
            return Ok(());
        }
        let shift = months as u32;

        let new_earliest = shift_months(earliest, shift);
        let years = (new_earliest.year() - earliest.year()).max(0) as u32;
        let stamp = new_earliest.with_timezone(&Utc);

        let sheets_shifted = self
            .db
            .time_sheets()
            .bulk_update(None::<&TimeSheetFilter>, |sheet| {
                sheet.start_date = shift_months(sheet.start_date, shift);
                sheet.end_date = sheet.end_date.map(|d| shift_months(d, shift));
                sheet.created = stamp;
                sheet.modified = stamp;
            })
            .await?;

        let orders_shifted = self
            .db
            .orders()
            .bulk_update(None::<&OrderFilter>, |order| {
                order.start_date = shift_months(order.start_date, shift);
                order.due_date = shift_months(order.due_date, shift);
                order.created = stamp;
                order.modified = stamp;
            })
            .await?;

        let holidays_shifted = self
            .db
            .holidays()
            .bulk_update(None::<&HolidayFilter>, |holiday| {
                holiday.start_date = shift_months(holiday.start_date, years * 12);
                holiday.end_date = shift_months(holiday.end_date, years * 12);
                holiday.created = stamp;
                holiday.modified = stamp;
            })
            .await?;

        info!(
            months = shift,
            years,
            time_sheets = sheets_shifted,
            orders = orders_shifted,
            holidays = holidays_shifted,
            "Shifted dataset dates forward"
        );
        Ok(())
    }
}

/// Whole months from `from`'s month to `to`'s month, ignoring days.
pub(crate) fn months_between(from: DateTime<FixedOffset>, to: DateTime<FixedOffset>) -> i32 {
    (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32)
}

/// Shift a date forward by whole months, keeping time-of-day and offset.
/// Clamps to the last day of the target month where needed.
pub(crate) fn shift_months(date: DateTime<FixedOffset>, months: u32) -> DateTime<FixedOffset> {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).unwrap()
    }

    #[test]
    fn months_between_spans_year_boundaries() {
        assert_eq!(
            months_between(date("2023-11-15T08:00:00+01:00"), date("2024-02-01T00:00:00+01:00")),
            3
        );
        assert_eq!(
            months_between(date("2024-02-01T00:00:00+01:00"), date("2024-02-29T00:00:00+01:00")),
            0
        );
        assert_eq!(
            months_between(date("2024-03-01T00:00:00+01:00"), date("2024-02-01T00:00:00+01:00")),
            -1
        );
    }

    #[test]
    fn shift_keeps_time_of_day_and_offset() {
        let shifted = shift_months(date("2024-01-15T08:30:00+02:00"), 13);
        assert_eq!(shifted, date("2025-02-15T08:30:00+02:00"));
    }

    #[test]
    fn shift_clamps_to_shorter_months() {
        let shifted = shift_months(date("2024-01-31T12:00:00+01:00"), 1);
        assert_eq!(shifted, date("2024-02-29T12:00:00+01:00"));
    }
}
