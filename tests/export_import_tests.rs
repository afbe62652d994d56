//! Integration tests for the export/import/truncate/reset workflow
//!
//! Covers the round-trip law, schema-fingerprint gating, transactional
//! truncate/import, and the demo reset with timestamp adjustment.

use assert_matches::assert_matches;
use chrono::{DateTime, Datelike, FixedOffset, Months, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use uuid::Uuid;

use timekeeper::config::Config;
use timekeeper::db::Database;
use timekeeper::db::entities::{Activity, Customer, Holiday, Order, Project, Setting, TimeSheet};
use timekeeper::db::orm::EntityQuery;
use timekeeper::services::{ExportError, ExportService, ResetService};

async fn test_db() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    let db = Database::connect(path.to_str().unwrap()).await.unwrap();
    let result = db.sync_schemas().await;
    assert!(
        result.errors.is_empty(),
        "schema sync errors: {:?}",
        result.errors
    );
    (dir, db)
}

fn date(raw: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(raw).unwrap()
}

fn months_ago(months: u32) -> DateTime<FixedOffset> {
    Utc::now()
        .fixed_offset()
        .checked_sub_months(Months::new(months))
        .unwrap()
}

fn whole_months_between(from: DateTime<FixedOffset>, to: DateTime<FixedOffset>) -> i32 {
    (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32)
}

/// Seed one row of every entity type and commit.
async fn seed_dataset(db: &Database) {
    let mut setting = Setting::new("theme", "dark");
    db.settings().add(&mut setting);

    let mut holiday = Holiday::new(
        "New Year",
        date("2024-01-01T00:00:00+01:00"),
        date("2024-01-01T23:59:59+01:00"),
    );
    db.holidays().add(&mut holiday);

    let mut customer = Customer::new("ACME", "K-0001");
    customer.hourly_rate = 95.0;
    db.customers().add(&mut customer);

    let mut project = Project::new("Relaunch", customer.id);
    db.projects().add(&mut project);

    let mut activity = Activity::new("Development");
    db.activities().add(&mut activity);

    let mut order = Order::new(
        "Q1 order",
        "O-1000",
        customer.id,
        date("2024-01-01T00:00:00+01:00"),
        date("2024-03-31T00:00:00+02:00"),
    );
    order.budget = 160.0;
    db.orders().add(&mut order);

    let mut sheet = TimeSheet::new(customer.id, activity.id, date("2024-02-05T09:00:00+01:00"));
    sheet.end_date = Some(date("2024-02-05T17:30:00+01:00"));
    sheet.project_id = Some(project.id);
    sheet.order_id = Some(order.id);
    db.time_sheets().add(&mut sheet);

    db.settings().save_changes().await.unwrap();
}

async fn all_counts(db: &Database) -> [i64; 7] {
    [
        db.settings().count(EntityQuery::new()).await.unwrap(),
        db.holidays().count(EntityQuery::new()).await.unwrap(),
        db.customers().count(EntityQuery::new()).await.unwrap(),
        db.projects().count(EntityQuery::new()).await.unwrap(),
        db.activities().count(EntityQuery::new()).await.unwrap(),
        db.orders().count(EntityQuery::new()).await.unwrap(),
        db.time_sheets().count(EntityQuery::new()).await.unwrap(),
    ]
}

// ============================================================================
// Export / import
// ============================================================================

#[tokio::test]
async fn export_then_import_round_trips_every_collection() {
    let (_dir, db) = test_db().await;
    seed_dataset(&db).await;

    let exporter = ExportService::new(db.clone());
    let document = exporter.export(None).await.unwrap();
    assert_eq!(document.database_model_hash, db.model_hash());

    exporter.import(document.clone()).await.unwrap();

    // Row sets, values and collection ordering all survive the round trip
    let reexported = exporter.export(None).await.unwrap();
    assert_eq!(
        serde_json::to_value(&document).unwrap(),
        serde_json::to_value(&reexported).unwrap()
    );
}

#[tokio::test]
async fn export_orders_collections_deterministically() {
    let (_dir, db) = test_db().await;
    let customers = db.customers();

    let mut rows = vec![
        Customer::new("Charlie", "K-0003"),
        Customer::new("Alpha", "K-0001"),
        Customer::new("Bravo", "K-0002"),
    ];
    customers.add_range(&mut rows);
    customers.save_changes().await.unwrap();

    let document = ExportService::new(db.clone()).export(None).await.unwrap();
    let titles: Vec<&str> = document.customers.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Alpha", "Bravo", "Charlie"]);
}

#[tokio::test]
async fn import_rejects_mismatched_schema_fingerprint() {
    let (_dir, db) = test_db().await;
    seed_dataset(&db).await;
    let before = all_counts(&db).await;

    let exporter = ExportService::new(db.clone());
    let mut document = exporter.export(None).await.unwrap();
    document.database_model_hash = "deadbeef".to_string();

    let result = exporter.import(document).await;
    assert_matches!(result, Err(ExportError::SchemaMismatch { .. }));

    // Nothing was altered
    assert_eq!(all_counts(&db).await, before);
}

#[tokio::test]
async fn import_compares_fingerprints_case_insensitively() {
    let (_dir, db) = test_db().await;
    seed_dataset(&db).await;

    let exporter = ExportService::new(db.clone());
    let mut document = exporter.export(None).await.unwrap();
    document.database_model_hash = document.database_model_hash.to_uppercase();

    exporter.import(document).await.unwrap();
    assert_eq!(db.customers().count(EntityQuery::new()).await.unwrap(), 1);
}

#[tokio::test]
async fn failed_import_leaves_no_partial_data() {
    let (_dir, db) = test_db().await;
    let exporter = ExportService::new(db.clone());

    let mut document = exporter.export(None).await.unwrap();
    // A time sheet referencing entities the document doesn't contain
    let mut orphan = TimeSheet::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        date("2024-02-05T09:00:00+01:00"),
    );
    orphan.id = Uuid::new_v4();
    document.time_sheets.push(orphan);

    let result = exporter.import(document).await;
    assert!(result.is_err());

    // The failed load rolled back whole
    assert_eq!(all_counts(&db).await, [0; 7]);
}

#[tokio::test]
async fn truncate_empties_every_entity_type() {
    let (_dir, db) = test_db().await;
    seed_dataset(&db).await;
    assert_eq!(all_counts(&db).await, [1; 7]);

    ExportService::new(db.clone()).truncate().await.unwrap();
    assert_eq!(all_counts(&db).await, [0; 7]);
}

// ============================================================================
// Reset
// ============================================================================

fn reset_config(enabled: bool, backup_path: &str, adjust: bool) -> Config {
    Config {
        host: None,
        port: 3001,
        database_path: String::new(),
        reset_enabled: enabled,
        reset_backup_path: backup_path.to_string(),
        reset_adjust_timestamps: adjust,
        auth_enabled: false,
        keycloak_url: None,
        keycloak_realm: "timekeeper".to_string(),
        keycloak_client_id: "timekeeper-web".to_string(),
        keycloak_admin_user: None,
        keycloak_admin_password: None,
    }
}

#[tokio::test]
async fn reset_is_a_noop_while_disabled() {
    let (dir, db) = test_db().await;
    seed_dataset(&db).await;
    let before = all_counts(&db).await;

    let backup_path = dir.path().join("backup.json");
    let config = reset_config(false, backup_path.to_str().unwrap(), true);

    // No backup file exists either - a disabled reset must not care
    ResetService::new(db.clone(), &config).reset().await.unwrap();
    assert_eq!(all_counts(&db).await, before);
}

#[tokio::test]
async fn reset_restores_backup_and_shifts_dates_to_the_current_month() {
    let (dir, db) = test_db().await;

    // A dataset ending a few months in the past
    let mut customer = Customer::new("ACME", "K-0001");
    db.customers().add(&mut customer);
    let mut activity = Activity::new("Development");
    db.activities().add(&mut activity);

    let old_first = months_ago(14);
    let old_last = months_ago(2);
    let mut first = TimeSheet::new(customer.id, activity.id, old_first);
    first.end_date = Some(old_first + chrono::Duration::hours(8));
    db.time_sheets().add(&mut first);
    let mut last = TimeSheet::new(customer.id, activity.id, old_last);
    last.end_date = Some(old_last + chrono::Duration::hours(4));
    db.time_sheets().add(&mut last);

    let mut order = Order::new(
        "Backlog",
        "O-1000",
        customer.id,
        old_first,
        old_last,
    );
    db.orders().add(&mut order);

    let mut holiday = Holiday::new("New Year", old_first, old_first + chrono::Duration::days(1));
    db.holidays().add(&mut holiday);
    db.customers().save_changes().await.unwrap();

    // Snapshot the dataset into a backup document, then lose the data
    let exporter = ExportService::new(db.clone());
    let document = exporter.export(None).await.unwrap();
    let backup_path = dir.path().join("backup.json");
    std::fs::write(&backup_path, serde_json::to_string(&document).unwrap()).unwrap();
    exporter.truncate().await.unwrap();

    let config = reset_config(true, backup_path.to_str().unwrap(), true);
    ResetService::new(db.clone(), &config).reset().await.unwrap();

    let sheets = db.time_sheets().get(EntityQuery::new()).await.unwrap();
    assert_eq!(sheets.len(), 2);

    // The latest time sheet now falls in the current month
    let latest = sheets.iter().map(|s| s.start_date).max().unwrap();
    let now = Utc::now().fixed_offset();
    assert_eq!((latest.year(), latest.month()), (now.year(), now.month()));

    // Every time sheet moved by the same whole-month count
    let expected_shift = whole_months_between(old_last, now);
    assert!(expected_shift > 0);
    for sheet in &sheets {
        let original = document
            .time_sheets
            .iter()
            .find(|s| s.id == sheet.id)
            .unwrap();
        assert_eq!(
            whole_months_between(original.start_date, sheet.start_date),
            expected_shift
        );
        assert_eq!(
            whole_months_between(original.end_date.unwrap(), sheet.end_date.unwrap()),
            expected_shift
        );
    }

    // Orders moved by the same month count
    let orders = db.orders().get(EntityQuery::new()).await.unwrap();
    assert_eq!(
        whole_months_between(document.orders[0].start_date, orders[0].start_date),
        expected_shift
    );
    assert_eq!(
        whole_months_between(document.orders[0].due_date, orders[0].due_date),
        expected_shift
    );

    // Holidays moved by whole years: the year difference between the new
    // and old earliest time-sheet dates
    let new_earliest = sheets.iter().map(|s| s.start_date).min().unwrap();
    let expected_years = new_earliest.year() - old_first.year();
    let holidays = db.holidays().get(EntityQuery::new()).await.unwrap();
    assert_eq!(
        whole_months_between(document.holidays[0].start_date, holidays[0].start_date),
        expected_years * 12
    );

    // Shifted rows are re-stamped to the new earliest date
    let expected_stamp = new_earliest.with_timezone(&Utc);
    for sheet in &sheets {
        assert_eq!(sheet.created, expected_stamp);
        assert_eq!(sheet.modified, expected_stamp);
    }
}

#[tokio::test]
async fn reset_without_timestamp_adjustment_keeps_original_dates() {
    let (dir, db) = test_db().await;

    let mut customer = Customer::new("ACME", "K-0001");
    db.customers().add(&mut customer);
    let mut activity = Activity::new("Development");
    db.activities().add(&mut activity);
    let old_start = months_ago(5);
    let mut sheet = TimeSheet::new(customer.id, activity.id, old_start);
    db.time_sheets().add(&mut sheet);
    db.customers().save_changes().await.unwrap();

    let exporter = ExportService::new(db.clone());
    let document = exporter.export(None).await.unwrap();
    let backup_path = dir.path().join("backup.json");
    std::fs::write(&backup_path, serde_json::to_string(&document).unwrap()).unwrap();
    exporter.truncate().await.unwrap();

    let config = reset_config(true, backup_path.to_str().unwrap(), false);
    ResetService::new(db.clone(), &config).reset().await.unwrap();

    let sheets = db.time_sheets().get(EntityQuery::new()).await.unwrap();
    assert_eq!(sheets.len(), 1);
    assert_eq!(sheets[0].start_date, old_start);
}
