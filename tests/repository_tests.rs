//! Integration tests for the repository layer
//!
//! Each test runs against a fresh temp-dir SQLite database with the
//! schema synced from the entity definitions, exercising:
//! - identifier assignment and audit stamping
//! - the staged unit-of-work and serialized save_changes
//! - bulk operations and transaction scopes
//! - query composition and aggregates

use assert_matches::assert_matches;
use chrono::{DateTime, FixedOffset, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use uuid::Uuid;

use timekeeper::db::Database;
use timekeeper::db::entities::{Customer, CustomerFilter, Project, TimeSheet};
use timekeeper::db::orm::{BoolFilter, EntityQuery, OrderBy, StringFilter};

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

fn customer(title: &str, number: &str, rate: f64) -> Customer {
    let mut c = Customer::new(title, number);
    c.hourly_rate = rate;
    c
}

fn date(raw: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(raw).unwrap()
}

// ============================================================================
// Staged unit-of-work
// ============================================================================

#[tokio::test]
async fn add_assigns_id_and_stamps_created_equals_modified() {
    let (_dir, db) = test_db().await;
    let customers = db.customers();

    let mut row = customer("ACME", "K-0001", 95.0);
    assert!(row.id.is_nil());

    customers.add(&mut row);
    assert!(!row.id.is_nil());
    assert_eq!(row.created, row.modified);

    customers.save_changes().await.unwrap();

    let stored = customers.find(row.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "ACME");
    assert_eq!(stored.created, stored.modified);
    assert_eq!(stored.created, row.created);
}

#[tokio::test]
async fn add_preserves_an_existing_identifier() {
    let (_dir, db) = test_db().await;
    let customers = db.customers();

    let mut row = customer("ACME", "K-0001", 95.0);
    let id = Uuid::new_v4();
    row.id = id;

    customers.add(&mut row);
    assert_eq!(row.id, id);
}

#[tokio::test]
async fn update_preserves_created_and_advances_modified() {
    let (_dir, db) = test_db().await;
    let customers = db.customers();

    let mut row = customer("ACME", "K-0001", 95.0);
    customers.add(&mut row);
    customers.save_changes().await.unwrap();
    let original = customers.find(row.id).await.unwrap().unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let mut changed = original.clone();
    changed.title = "ACME Industries".to_string();
    // A client-supplied created stamp must not survive the update
    changed.created = Utc::now();
    customers.update(&mut changed);
    customers.save_changes().await.unwrap();

    let stored = customers.find(row.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "ACME Industries");
    assert_eq!(stored.created, original.created);
    assert!(stored.modified > original.modified);
}

#[tokio::test]
async fn staged_writes_do_not_touch_storage_until_save_changes() {
    let (_dir, db) = test_db().await;
    let customers = db.customers();

    let mut row = customer("ACME", "K-0001", 95.0);
    customers.add(&mut row);

    assert_eq!(customers.pending_changes(), 1);
    assert_eq!(customers.count(EntityQuery::new()).await.unwrap(), 0);

    let committed = customers.save_changes().await.unwrap();
    assert_eq!(committed, 1);
    assert_eq!(customers.pending_changes(), 0);
    assert_eq!(customers.count(EntityQuery::new()).await.unwrap(), 1);

    // The staged set was cleared; nothing is resubmitted
    assert_eq!(customers.save_changes().await.unwrap(), 0);
    assert_eq!(customers.count(EntityQuery::new()).await.unwrap(), 1);
}

#[tokio::test]
async fn remove_stages_a_delete() {
    let (_dir, db) = test_db().await;
    let customers = db.customers();

    let mut row = customer("ACME", "K-0001", 95.0);
    customers.add(&mut row);
    customers.save_changes().await.unwrap();

    customers.remove(&row);
    assert_eq!(customers.count(EntityQuery::new()).await.unwrap(), 1);

    customers.save_changes().await.unwrap();
    assert_eq!(customers.count(EntityQuery::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn save_changes_spans_repositories_of_different_entity_types() {
    let (_dir, db) = test_db().await;
    let customers = db.customers();
    let projects = db.projects();

    let mut c = customer("ACME", "K-0001", 95.0);
    customers.add(&mut c);
    let mut p = Project::new("Relaunch", c.id);
    projects.add(&mut p);

    // One commit flushes the whole shared staged set
    let committed = customers.save_changes().await.unwrap();
    assert_eq!(committed, 2);
    assert_eq!(projects.count(EntityQuery::new()).await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_save_changes_lose_no_updates() {
    let (_dir, db) = test_db().await;

    let db_a = db.clone();
    let a = tokio::spawn(async move {
        let customers = db_a.customers();
        for i in 0..25 {
            let mut row = customer(&format!("A{i}"), &format!("A-{i:04}"), 80.0);
            customers.add(&mut row);
        }
        customers.save_changes().await.unwrap();
    });

    let db_b = db.clone();
    let b = tokio::spawn(async move {
        let customers = db_b.customers();
        for i in 0..25 {
            let mut row = customer(&format!("B{i}"), &format!("B-{i:04}"), 90.0);
            customers.add(&mut row);
        }
        customers.save_changes().await.unwrap();
    });

    a.await.unwrap();
    b.await.unwrap();

    let count = db.customers().count(EntityQuery::new()).await.unwrap();
    assert_eq!(count, 50);
}

// ============================================================================
// Bulk operations
// ============================================================================

#[tokio::test]
async fn bulk_remove_without_predicate_removes_every_row() {
    let (_dir, db) = test_db().await;
    let customers = db.customers();

    let mut rows = vec![
        customer("ACME", "K-0001", 95.0),
        customer("Globex", "K-0002", 110.0),
        customer("Initech", "K-0003", 70.0),
    ];
    customers.add_range(&mut rows);
    customers.save_changes().await.unwrap();

    let removed = customers
        .bulk_remove(None::<&CustomerFilter>)
        .await
        .unwrap();
    assert_eq!(removed, 3);
    assert_eq!(customers.count(EntityQuery::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn bulk_remove_with_predicate_removes_only_matching_rows() {
    let (_dir, db) = test_db().await;
    let customers = db.customers();

    let mut rows = vec![
        customer("ACME", "K-0001", 95.0),
        customer("Globex", "K-0002", 110.0),
    ];
    customers.add_range(&mut rows);
    customers.save_changes().await.unwrap();

    let filter = CustomerFilter {
        title: Some(StringFilter::eq("ACME")),
        ..Default::default()
    };
    let removed = customers.bulk_remove(Some(&filter)).await.unwrap();
    assert_eq!(removed, 1);

    let remaining = customers.get(EntityQuery::new()).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].title, "Globex");
}

#[tokio::test]
async fn bulk_add_range_preserves_supplied_identifiers() {
    let (_dir, db) = test_db().await;
    let customers = db.customers();

    let mut row = customer("ACME", "K-0001", 95.0);
    row.id = Uuid::new_v4();
    let id = row.id;

    customers.bulk_add_range(&[row]).await.unwrap();
    assert!(customers.find(id).await.unwrap().is_some());
}

#[tokio::test]
async fn bulk_update_transforms_matching_rows() {
    let (_dir, db) = test_db().await;
    let customers = db.customers();

    let mut rows = vec![
        customer("ACME", "K-0001", 95.0),
        customer("Globex", "K-0002", 110.0),
    ];
    customers.add_range(&mut rows);
    customers.save_changes().await.unwrap();

    let filter = CustomerFilter {
        title: Some(StringFilter::eq("ACME")),
        ..Default::default()
    };
    let written = customers
        .bulk_update(Some(&filter), |c| c.hourly_rate += 5.0)
        .await
        .unwrap();
    assert_eq!(written, 1);

    let rows = customers
        .get(EntityQuery::new().order_by(&OrderBy::asc("title")))
        .await
        .unwrap();
    assert_eq!(rows[0].hourly_rate, 100.0);
    assert_eq!(rows[1].hourly_rate, 110.0);
}

#[tokio::test]
async fn restricted_foreign_key_blocks_referenced_delete() {
    let (_dir, db) = test_db().await;
    let customers = db.customers();
    let projects = db.projects();

    let mut c = customer("ACME", "K-0001", 95.0);
    customers.add(&mut c);
    let mut p = Project::new("Relaunch", c.id);
    projects.add(&mut p);
    customers.save_changes().await.unwrap();

    // The project still references the customer
    let result = customers.bulk_remove(None::<&CustomerFilter>).await;
    assert!(result.is_err());
    assert_eq!(customers.count(EntityQuery::new()).await.unwrap(), 1);
}

// ============================================================================
// Transaction scopes
// ============================================================================

#[tokio::test]
async fn incomplete_transaction_scope_rolls_back() {
    let (_dir, db) = test_db().await;
    let customers = db.customers();

    let mut row = customer("ACME", "K-0001", 95.0);
    row.id = Uuid::new_v4();

    {
        let mut scope = db.begin_scope().await.unwrap();
        customers
            .bulk_add_range_within(&mut scope, &[row.clone()])
            .await
            .unwrap();
        // Dropped without complete()
    }

    assert_eq!(customers.count(EntityQuery::new()).await.unwrap(), 0);

    let mut scope = db.begin_scope().await.unwrap();
    customers
        .bulk_add_range_within(&mut scope, &[row])
        .await
        .unwrap();
    scope.complete().await.unwrap();

    assert_eq!(customers.count(EntityQuery::new()).await.unwrap(), 1);
}

// ============================================================================
// Query composition and aggregates
// ============================================================================

#[tokio::test]
async fn queries_compose_filter_order_and_pagination() {
    let (_dir, db) = test_db().await;
    let customers = db.customers();

    let mut rows = vec![
        customer("Delta", "K-0004", 60.0),
        customer("Alpha", "K-0001", 80.0),
        customer("Charlie", "K-0003", 100.0),
        customer("Bravo", "K-0002", 120.0),
    ];
    rows[3].hidden = true;
    customers.add_range(&mut rows);
    customers.save_changes().await.unwrap();

    let visible = CustomerFilter {
        hidden: Some(BoolFilter::is_false()),
        ..Default::default()
    };

    let page = customers
        .get(
            EntityQuery::new()
                .filter(&visible)
                .order_by(&OrderBy::asc("title"))
                .limit(2)
                .offset(1),
        )
        .await
        .unwrap();
    let titles: Vec<&str> = page.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Charlie", "Delta"]);

    let first = customers
        .first_or_default(EntityQuery::new().filter(&visible).order_by(&OrderBy::asc("title")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.title, "Alpha");

    let none = customers
        .first_or_default(EntityQuery::new().filter(&CustomerFilter {
            title: Some(StringFilter::eq("Echo")),
            ..Default::default()
        }))
        .await
        .unwrap();
    assert_matches!(none, None);
}

#[tokio::test]
async fn aggregates_cover_the_filtered_set() {
    let (_dir, db) = test_db().await;
    let customers = db.customers();

    let mut rows = vec![
        customer("Alpha", "K-0001", 80.0),
        customer("Bravo", "K-0002", 120.0),
        customer("Charlie", "K-0003", 100.0),
    ];
    rows[1].hidden = true;
    customers.add_range(&mut rows);
    customers.save_changes().await.unwrap();

    let visible = CustomerFilter {
        hidden: Some(BoolFilter::is_false()),
        ..Default::default()
    };

    assert_eq!(
        customers
            .count(EntityQuery::new().filter(&visible))
            .await
            .unwrap(),
        2
    );
    assert_eq!(
        customers
            .sum("hourly_rate", EntityQuery::new().filter(&visible))
            .await
            .unwrap(),
        180.0
    );
    assert_eq!(
        customers
            .min("hourly_rate", EntityQuery::new().filter(&visible))
            .await
            .unwrap(),
        Some(80.0)
    );
    assert_eq!(
        customers
            .max("hourly_rate", EntityQuery::new().filter(&visible))
            .await
            .unwrap(),
        Some(100.0)
    );
    assert!(
        customers
            .exists(EntityQuery::new().filter(&visible))
            .await
            .unwrap()
    );

    let hidden_only = CustomerFilter {
        title: Some(StringFilter::eq("Zulu")),
        ..Default::default()
    };
    assert!(
        !customers
            .exists(EntityQuery::new().filter(&hidden_only))
            .await
            .unwrap()
    );
    assert_eq!(
        customers
            .sum("hourly_rate", EntityQuery::new().filter(&hidden_only))
            .await
            .unwrap(),
        0.0
    );
    assert_eq!(
        customers
            .min("hourly_rate", EntityQuery::new().filter(&hidden_only))
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn includes_eagerly_load_related_entities() {
    let (_dir, db) = test_db().await;

    let mut c = customer("ACME", "K-0001", 95.0);
    db.customers().add(&mut c);
    let mut activity = timekeeper::db::entities::Activity::new("Development");
    db.activities().add(&mut activity);
    let mut sheet = TimeSheet::new(c.id, activity.id, date("2024-05-13T09:00:00+02:00"));
    sheet.end_date = Some(date("2024-05-13T17:00:00+02:00"));
    db.time_sheets().add(&mut sheet);
    db.customers().save_changes().await.unwrap();

    let rows = db
        .time_sheets()
        .get(EntityQuery::new().include("Customer").include("Activity"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].customer.as_ref().unwrap().title, "ACME");
    assert_eq!(rows[0].activity.as_ref().unwrap().title, "Development");
    assert_matches!(rows[0].project, None);

    // Without includes the relations stay unloaded
    let bare = db.time_sheets().get(EntityQuery::new()).await.unwrap();
    assert_matches!(bare[0].customer, None);
}
