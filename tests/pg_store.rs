//! Postgres store tests. Run with a reachable server:
//! `DATABASE_URL=postgres://... cargo test --test pg_store -- --ignored`

use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use formbase::db::Database;
use formbase::models::{
    Field, FieldValue, NewSubmission, Page, Source, SubmissionFilter, SubmissionPatch,
};
use formbase::store::{PgStore, StoreError, SubmissionStore};

struct TestDb {
    store: PgStore,
    db_name: String,
    admin_url: String,
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Create a fresh database; migrations run when the store first connects.
async fn setup() -> TestDb {
    let _ = dotenvy::dotenv();
    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let db_name = format!("formbase_test_{}", Uuid::now_v7().simple());
    let admin_url = admin_url(&base_url);

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");
    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");
    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    TestDb {
        store: PgStore::new(Database::new(test_url, 5)),
        db_name,
        admin_url,
    }
}

async fn cleanup(test: TestDb) {
    test.store.close().await;
    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&test.admin_url)
        .await
        .expect("Failed to connect for cleanup");
    let _ = sqlx::query(&format!(
        "DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)",
        test.db_name
    ))
    .execute(&admin_pool)
    .await;
    admin_pool.close().await;
}

fn form(name: &str, user_type: Option<&str>) -> NewSubmission {
    let mut patch = SubmissionPatch::default();
    patch.fields.push((Field::Name, Some(FieldValue::Text(name.to_string()))));
    if let Some(u) = user_type {
        patch.fields.push((Field::UserType, Some(FieldValue::Text(u.to_string()))));
    }
    patch.extra.insert("referral".to_string(), json!("friend"));
    NewSubmission::form(patch)
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn crud_round_trip() {
    let test = setup().await;
    let store = &test.store;

    let created = store.create(form("Alice Smith", Some("student"))).await.unwrap();
    assert_eq!(created.source, Source::Form);
    assert_eq!(created.extra["referral"], "friend");

    let fetched = store.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(fetched, created);

    let mut patch = SubmissionPatch::default();
    patch.fields.push((Field::Email, Some(FieldValue::Text("a@x.com".into()))));
    patch.extra.insert("pet".to_string(), json!("cat"));
    let updated = store.update(created.id, &patch).await.unwrap().unwrap();
    assert_eq!(updated.fields.email.as_deref(), Some("a@x.com"));
    assert_eq!(updated.fields.name.as_deref(), Some("Alice Smith"));
    assert_eq!(updated.extra["referral"], "friend");
    assert_eq!(updated.extra["pet"], "cat");
    assert_eq!(updated.submitted_at, created.submitted_at);

    let removed = store.delete(created.id).await.unwrap().unwrap();
    assert_eq!(removed.id, created.id);
    assert!(store.find_by_id(created.id).await.unwrap().is_none());
    assert!(store.delete(created.id).await.unwrap().is_none());

    cleanup(test).await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn list_search_and_aggregates() {
    let test = setup().await;
    let store = &test.store;

    store.create(form("Alice Smith", Some("student"))).await.unwrap();
    store.create(form("Bob Jones", Some("professional"))).await.unwrap();
    store.create(form("100% Carol", None)).await.unwrap();
    let rows = vec![
        json!({ "name": "Dana", "userType": "student" }).as_object().cloned().unwrap(),
        json!({ "Company": "Acme" }).as_object().cloned().unwrap(),
    ];
    let imported = store.bulk_create_from_csv(rows.clone()).await.unwrap();
    assert_eq!(imported.len(), 2);
    assert!(imported.iter().all(|s| s.source == Source::Csv));
    assert_eq!(imported[0].csv_data.as_ref(), Some(&rows[0]));

    let all = store.list(&SubmissionFilter::default(), Page::new(Some(1), Some(2))).await.unwrap();
    assert_eq!(all.total, 5);
    assert_eq!(all.items.len(), 2);
    // CSV rows share one timestamp and keep file order.
    assert_eq!(all.items[0].fields.name.as_deref(), Some("Dana"));

    let students = SubmissionFilter {
        source: None,
        user_type: Some("student".to_string()),
    };
    assert_eq!(store.count(&students).await.unwrap(), 2);
    assert_eq!(store.count_by_source(Source::Csv).await.unwrap(), 2);

    let groups = store.count_by_user_type().await.unwrap();
    assert_eq!(groups[0].user_type, "student");
    assert_eq!(groups[0].count, 2);
    assert_eq!(groups.len(), 2);

    let hits = store.search("ALICE").await.unwrap();
    assert_eq!(hits.len(), 1);
    let hits = store.search("100%").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(store.search("zzz").await.unwrap().is_empty());

    assert_eq!(store.recent(3).await.unwrap().len(), 3);

    cleanup(test).await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_first_callers_share_one_pool() {
    let test = setup().await;
    let db = test.store.database();

    let (a, b, c) = tokio::join!(db.pool(), db.pool(), db.pool());
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
    assert!(std::ptr::eq(a, b));
    assert!(std::ptr::eq(b, c));

    let filter = SubmissionFilter::default();
    let (x, y) = tokio::join!(test.store.ping(), test.store.count(&filter));
    x.unwrap();
    assert_eq!(y.unwrap(), 0);
    assert!(std::ptr::eq(a, db.pool().await.unwrap()));

    cleanup(test).await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn failed_batch_persists_nothing() {
    let test = setup().await;
    let store = &test.store;

    // Postgres rejects NUL in text, so the second insert fails mid-transaction.
    let rows = vec![
        json!({ "name": "first" }).as_object().cloned().unwrap(),
        json!({ "name": "bad\u{0000}name" }).as_object().cloned().unwrap(),
        json!({ "name": "third" }).as_object().cloned().unwrap(),
    ];
    match store.bulk_create_from_csv(rows).await {
        Err(StoreError::Database(_)) => {}
        other => panic!("expected database error, got {other:?}"),
    }
    assert_eq!(store.count(&SubmissionFilter::default()).await.unwrap(), 0);
    assert!(store.search("first").await.unwrap().is_empty());

    cleanup(test).await;
}

#[tokio::test]
async fn unreachable_database_is_a_connection_failure() {
    let store = PgStore::new(Database::new("postgres://nobody@db.invalid/none", 1));
    match store.ping().await {
        Err(StoreError::Connection(_)) => {}
        other => panic!("expected connection failure, got {other:?}"),
    }
    // A failed attempt is not memoized; the next call tries again.
    match store.count(&SubmissionFilter::default()).await {
        Err(StoreError::Connection(_)) => {}
        other => panic!("expected connection failure, got {other:?}"),
    }
}
