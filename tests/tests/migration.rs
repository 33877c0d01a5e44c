mod common;

use std::sync::Arc;

use common::*;
use wellstore_core::{record, CollectionSpec, IndexSpec, Schema, StoreError};

#[tokio::test]
async fn migration_runs_once_per_version() -> Result<(), anyhow::Error> {
    let engine = TestEngine::new();

    let first = store(emotions_schema(1), engine.clone());
    first.init().await?;
    let report = first.last_migration().expect("first open migrates");
    assert_eq!((report.from_version, report.to_version), (0, 1));
    assert_eq!(report.created_collections, vec!["emotions"]);
    assert_eq!(report.created_indexes, vec![("emotions".to_owned(), "userId".to_owned())]);
    first.insert("emotions", record! { "id": "e1", "userId": "u1" }).await?;
    first.close().await;

    // same schema again: no upgrade, data untouched
    let second = store(emotions_schema(1), engine.clone());
    second.init().await?;
    assert_eq!(second.last_migration(), None);
    assert_eq!(second.count("emotions", None).await?, 1);
    assert_eq!(engine.opens(), 2);
    Ok(())
}

#[tokio::test]
async fn migration_only_adds() -> Result<(), anyhow::Error> {
    let engine = TestEngine::new();

    let v1 = store(emotions_schema(1), engine.clone());
    v1.insert("emotions", record! { "id": "e1", "userId": "u1", "timestamp": 10 }).await?;
    v1.close().await;

    let v2 = store(full_schema(2), engine.clone());
    v2.init().await?;
    let report = v2.last_migration().expect("v2 migrates");
    assert_eq!((report.from_version, report.to_version), (1, 2));
    assert_eq!(report.created_collections, vec!["users"]);

    // the existing collection and its records survive
    assert_eq!(v2.query_by_index("emotions", "userId", "u1").await?.len(), 1);
    v2.insert("users", record! { "id": "u1", "email": "u1@example.org" }).await?;

    // indexes declared later on an existing collection are not created
    assert_eq!(
        v2.query_by_index_range("emotions", "timestamp", wellstore_core::KeyRange::all()).await.err(),
        Some(StoreError::UnknownIndex { collection: "emotions".into(), index: "timestamp".into() })
    );
    Ok(())
}

#[tokio::test]
async fn failed_migration_changes_nothing() -> Result<(), anyhow::Error> {
    let engine = TestEngine::new();
    let v1 = store(emotions_schema(1), engine.clone());
    v1.insert("emotions", record! { "id": "e1", "userId": "u1" }).await?;
    v1.close().await;

    engine.fail_creating(Some("users"));
    let v2 = store(full_schema(2), engine.clone());
    let err = v2.count("emotions", None).await.err();
    assert_eq!(err, Some(StoreError::Migration { collection: "users".into(), cause: "quota exceeded".into() }));
    assert_eq!(v2.last_migration(), None);
    assert!(!v2.is_open());

    // still at v1: the old schema opens without an upgrade and sees its data
    let again = store(emotions_schema(1), engine.clone());
    assert_eq!(again.count("emotions", None).await?, 1);
    assert_eq!(again.last_migration(), None);
    again.close().await;

    // once the cause is gone the same handle retries and succeeds
    engine.fail_creating(None);
    assert_eq!(v2.count("users", None).await?, 0);
    assert_eq!(v2.last_migration().map(|r| r.created_collections), Some(vec!["users".to_owned()]));
    Ok(())
}

#[tokio::test]
async fn older_schema_than_stored_is_refused() -> Result<(), anyhow::Error> {
    let engine = TestEngine::new();
    store(full_schema(2), engine.clone()).init().await?;

    let err = store(emotions_schema(1), engine.clone()).init().await.err();
    assert!(matches!(err, Some(StoreError::Connection { .. })), "{:?}", err);
    Ok(())
}

#[tokio::test]
async fn migration_creates_the_full_app_schema() -> Result<(), anyhow::Error> {
    let schema = wellstore::app::app_schema()?;
    let handle = wellstore_core::StoreHandle::new(Arc::new(schema.clone()), TestEngine::new());
    handle.init().await?;

    let report = handle.last_migration().expect("fresh database migrates");
    assert_eq!(report.to_version, 3);
    assert_eq!(report.created_collections.len(), schema.collections().len());
    let index_count: usize = schema.collections().iter().map(|c| c.indexes.len()).sum();
    assert_eq!(report.created_indexes.len(), index_count);

    // a schema naming a collection twice never reaches the engine
    let err = Schema::builder("wellness", 1)
        .collection(CollectionSpec::new("emotions", "id"))
        .collection(CollectionSpec::new("emotions", "id").index(IndexSpec::new("userId", "userId")))
        .build()
        .err();
    assert!(err.is_some());
    Ok(())
}
