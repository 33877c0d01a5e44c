mod common;

use std::sync::Arc;

use common::*;
use wellstore_core::{record, StoreHandle};
use wellstore_storage_sled::{SledConfig, SledStorageEngine};

#[tokio::test]
async fn close_then_reopen_on_demand() -> Result<(), anyhow::Error> {
    let engine = TestEngine::new();
    let store = store(emotions_schema(1), engine.clone());

    store.insert("emotions", record! { "id": "e1", "userId": "u1" }).await?;
    assert!(store.is_open());
    store.close().await;
    assert!(!store.is_open());

    assert_eq!(store.count("emotions", None).await?, 1);
    assert_eq!(engine.opens(), 2);
    Ok(())
}

#[tokio::test]
async fn delete_database_starts_over() -> Result<(), anyhow::Error> {
    let engine = TestEngine::new();
    let store = store(emotions_schema(1), engine.clone());
    store.insert("emotions", record! { "id": "e1", "userId": "u1" }).await?;

    store.delete_database().await?;
    assert!(!store.is_open());
    assert_eq!(store.last_migration(), None);

    // the next operation recreates the database from scratch
    assert_eq!(store.count("emotions", None).await?, 0);
    assert_eq!(store.last_migration().map(|r| r.from_version), Some(0));
    Ok(())
}

#[tokio::test]
async fn data_persists_on_disk() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let open = || -> Result<StoreHandle, anyhow::Error> {
        let engine = SledStorageEngine::with_config(SledConfig::new().path(dir.path()).durable(true))?;
        Ok(store(emotions_schema(1), Arc::new(engine)))
    };

    {
        let store = open()?;
        store.insert("emotions", record! { "id": "e1", "userId": "u1", "mood": "calm" }).await?;
        store.close().await;
    }

    let store = open()?;
    assert_eq!(store.get("emotions", "e1").await?, Some(record! { "id": "e1", "userId": "u1", "mood": "calm" }));
    assert_eq!(store.last_migration(), None);
    Ok(())
}
