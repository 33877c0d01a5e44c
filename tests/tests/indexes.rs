mod common;

use common::*;
use wellstore_core::{record, Key, KeyRange, StoreError};

fn ids(records: Vec<wellstore_core::Record>) -> Vec<String> { records.iter().filter_map(|r| r["id"].as_str().map(str::to_owned)).collect() }

#[tokio::test]
async fn indexes_follow_every_write() -> Result<(), anyhow::Error> {
    let store = store(full_schema(1), TestEngine::new());

    store.insert("emotions", record! { "id": "e1", "userId": "u1", "timestamp": 100 }).await?;
    store.insert("emotions", record! { "id": "e2", "userId": "u2", "timestamp": 200 }).await?;
    store.insert("emotions", record! { "id": "e3", "userId": "u1", "timestamp": 300 }).await?;

    store.upsert("emotions", record! { "id": "e1", "userId": "u2", "timestamp": 100 }).await?;
    assert_eq!(ids(store.query_by_index("emotions", "userId", "u1").await?), vec!["e3"]);
    assert_eq!(ids(store.query_by_index("emotions", "userId", "u2").await?), vec!["e1", "e2"]);

    store.delete("emotions", "e2").await?;
    assert_eq!(ids(store.query_by_index("emotions", "userId", "u2").await?), vec!["e1"]);
    assert_eq!(store.count_by_index("emotions", "userId", "u2").await?, 1);

    store.clear("emotions").await?;
    assert!(store.query_by_index("emotions", "userId", "u1").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn records_without_the_index_field_are_left_out() -> Result<(), anyhow::Error> {
    let store = store(full_schema(1), TestEngine::new());

    store.insert("emotions", record! { "id": "e1", "userId": "u1", "timestamp": 100 }).await?;
    store.insert("emotions", record! { "id": "e2", "userId": "u1" }).await?;
    store.insert("emotions", record! { "id": "e3", "userId": "u1", "timestamp": { "at": 5 } }).await?;

    assert_eq!(store.count("emotions", None).await?, 3);
    assert_eq!(store.count("emotions", Some(("timestamp", KeyRange::all()))).await?, 1);
    assert_eq!(ids(store.query_by_index_range("emotions", "timestamp", KeyRange::all()).await?), vec!["e1"]);
    Ok(())
}

#[tokio::test]
async fn index_ranges_are_ordered_by_index_key() -> Result<(), anyhow::Error> {
    let store = store(full_schema(1), TestEngine::new());
    for (id, ts) in [("a", 400), ("b", 100), ("c", 300), ("d", 200)] {
        store.insert("emotions", record! { "id": id, "userId": "u1", "timestamp": ts }).await?;
    }

    assert_eq!(ids(store.query_by_index_range("emotions", "timestamp", KeyRange::at_least(200)).await?), vec!["d", "c", "a"]);
    assert_eq!(ids(store.query_by_index_range("emotions", "timestamp", KeyRange::less_than(300)).await?), vec!["b", "d"]);
    assert_eq!(ids(store.query_by_index_range("emotions", "timestamp", KeyRange::between(100, 400, true, true)).await?), vec!["d", "c"]);
    assert_eq!(store.count("emotions", Some(("timestamp", KeyRange::at_most(300)))).await?, 3);

    // an empty range is no results, not an error
    assert!(store.query_by_index_range("emotions", "timestamp", KeyRange::between(300, 100, false, false)).await?.is_empty());
    assert_eq!(store.count("emotions", Some(("timestamp", KeyRange::between(300, 100, false, false)))).await?, 0);
    Ok(())
}

#[tokio::test]
async fn unique_index_rejects_a_second_owner() -> Result<(), anyhow::Error> {
    let store = store(full_schema(1), TestEngine::new());

    store.insert("users", record! { "id": "u1", "email": "ada@example.org" }).await?;
    let err = store.insert("users", record! { "id": "u2", "email": "ada@example.org" }).await.err();
    assert_eq!(
        err,
        Some(StoreError::DuplicateKey { collection: "users".into(), key: Key::from("ada@example.org"), index: Some("email".into()) })
    );
    assert_eq!(store.count("users", None).await?, 1);

    // changing the owner's email frees the old value
    store.upsert("users", record! { "id": "u1", "email": "ada@lovelace.org" }).await?;
    store.insert("users", record! { "id": "u2", "email": "ada@example.org" }).await?;
    assert_eq!(ids(store.query_by_index("users", "email", "ada@example.org").await?), vec!["u2"]);
    Ok(())
}
