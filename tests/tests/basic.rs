mod common;

use common::*;
use wellstore_core::{record, Key, KeyRange, StoreError};

#[tokio::test]
async fn emotions_scenario() -> Result<(), anyhow::Error> {
    let store = store(emotions_schema(1), TestEngine::new());

    store.insert("emotions", record! { "id": "e1", "userId": "u1", "mood": "happy" }).await?;
    store.insert("emotions", record! { "id": "e2", "userId": "u1", "mood": "sad" }).await?;

    let mut moods: Vec<String> =
        store.query_by_index("emotions", "userId", "u1").await?.iter().filter_map(|r| r["mood"].as_str().map(str::to_owned)).collect();
    moods.sort();
    assert_eq!(moods, vec!["happy", "sad"]);
    assert_eq!(store.count("emotions", None).await?, 2);

    store.delete("emotions", "e1").await?;
    assert_eq!(store.count("emotions", None).await?, 1);
    Ok(())
}

#[tokio::test]
async fn records_round_trip_unchanged() -> Result<(), anyhow::Error> {
    let store = store(emotions_schema(1), TestEngine::new());
    let entry = record! {
        "id": "e1",
        "userId": "u1",
        "mood": "anxious",
        "intensity": 4,
        "tags": ["work", "sleep"],
        "context": { "location": "home", "withOthers": false },
        "note": null
    };

    let key = store.insert("emotions", entry.clone()).await?;
    assert_eq!(key, Key::from("e1"));
    assert_eq!(store.get("emotions", "e1").await?, Some(entry));
    assert_eq!(store.get("emotions", "missing").await?, None);
    Ok(())
}

#[tokio::test]
async fn upsert_overwrites_and_insert_refuses() -> Result<(), anyhow::Error> {
    let store = store(emotions_schema(1), TestEngine::new());

    store.upsert("emotions", record! { "id": "e1", "userId": "u1", "mood": "happy" }).await?;
    store.upsert("emotions", record! { "id": "e1", "userId": "u1", "mood": "tired" }).await?;
    assert_eq!(store.get("emotions", "e1").await?.map(|r| r["mood"].clone()), Some("tired".into()));
    assert_eq!(store.count("emotions", None).await?, 1);

    let err = store.insert("emotions", record! { "id": "e1", "userId": "u2" }).await.err();
    assert_eq!(err, Some(StoreError::DuplicateKey { collection: "emotions".into(), key: Key::from("e1"), index: None }));
    // the rejected insert changed nothing
    assert_eq!(store.get("emotions", "e1").await?.map(|r| r["userId"].clone()), Some("u1".into()));
    Ok(())
}

#[tokio::test]
async fn deleting_an_absent_key_is_a_no_op() -> Result<(), anyhow::Error> {
    let store = store(emotions_schema(1), TestEngine::new());
    store.insert("emotions", record! { "id": "e1", "userId": "u1" }).await?;

    store.delete("emotions", "nope").await?;
    store.delete("emotions", "nope").await?;
    assert_eq!(store.count("emotions", None).await?, 1);
    Ok(())
}

#[tokio::test]
async fn invalid_records_and_unknown_names() -> Result<(), anyhow::Error> {
    let engine = TestEngine::new();
    let store = store(emotions_schema(1), engine.clone());

    let err = store.insert("emotions", record! { "userId": "u1" }).await.err();
    assert!(matches!(err, Some(StoreError::InvalidRecord { ref collection, .. }) if collection == "emotions"), "{:?}", err);
    let err = store.upsert("emotions", record! { "id": true }).await.err();
    assert!(matches!(err, Some(StoreError::InvalidRecord { .. })), "{:?}", err);

    assert_eq!(store.scan_all("journal").await.err(), Some(StoreError::UnknownCollection("journal".into())));
    assert_eq!(
        store.query_by_index("emotions", "mood", "happy").await.err(),
        Some(StoreError::UnknownIndex { collection: "emotions".into(), index: "mood".into() })
    );
    assert_eq!(store.count("emotions", None).await?, 0);
    Ok(())
}

#[tokio::test]
async fn scans_follow_primary_key_order() -> Result<(), anyhow::Error> {
    let store = store(emotions_schema(1), TestEngine::new());
    for id in ["e3", "e1", "e4", "e2"] {
        store.insert("emotions", record! { "id": id, "userId": "u1" }).await?;
    }
    let ids = |records: Vec<wellstore_core::Record>| records.iter().filter_map(|r| r["id"].as_str().map(str::to_owned)).collect::<Vec<_>>();

    assert_eq!(ids(store.scan_all("emotions").await?), vec!["e1", "e2", "e3", "e4"]);
    assert_eq!(ids(store.scan_range("emotions", KeyRange::between("e2", "e4", false, true)).await?), vec!["e2", "e3"]);
    assert!(store.scan_range("emotions", KeyRange::between("e4", "e1", false, false)).await?.is_empty());

    let many = store.get_many("emotions", &[Key::from("e2"), Key::from("e9")]).await?;
    assert_eq!(many.iter().map(Option::is_some).collect::<Vec<_>>(), vec![true, false]);

    store.clear("emotions").await?;
    assert!(store.scan_all("emotions").await?.is_empty());
    Ok(())
}
