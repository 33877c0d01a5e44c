mod common;

use std::time::Duration;

use common::*;
use futures::future::join_all;
use wellstore_core::{record, StoreError};

#[tokio::test]
async fn concurrent_first_calls_share_one_open() -> Result<(), anyhow::Error> {
    let engine = TestEngine::new();
    engine.delay_opens(Duration::from_millis(50));
    let store = store(emotions_schema(1), engine.clone());

    let writes = (0..16).map(|i| {
        let store = store.clone();
        tokio::spawn(async move { store.insert("emotions", record! { "id": format!("e{}", i), "userId": "u1" }).await })
    });
    for result in join_all(writes).await {
        result??;
    }

    assert_eq!(engine.opens(), 1);
    assert_eq!(store.count("emotions", None).await?, 16);
    assert_eq!(engine.opens(), 1);
    Ok(())
}

#[tokio::test]
async fn a_failed_open_is_shared_then_retried() -> Result<(), anyhow::Error> {
    let engine = TestEngine::new();
    engine.delay_opens(Duration::from_millis(50));
    engine.fail_creating(Some("emotions"));
    let store = store(emotions_schema(1), engine.clone());

    let (a, b, c) = tokio::join!(store.count("emotions", None), store.scan_all("emotions"), store.init());
    let expected = StoreError::Migration { collection: "emotions".into(), cause: "quota exceeded".into() };
    assert_eq!(a.err(), Some(expected.clone()));
    assert_eq!(b.err(), Some(expected.clone()));
    assert_eq!(c.err(), Some(expected));
    assert_eq!(engine.opens(), 1);

    engine.fail_creating(None);
    assert_eq!(store.count("emotions", None).await?, 0);
    assert_eq!(engine.opens(), 2);
    Ok(())
}

#[tokio::test]
async fn concurrent_writes_to_one_key_leave_one_winner() -> Result<(), anyhow::Error> {
    let store = store(emotions_schema(1), TestEngine::new());
    store.init().await?;

    let inserts = (0..8).map(|i| {
        let store = store.clone();
        tokio::spawn(async move { store.insert("emotions", record! { "id": "same", "userId": format!("u{}", i) }).await })
    });
    let results: Vec<_> = join_all(inserts).await.into_iter().collect::<Result<_, _>>()?;
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results.iter().all(|r| matches!(r, Ok(_) | Err(StoreError::DuplicateKey { .. }))));

    // the index holds exactly the winner's entry
    assert_eq!(store.count("emotions", Some(("userId", wellstore_core::KeyRange::all()))).await?, 1);
    Ok(())
}
