mod common;

use common::*;
use wellstore::app::{self, Emotion, Settings, ToolUsage, User};
use wellstore_core::{record, KeyRange, StoreError};

fn emotion(id: &str, user: &str, mood: &str, timestamp: i64) -> Emotion {
    Emotion { id: id.into(), user_id: user.into(), mood: mood.into(), intensity: 3, note: None, timestamp }
}

#[tokio::test]
async fn typed_emotion_diary() -> Result<(), anyhow::Error> {
    let store = app::open(TestEngine::new())?;
    let emotions = store.typed::<Emotion>();

    emotions.insert(&emotion("e1", "u1", "happy", 100)).await?;
    emotions.insert(&emotion("e2", "u1", "sad", 200)).await?;
    emotions.insert(&emotion("e3", "u2", "calm", 300)).await?;

    assert_eq!(emotions.get("e2").await?, Some(emotion("e2", "u1", "sad", 200)));
    assert_eq!(emotions.by_index("userId", "u1").await?.len(), 2);
    let recent: Vec<String> = emotions.by_index_range("timestamp", KeyRange::greater_than(100)).await?.into_iter().map(|e| e.id).collect();
    assert_eq!(recent, vec!["e2", "e3"]);

    let mut edited = emotion("e1", "u1", "happy", 100);
    edited.note = Some("slept well".into());
    emotions.upsert(&edited).await?;
    assert_eq!(emotions.get("e1").await?.and_then(|e| e.note), Some("slept well".into()));

    emotions.delete("e3").await?;
    assert_eq!(emotions.count().await?, 2);
    assert_eq!(emotions.all().await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn settings_are_keyed_by_owner() -> Result<(), anyhow::Error> {
    let store = app::open(TestEngine::new())?;
    let settings = store.typed::<Settings>();

    let mut mine = Settings { user_id: "u1".into(), coping_priorities: vec!["breathing".into(), "walk".into()], ..Default::default() };
    settings.upsert(&mine).await?;
    mine.rejected_coping_methods.push("walk".into());
    mine.coping_priorities.retain(|m| m != "walk");
    settings.upsert(&mine).await?;

    assert_eq!(settings.get("u1").await?, Some(mine));
    assert_eq!(settings.count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn unique_email_and_tool_usage_lookups() -> Result<(), anyhow::Error> {
    let store = app::open(TestEngine::new())?;
    let users = store.typed::<User>();
    users.insert(&User { id: "u1".into(), email: "kim@example.org".into(), name: "Kim".into(), is_parent: true, created_at: 1 }).await?;
    let err = users.insert(&User { id: "u2".into(), email: "kim@example.org".into(), name: "Kim B".into(), is_parent: false, created_at: 2 }).await.err();
    assert!(matches!(err, Some(StoreError::DuplicateKey { index: Some(ref index), .. }) if index == "email"), "{:?}", err);

    let usage = store.typed::<ToolUsage>();
    for (id, tool) in [("t1", "breathing"), ("t2", "journaling"), ("t3", "breathing")] {
        usage.insert(&ToolUsage { id: id.into(), user_id: "u1".into(), tool_type: tool.into(), duration_seconds: 120, helpful: Some(true), used_at: 5 }).await?;
    }
    assert_eq!(usage.by_index("toolType", "breathing").await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn records_that_do_not_fit_the_model_are_errors() -> Result<(), anyhow::Error> {
    let store = app::open(TestEngine::new())?;
    // written untyped, missing required model fields
    store.insert("emotions", record! { "id": "odd", "userId": "u1" }).await?;

    let err = store.typed::<Emotion>().get("odd").await.err();
    assert!(matches!(err, Some(StoreError::InvalidRecord { ref collection, .. }) if collection == "emotions"), "{:?}", err);
    Ok(())
}
