//! # wellstore
//!
//! Local persistent record store for a wellness-tracking application.
//!
//! Data lives in named collections of open JSON records, each with a primary-key field
//! and optional secondary indexes. A versioned [`Schema`] describes the collections; the
//! first operation on a [`StoreHandle`] opens the database and creates whatever the
//! stored version is missing. Nothing is ever dropped by a migration.
//!
//! Storage engines:
//! - `wellstore-storage-sled` for native targets (enabled by the default `sled` feature)
//! - `wellstore-storage-indexeddb-wasm` for the browser
//!
//! ## Example
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use wellstore::{app, sled::SledStorageEngine, KeyRange};
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = app::open(Arc::new(SledStorageEngine::new()?))?;
//! let emotions = store.typed::<app::Emotion>();
//!
//! emotions
//!     .insert(&app::Emotion { id: "e1".into(), user_id: "u1".into(), mood: "calm".into(), intensity: 3, note: None, timestamp: 1_700_000_000 })
//!     .await?;
//! let mine = emotions.by_index("userId", "u1").await?;
//! let recent = emotions.by_index_range("timestamp", KeyRange::at_least(1_600_000_000)).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;

pub use wellstore_core as core;
pub use wellstore_core::{
    record, CollectionSpec, EngineError, IndexSpec, Key, KeyRange, MigrationReport, Model, Record, Schema, SchemaError, StorageEngine,
    StoreError, StoreHandle, Typed,
};

#[cfg(feature = "sled")]
pub use wellstore_storage_sled as sled;
