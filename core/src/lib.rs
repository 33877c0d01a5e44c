//! # wellstore-core
//!
//! Engine-agnostic core of the wellstore embedded record store.
//!
//! A [`Schema`] names every collection, its primary-key field and its secondary
//! indexes. A [`StoreHandle`] lazily opens one connection to a [`StorageEngine`],
//! running the additive [`migration`] when the stored version is older than the
//! schema's, and exposes asynchronous CRUD and index queries over dynamically
//! shaped JSON records.
//!
//! ```rust,ignore
//! let schema = Schema::builder("wellness", 1)
//!     .collection(CollectionSpec::new("emotions", "id").index(IndexSpec::new("userId", "userId")))
//!     .build()?;
//! let store = StoreHandle::new(Arc::new(schema), Arc::new(SledStorageEngine::new_test()?));
//! store.insert("emotions", record!{ "id": "e1", "userId": "u1", "mood": "happy" }).await?;
//! let entries = store.query_by_index("emotions", "userId", "u1").await?;
//! ```

pub mod error;
pub mod handle;
pub mod key;
pub mod migration;
mod operations;
pub mod range;
pub mod record;
pub mod schema;
pub mod storage;
pub mod translate;
pub mod typed;

pub use error::{SchemaError, StoreError};
pub use handle::StoreHandle;
pub use key::Key;
pub use migration::MigrationReport;
pub use range::KeyRange;
pub use record::Record;
pub use schema::{CollectionSpec, IndexSpec, Schema};
pub use storage::{EngineError, StorageCollection, StorageConnection, StorageEngine, UpgradeHandler, VersionChange};
pub use typed::{Model, Typed};

pub use serde_json;

/// Build a [`Record`] from JSON object syntax.
#[macro_export]
macro_rules! record {
    ($($tt:tt)*) => {
        match $crate::serde_json::json!({ $($tt)* }) {
            $crate::serde_json::Value::Object(map) => map,
            _ => unreachable!("record! always builds an object"),
        }
    };
}
