//! The seam between the store and a physical engine.
//!
//! An engine mirrors the host object-store model: a database opened at a version,
//! an upgrade callback that is the only place structural changes are legal, and
//! per-collection transactions. Engines report failures as [`EngineError`]; the
//! store turns them into [`crate::StoreError`] in [`crate::translate`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::{key::Key, range::KeyRange, record::Record, schema::IndexSpec};

/// Failure reported by an engine. Causes are rendered to strings so errors stay `Clone`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("storage is not supported in this environment")]
    Unsupported,

    #[error("open failed: {0}")]
    Open(String),

    #[error("stored version {stored} is newer than requested version {requested}")]
    VersionTooNew { stored: u32, requested: u32 },

    #[error("upgrade blocked by another open connection")]
    Blocked,

    #[error("connection is closed")]
    Closed,

    #[error("upgrade of `{collection}` failed: {cause}")]
    Upgrade { collection: String, cause: String },

    #[error("no such collection `{0}`")]
    NoSuchCollection(String),

    #[error("no such index `{index}` on `{collection}`")]
    NoSuchIndex { collection: String, index: String },

    #[error("collection `{0}` already exists")]
    CollectionExists(String),

    #[error("index `{index}` already exists on `{collection}`")]
    IndexExists { collection: String, index: String },

    /// A primary key (`index: None`) or unique index value is already taken.
    #[error("constraint violated{}", .index.as_ref().map(|i| format!(" on index `{}`", i)).unwrap_or_default())]
    Constraint { index: Option<String> },

    #[error("transaction aborted: {0}")]
    Aborted(String),

    #[error("quota exceeded")]
    QuotaExceeded,

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("codec failure: {0}")]
    Codec(String),
}

/// Structural operations available while a database is being upgraded.
pub trait VersionChange {
    /// Version on disk before this upgrade (0 for a new database).
    fn old_version(&self) -> u32;
    fn new_version(&self) -> u32;

    fn collection_names(&self) -> Vec<String>;
    fn has_collection(&self, name: &str) -> bool { self.collection_names().iter().any(|n| n == name) }
    fn index_names(&self, collection: &str) -> Vec<String>;

    fn create_collection(&mut self, name: &str, primary_key: &str) -> Result<(), EngineError>;
    fn create_index(&mut self, collection: &str, index: &IndexSpec) -> Result<(), EngineError>;
}

/// Callback run by the engine inside its exclusive upgrade step. Returning an error
/// aborts the open and leaves the stored version unchanged.
pub type UpgradeHandler = Box<dyn FnOnce(&mut dyn VersionChange) -> Result<(), EngineError> + Send>;

#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Whether the host exposes the storage this engine needs.
    fn is_supported(&self) -> bool;

    /// Open `name` at `version`, invoking `on_upgrade` first if the stored version is older.
    async fn open(&self, name: &str, version: u32, on_upgrade: UpgradeHandler) -> Result<Arc<dyn StorageConnection>, EngineError>;

    /// Physically delete a database. Callers close their connection first.
    async fn delete_database(&self, name: &str) -> Result<(), EngineError>;
}

#[async_trait]
pub trait StorageConnection: Send + Sync {
    fn version(&self) -> u32;
    fn collection_names(&self) -> Vec<String>;
    fn index_names(&self, collection: &str) -> Result<Vec<String>, EngineError>;

    /// Handle to one collection; every call on it is its own transaction.
    async fn collection(&self, name: &str) -> Result<Arc<dyn StorageCollection>, EngineError>;

    async fn close(&self);
}

/// One collection. Each method runs as one transaction: read-only for queries,
/// read-write for mutations, serialized with other writes to the same collection.
#[async_trait]
pub trait StorageCollection: Send + Sync {
    /// Insert; fails with `Constraint` if the key or a unique index value exists.
    async fn add(&self, key: Key, record: Record) -> Result<(), EngineError>;

    /// Insert or overwrite.
    async fn put(&self, key: Key, record: Record) -> Result<(), EngineError>;

    async fn get(&self, key: &Key) -> Result<Option<Record>, EngineError>;

    async fn get_many(&self, keys: &[Key]) -> Result<Vec<Option<Record>>, EngineError> {
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            records.push(self.get(key).await?);
        }
        Ok(records)
    }

    /// Delete; an absent key is not an error.
    async fn delete(&self, key: &Key) -> Result<(), EngineError>;

    /// Records whose primary key is in `range`, ascending by primary key.
    async fn get_all(&self, range: &KeyRange) -> Result<Vec<Record>, EngineError>;

    /// Records whose `index` key is in `range`, ascending by index key.
    async fn index_get_all(&self, index: &str, range: &KeyRange) -> Result<Vec<Record>, EngineError>;

    /// Count by primary key range, or by index key range when `index` is given.
    async fn count(&self, index: Option<&str>, range: &KeyRange) -> Result<u64, EngineError>;

    /// Remove every record; index definitions stay.
    async fn clear(&self) -> Result<(), EngineError>;
}
