use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};

use async_trait::async_trait;
use sled::Db;
use tracing::{debug, warn};
use wellstore_core::{EngineError, StorageCollection, StorageConnection, UpgradeHandler};

use crate::{
    catalog::{self, Catalog},
    collection::SledStorageCollection,
    databases::Lease,
    error::SledEngineError,
    version_change::SledVersionChange,
};

pub struct SledConnection {
    pub name: String,
    db: Db,
    version: u32,
    catalog: Catalog,
    durable: bool,
    closed: AtomicBool,
    collections: Mutex<HashMap<String, Arc<SledStorageCollection>>>,
    lease: Mutex<Option<Lease>>,
}

impl SledConnection {
    /// Read the stored version and catalog, running `on_upgrade` first if the stored
    /// version is older than `version`.
    pub(crate) fn open_blocking(name: String, db: Db, lease: Lease, version: u32, on_upgrade: UpgradeHandler, durable: bool) -> Result<Self, SledEngineError> {
        let meta = db.open_tree(catalog::META_TREE)?;
        let stored = catalog::read_version(&meta)?;
        if stored > version {
            return Err(EngineError::VersionTooNew { stored, requested: version }.into());
        }

        let mut catalog = catalog::read_catalog(&meta)?;
        if stored < version {
            let mut tx = SledVersionChange::new(stored, version, catalog);
            on_upgrade(&mut tx)?;
            catalog = tx.commit(&db, &meta)?;
        }
        debug!("{} holds {} collection(s) at v{}", name, catalog.len(), version);

        Ok(Self {
            name,
            db,
            version,
            catalog,
            durable,
            closed: AtomicBool::new(false),
            collections: Mutex::new(HashMap::new()),
            lease: Mutex::new(Some(lease)),
        })
    }
}

#[async_trait]
impl StorageConnection for SledConnection {
    fn version(&self) -> u32 { self.version }

    fn collection_names(&self) -> Vec<String> { self.catalog.keys().cloned().collect() }

    fn index_names(&self, collection: &str) -> Result<Vec<String>, EngineError> {
        let entry = self.catalog.get(collection).ok_or_else(|| EngineError::NoSuchCollection(collection.to_owned()))?;
        Ok(entry.indexes.iter().map(|i| i.name.clone()).collect())
    }

    async fn collection(&self, name: &str) -> Result<Arc<dyn StorageCollection>, EngineError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EngineError::Closed);
        }
        let mut collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(collection) = collections.get(name) {
            return Ok(collection.clone());
        }

        let entry = self.catalog.get(name).ok_or_else(|| EngineError::NoSuchCollection(name.to_owned()))?;
        let collection = Arc::new(SledStorageCollection::open(&self.db, name, entry, self.durable)?);
        collections.insert(name.to_owned(), collection.clone());
        Ok(collection)
    }

    /// Flush and give up this connection's hold on the database. Collections handed out
    /// earlier keep it open until they are dropped too.
    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.db.flush_async().await {
            warn!("flush on close of {} failed: {}", self.name, e);
        }
        self.collections.lock().unwrap_or_else(PoisonError::into_inner).clear();
        drop(self.lease.lock().unwrap_or_else(PoisonError::into_inner).take());
    }
}
