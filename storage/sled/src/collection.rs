use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use sled::{
    transaction::{abort, Transactional},
    Db, Tree,
};
use tokio::{sync::RwLock, task};
use tracing::trace;
use wellstore_core::{EngineError, Key, KeyRange, Record, StorageCollection};

use crate::{
    catalog::{self, CatalogEntry},
    error::SledEngineError,
    index::{SledIndex, TxError},
};

type ByteBounds = (Bound<Vec<u8>>, Bound<Vec<u8>>);

/// A collection tree plus its index trees.
///
/// Writes hold the write side of the collection lock and run as one sled transaction
/// across all of the trees; reads hold the read side, so they never see a record
/// without its index entries.
#[derive(Clone)]
pub struct SledStorageCollection {
    pub name: String,
    pub db: Db,
    pub records: Tree,
    pub indexes: Arc<[SledIndex]>,
    lock: Arc<RwLock<()>>,
    durable: bool,
}

impl SledStorageCollection {
    pub fn open(db: &Db, name: &str, entry: &CatalogEntry, durable: bool) -> Result<Self, SledEngineError> {
        let records = db.open_tree(catalog::collection_tree(name))?;
        let indexes = entry
            .indexes
            .iter()
            .map(|spec| Ok(SledIndex::new(spec.clone(), db.open_tree(catalog::index_tree(name, &spec.name))?)))
            .collect::<Result<Vec<_>, SledEngineError>>()?;
        Ok(Self { name: name.to_owned(), db: db.clone(), records, indexes: indexes.into(), lock: Arc::new(RwLock::new(())), durable })
    }

    fn index(&self, name: &str) -> Result<&SledIndex, EngineError> {
        self.indexes
            .iter()
            .find(|i| i.name() == name)
            .ok_or_else(|| EngineError::NoSuchIndex { collection: self.name.clone(), index: name.to_owned() })
    }

    /// Record tree first, then the index trees in catalog order.
    fn trees(&self) -> Vec<Tree> {
        let mut trees = Vec::with_capacity(self.indexes.len() + 1);
        trees.push(self.records.clone());
        trees.extend(self.indexes.iter().map(|i| i.tree.clone()));
        trees
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&SledStorageCollection) -> Result<T, SledEngineError> + Send + 'static,
        T: Send + 'static,
    {
        let me = self.clone();
        Ok(task::spawn_blocking(move || f(&me)).await.map_err(SledEngineError::from)??)
    }

    async fn flush(&self) -> Result<(), EngineError> {
        if self.durable {
            self.db.flush_async().await.map_err(SledEngineError::from)?;
        }
        Ok(())
    }

    fn write_blocking(&self, key: Key, record: Record, overwrite: bool) -> Result<(), SledEngineError> {
        let pk = key.encode();
        let bytes = serde_json::to_vec(&record)?;
        let trees = self.trees();

        trees.as_slice().transaction(|tx| {
            let records = &tx[0];
            match records.get(pk.as_slice())? {
                Some(_) if !overwrite => return abort(EngineError::Constraint { index: None }),
                Some(old) => {
                    let old: Record = match serde_json::from_slice(&old) {
                        Ok(old) => old,
                        Err(e) => return abort(EngineError::Codec(e.to_string())),
                    };
                    for (i, index) in self.indexes.iter().enumerate() {
                        index.remove_entry(&tx[i + 1], &pk, &old)?;
                    }
                }
                None => {}
            }
            for (i, index) in self.indexes.iter().enumerate() {
                index.insert_entry(&tx[i + 1], &pk, &record)?;
            }
            records.insert(pk.as_slice(), bytes.as_slice())?;
            Ok::<_, TxError>(())
        })?;
        Ok(())
    }

    fn delete_blocking(&self, key: Key) -> Result<(), SledEngineError> {
        let pk = key.encode();
        let trees = self.trees();

        trees.as_slice().transaction(|tx| {
            let records = &tx[0];
            let Some(old) = records.remove(pk.as_slice())? else { return Ok(()) };
            let old: Record = match serde_json::from_slice(&old) {
                Ok(old) => old,
                Err(e) => return abort(EngineError::Codec(e.to_string())),
            };
            for (i, index) in self.indexes.iter().enumerate() {
                index.remove_entry(&tx[i + 1], &pk, &old)?;
            }
            Ok::<_, TxError>(())
        })?;
        Ok(())
    }

    /// Removes every key of every tree in one transaction. The caller holds the write
    /// lock, so the key lists cannot go stale before the transaction runs.
    fn clear_blocking(&self) -> Result<(), SledEngineError> {
        let trees = self.trees();
        let keys = trees.iter().map(|tree| tree.iter().keys().collect::<Result<Vec<_>, _>>()).collect::<Result<Vec<_>, sled::Error>>()?;

        trees.as_slice().transaction(|tx| {
            for (tree, keys) in tx.iter().zip(&keys) {
                for key in keys {
                    tree.remove(key.clone())?;
                }
            }
            Ok::<_, TxError>(())
        })?;
        Ok(())
    }

    fn get_blocking(&self, key: &Key) -> Result<Option<Record>, SledEngineError> {
        match self.records.get(key.encode())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn range_blocking(&self, bounds: ByteBounds) -> Result<Vec<Record>, SledEngineError> {
        let mut records = Vec::new();
        for item in self.records.range(bounds) {
            let (_, bytes) = item?;
            records.push(serde_json::from_slice(&bytes)?);
        }
        Ok(records)
    }

    fn index_range_blocking(&self, index: &SledIndex, bounds: ByteBounds) -> Result<Vec<Record>, SledEngineError> {
        let mut records = Vec::new();
        for item in index.tree.range(bounds) {
            let (_, pk) = item?;
            match self.records.get(&pk)? {
                Some(bytes) => records.push(serde_json::from_slice(&bytes)?),
                None => return Err(SledEngineError::Corrupt(format!("index {} points at a missing record", index.name()))),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl StorageCollection for SledStorageCollection {
    async fn add(&self, key: Key, record: Record) -> Result<(), EngineError> {
        let _write = self.lock.write().await;
        trace!("sled add {}/{}", self.name, key);
        self.blocking(move |me| me.write_blocking(key, record, false)).await?;
        self.flush().await
    }

    async fn put(&self, key: Key, record: Record) -> Result<(), EngineError> {
        let _write = self.lock.write().await;
        trace!("sled put {}/{}", self.name, key);
        self.blocking(move |me| me.write_blocking(key, record, true)).await?;
        self.flush().await
    }

    async fn get(&self, key: &Key) -> Result<Option<Record>, EngineError> {
        let _read = self.lock.read().await;
        let key = key.clone();
        self.blocking(move |me| me.get_blocking(&key)).await
    }

    async fn get_many(&self, keys: &[Key]) -> Result<Vec<Option<Record>>, EngineError> {
        let _read = self.lock.read().await;
        let keys = keys.to_vec();
        self.blocking(move |me| keys.iter().map(|key| me.get_blocking(key)).collect()).await
    }

    async fn delete(&self, key: &Key) -> Result<(), EngineError> {
        let _write = self.lock.write().await;
        trace!("sled delete {}/{}", self.name, key);
        let key = key.clone();
        self.blocking(move |me| me.delete_blocking(key)).await?;
        self.flush().await
    }

    async fn get_all(&self, range: &KeyRange) -> Result<Vec<Record>, EngineError> {
        let Some(bounds) = range.encoded_bounds() else { return Ok(Vec::new()) };
        let _read = self.lock.read().await;
        self.blocking(move |me| me.range_blocking(bounds)).await
    }

    async fn index_get_all(&self, index: &str, range: &KeyRange) -> Result<Vec<Record>, EngineError> {
        let index = self.index(index)?.clone();
        let Some(bounds) = range.encoded_bounds() else { return Ok(Vec::new()) };
        let _read = self.lock.read().await;
        self.blocking(move |me| me.index_range_blocking(&index, bounds)).await
    }

    async fn count(&self, index: Option<&str>, range: &KeyRange) -> Result<u64, EngineError> {
        let tree = match index {
            Some(name) => self.index(name)?.tree.clone(),
            None => self.records.clone(),
        };
        let Some(bounds) = range.encoded_bounds() else { return Ok(0) };
        let _read = self.lock.read().await;
        self.blocking(move |_| {
            let mut count = 0;
            for item in tree.range(bounds) {
                item?;
                count += 1;
            }
            Ok(count)
        })
        .await
    }

    async fn clear(&self) -> Result<(), EngineError> {
        let _write = self.lock.write().await;
        trace!("sled clear {}", self.name);
        self.blocking(|me| me.clear_blocking()).await?;
        self.flush().await
    }
}
