//! Record Operations.
//!
//! Every operation waits for the connection (its error is returned unchanged), checks
//! collection and index names (and, for writes, the record's primary key) against the
//! schema, and then runs exactly one engine transaction.

use std::sync::Arc;

use tracing::trace;

use crate::{
    error::StoreError,
    handle::StoreHandle,
    key::Key,
    range::KeyRange,
    record::{self, Record},
    schema::CollectionSpec,
    storage::{EngineError, StorageCollection, StorageConnection},
    translate::{translate, Context},
};

impl StoreHandle {
    /// Insert a new record and return its primary key.
    ///
    /// Fails with `DuplicateKey` if the primary key or a unique index value is taken.
    pub async fn insert(&self, collection: &str, record: Record) -> Result<Key, StoreError> {
        let _op = self.begin_op();
        let connection = self.ensure_ready().await?;
        let spec = self.schema().collection(collection)?;
        let key = record_key(spec, &record)?;
        let unique = unique_values(spec, &record);

        let store = open(&connection, collection).await?;
        trace!("insert {}/{}", collection, key);
        store.add(key.clone(), record).await.map_err(|e| write_error(e, collection, &key, &unique))?;
        Ok(key)
    }

    pub async fn get(&self, collection: &str, key: impl Into<Key>) -> Result<Option<Record>, StoreError> {
        let key = key.into();
        let _op = self.begin_op();
        let connection = self.ensure_ready().await?;
        self.schema().collection(collection)?;

        let store = open(&connection, collection).await?;
        trace!("get {}/{}", collection, key);
        store.get(&key).await.map_err(|e| translate(e, Context::collection(collection)))
    }

    /// Read several records in one transaction, in the order of `keys`.
    pub async fn get_many(&self, collection: &str, keys: &[Key]) -> Result<Vec<Option<Record>>, StoreError> {
        let _op = self.begin_op();
        let connection = self.ensure_ready().await?;
        self.schema().collection(collection)?;

        let store = open(&connection, collection).await?;
        trace!("get {} key(s) from {}", keys.len(), collection);
        store.get_many(keys).await.map_err(|e| translate(e, Context::collection(collection)))
    }

    /// Insert or overwrite the record stored under the record's primary key.
    pub async fn upsert(&self, collection: &str, record: Record) -> Result<(), StoreError> {
        let _op = self.begin_op();
        let connection = self.ensure_ready().await?;
        let spec = self.schema().collection(collection)?;
        let key = record_key(spec, &record)?;
        let unique = unique_values(spec, &record);

        let store = open(&connection, collection).await?;
        trace!("upsert {}/{}", collection, key);
        store.put(key.clone(), record).await.map_err(|e| write_error(e, collection, &key, &unique))
    }

    /// Delete by primary key. Deleting an absent key succeeds.
    pub async fn delete(&self, collection: &str, key: impl Into<Key>) -> Result<(), StoreError> {
        let key = key.into();
        let _op = self.begin_op();
        let connection = self.ensure_ready().await?;
        self.schema().collection(collection)?;

        let store = open(&connection, collection).await?;
        trace!("delete {}/{}", collection, key);
        store.delete(&key).await.map_err(|e| translate(e, Context::collection(collection)))
    }

    /// Every record, ascending by primary key.
    pub async fn scan_all(&self, collection: &str) -> Result<Vec<Record>, StoreError> { self.scan_range(collection, KeyRange::all()).await }

    /// Records whose primary key lies in `range`, ascending by primary key.
    pub async fn scan_range(&self, collection: &str, range: KeyRange) -> Result<Vec<Record>, StoreError> {
        let _op = self.begin_op();
        let connection = self.ensure_ready().await?;
        self.schema().collection(collection)?;
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let store = open(&connection, collection).await?;
        trace!("scan {} {:?}", collection, range);
        store.get_all(&range).await.map_err(|e| translate(e, Context::collection(collection)))
    }

    /// Records whose `index` key equals `key`.
    pub async fn query_by_index(&self, collection: &str, index: &str, key: impl Into<Key>) -> Result<Vec<Record>, StoreError> {
        self.query_by_index_range(collection, index, KeyRange::only(key)).await
    }

    /// Records whose `index` key lies in `range`, ascending by index key.
    pub async fn query_by_index_range(&self, collection: &str, index: &str, range: KeyRange) -> Result<Vec<Record>, StoreError> {
        let _op = self.begin_op();
        let connection = self.ensure_ready().await?;
        self.schema().index(collection, index)?;
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let store = open(&connection, collection).await?;
        trace!("query {}.{} {:?}", collection, index, range);
        store.index_get_all(index, &range).await.map_err(|e| translate(e, Context::collection(collection)))
    }

    /// Number of records, optionally restricted to an index key range.
    pub async fn count(&self, collection: &str, by_index: Option<(&str, KeyRange)>) -> Result<u64, StoreError> {
        let _op = self.begin_op();
        let connection = self.ensure_ready().await?;
        let (index, range) = match by_index {
            Some((index, range)) => {
                self.schema().index(collection, index)?;
                (Some(index), range)
            }
            None => {
                self.schema().collection(collection)?;
                (None, KeyRange::all())
            }
        };
        if range.is_empty() {
            return Ok(0);
        }

        let store = open(&connection, collection).await?;
        store.count(index, &range).await.map_err(|e| translate(e, Context::collection(collection)))
    }

    pub async fn count_by_index(&self, collection: &str, index: &str, key: impl Into<Key>) -> Result<u64, StoreError> {
        self.count(collection, Some((index, KeyRange::only(key)))).await
    }

    /// Remove every record from a collection. Its indexes stay defined.
    pub async fn clear(&self, collection: &str) -> Result<(), StoreError> {
        let _op = self.begin_op();
        let connection = self.ensure_ready().await?;
        self.schema().collection(collection)?;

        let store = open(&connection, collection).await?;
        trace!("clear {}", collection);
        store.clear().await.map_err(|e| translate(e, Context::collection(collection)))
    }
}

async fn open(connection: &Arc<dyn StorageConnection>, collection: &str) -> Result<Arc<dyn StorageCollection>, StoreError> {
    connection.collection(collection).await.map_err(|e| translate(e, Context::collection(collection)))
}

fn record_key(spec: &CollectionSpec, record: &Record) -> Result<Key, StoreError> {
    record::primary_key(record, &spec.primary_key).map_err(|reason| StoreError::invalid_record(&spec.name, reason))
}

/// Values of the record's unique index fields, kept to report which value clashed.
fn unique_values(spec: &CollectionSpec, record: &Record) -> Vec<(String, Key)> {
    spec.indexes.iter().filter(|i| i.unique).filter_map(|i| Some((i.name.clone(), record::key_at(record, &i.key_field)?))).collect()
}

fn write_error(error: EngineError, collection: &str, key: &Key, unique: &[(String, Key)]) -> StoreError {
    let key = match &error {
        EngineError::Constraint { index: Some(index) } => unique.iter().find(|(name, _)| name == index).map(|(_, value)| value).unwrap_or(key),
        _ => key,
    };
    translate(error, Context::write(collection, key))
}
