use async_trait::async_trait;
use send_wrapper::SendWrapper;
use tracing::debug;
use wasm_bindgen::JsValue;
use web_sys::{IdbDatabase, IdbIndex, IdbObjectStore, IdbRequest, IdbTransaction, IdbTransactionMode};
use wellstore_core::{record::key_at, EngineError, Key, KeyRange, Record, StorageCollection};

use crate::{
    convert::{count_from_js, key_from_js, key_to_js, maybe_record, range_to_js, record_to_js, records_from_js},
    error::{dom_error, is_not_found},
    request::{committed, settled},
    version_change::string_list,
};

/// One object store. Every call runs in its own IndexedDB transaction; the browser keeps
/// record and index updates of a write atomic and orders overlapping transactions.
pub struct IdbCollection {
    name: String,
    db: SendWrapper<IdbDatabase>,
}

fn step<T>(res: Result<T, JsValue>, what: &'static str) -> Result<T, EngineError> { res.map_err(|e| dom_error(e, what)) }

impl IdbCollection {
    pub(crate) fn new(db: SendWrapper<IdbDatabase>, name: &str) -> Self { Self { name: name.to_owned(), db } }

    fn store(&self, mode: IdbTransactionMode) -> Result<(IdbTransaction, IdbObjectStore), EngineError> {
        let missing = |e: JsValue| if is_not_found(&e) { EngineError::NoSuchCollection(self.name.clone()) } else { dom_error(e, "create transaction") };
        let transaction = self.db.transaction_with_str_and_mode(&self.name, mode).map_err(missing)?;
        let store = transaction.object_store(&self.name).map_err(missing)?;
        Ok((transaction, store))
    }

    fn index(&self, store: &IdbObjectStore, name: &str) -> Result<IdbIndex, EngineError> {
        store.index(name).map_err(|_| EngineError::NoSuchIndex { collection: self.name.clone(), index: name.to_owned() })
    }

    async fn write(&self, key: Key, record: Record, overwrite: bool) -> Result<(), EngineError> {
        let value = record_to_js(&record)?;
        let (transaction, store) = self.store(IdbTransactionMode::Readwrite)?;
        let request = step(if overwrite { store.put(&value) } else { store.add(&value) }, "write record")?;
        match settled(&request, "write record").await {
            Ok(_) => committed(&transaction, "write record").await,
            Err(EngineError::Constraint { .. }) => Err(self.constraint(&key, &record, overwrite).await),
            Err(e) => Err(e),
        }
    }

    /// IndexedDB reports a bare ConstraintError; probe the primary key and each unique
    /// index to name the one that rejected the write.
    async fn constraint(&self, key: &Key, record: &Record, overwrite: bool) -> EngineError {
        match self.clashing_index(key, record, overwrite).await {
            Ok(index) => EngineError::Constraint { index },
            Err(e) => {
                debug!("could not attribute constraint failure in {}: {}", self.name, e);
                EngineError::Constraint { index: None }
            }
        }
    }

    async fn clashing_index(&self, key: &Key, record: &Record, overwrite: bool) -> Result<Option<String>, EngineError> {
        let (_transaction, store) = self.store(IdbTransactionMode::Readonly)?;

        // issue every probe before awaiting any, so the transaction stays active
        let primary = if overwrite { None } else { Some(step(store.count_with_key(&key_to_js(key)), "probe primary key")?) };
        let mut owners: Vec<(String, IdbRequest)> = Vec::new();
        for name in string_list(&store.index_names()) {
            let index = self.index(&store, &name)?;
            if !index.unique() {
                continue;
            }
            let Some(path) = index.key_path().ok().and_then(|p| p.as_string()) else { continue };
            let Some(value) = key_at(record, &path) else { continue };
            owners.push((name, step(index.get_key(&key_to_js(&value)), "probe unique index")?));
        }

        if let Some(request) = primary {
            if count_from_js(&settled(&request, "probe primary key").await?)? > 0 {
                return Ok(None);
            }
        }
        for (name, request) in owners {
            let owner = settled(&request, "probe unique index").await?;
            if key_from_js(&owner).is_some_and(|owner| owner != *key) {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    async fn remove(&self, key: &Key) -> Result<(), EngineError> {
        let (transaction, store) = self.store(IdbTransactionMode::Readwrite)?;
        let request = step(store.delete(&key_to_js(key)), "delete record")?;
        settled(&request, "delete record").await?;
        committed(&transaction, "delete record").await
    }

    async fn fetch(&self, key: &Key) -> Result<Option<Record>, EngineError> {
        let (_transaction, store) = self.store(IdbTransactionMode::Readonly)?;
        let request = step(store.get(&key_to_js(key)), "get record")?;
        maybe_record(settled(&request, "get record").await?)
    }

    async fn fetch_many(&self, keys: &[Key]) -> Result<Vec<Option<Record>>, EngineError> {
        let (_transaction, store) = self.store(IdbTransactionMode::Readonly)?;
        let requests = keys.iter().map(|key| step(store.get(&key_to_js(key)), "get record")).collect::<Result<Vec<_>, _>>()?;
        let mut records = Vec::with_capacity(requests.len());
        for request in requests {
            records.push(maybe_record(settled(&request, "get record").await?)?);
        }
        Ok(records)
    }

    async fn fetch_range(&self, index: Option<&str>, range: &KeyRange) -> Result<Vec<Record>, EngineError> {
        let (_transaction, store) = self.store(IdbTransactionMode::Readonly)?;
        let range = range_to_js(range)?;
        let request = match (index, &range) {
            (None, None) => step(store.get_all(), "get all records")?,
            (None, Some(range)) => step(store.get_all_with_key(range), "get all records")?,
            (Some(name), None) => step(self.index(&store, name)?.get_all(), "get all by index")?,
            (Some(name), Some(range)) => step(self.index(&store, name)?.get_all_with_key(range), "get all by index")?,
        };
        records_from_js(settled(&request, "get all records").await?)
    }

    async fn tally(&self, index: Option<&str>, range: &KeyRange) -> Result<u64, EngineError> {
        let (_transaction, store) = self.store(IdbTransactionMode::Readonly)?;
        let range = range_to_js(range)?;
        let request = match (index, &range) {
            (None, None) => step(store.count(), "count records")?,
            (None, Some(range)) => step(store.count_with_key(range), "count records")?,
            (Some(name), None) => step(self.index(&store, name)?.count(), "count by index")?,
            (Some(name), Some(range)) => step(self.index(&store, name)?.count_with_key(range), "count by index")?,
        };
        count_from_js(&settled(&request, "count records").await?)
    }

    async fn clear_all(&self) -> Result<(), EngineError> {
        let (transaction, store) = self.store(IdbTransactionMode::Readwrite)?;
        let request = step(store.clear(), "clear store")?;
        settled(&request, "clear store").await?;
        committed(&transaction, "clear store").await
    }
}

#[async_trait]
impl StorageCollection for IdbCollection {
    async fn add(&self, key: Key, record: Record) -> Result<(), EngineError> { SendWrapper::new(self.write(key, record, false)).await }

    async fn put(&self, key: Key, record: Record) -> Result<(), EngineError> { SendWrapper::new(self.write(key, record, true)).await }

    async fn get(&self, key: &Key) -> Result<Option<Record>, EngineError> { SendWrapper::new(self.fetch(key)).await }

    async fn get_many(&self, keys: &[Key]) -> Result<Vec<Option<Record>>, EngineError> { SendWrapper::new(self.fetch_many(keys)).await }

    async fn delete(&self, key: &Key) -> Result<(), EngineError> { SendWrapper::new(self.remove(key)).await }

    async fn get_all(&self, range: &KeyRange) -> Result<Vec<Record>, EngineError> { SendWrapper::new(self.fetch_range(None, range)).await }

    async fn index_get_all(&self, index: &str, range: &KeyRange) -> Result<Vec<Record>, EngineError> {
        SendWrapper::new(self.fetch_range(Some(index), range)).await
    }

    async fn count(&self, index: Option<&str>, range: &KeyRange) -> Result<u64, EngineError> { SendWrapper::new(self.tally(index, range)).await }

    async fn clear(&self) -> Result<(), EngineError> { SendWrapper::new(self.clear_all()).await }
}
