use wasm_bindgen::JsValue;
use web_sys::{DomStringList, IdbDatabase, IdbIndexParameters, IdbObjectStoreParameters, IdbTransaction};
use wellstore_core::{EngineError, IndexSpec, VersionChange};

use crate::error::dom_error;

/// The `versionchange` transaction of an open request, seen through [`VersionChange`].
///
/// Every call applies immediately to the browser's upgrade transaction; returning an
/// error from the upgrade handler aborts that transaction and with it every change made.
pub struct IdbVersionChange {
    db: IdbDatabase,
    transaction: IdbTransaction,
    old_version: u32,
    new_version: u32,
}

impl IdbVersionChange {
    pub fn new(db: IdbDatabase, transaction: IdbTransaction, old_version: u32, new_version: u32) -> Self {
        Self { db, transaction, old_version, new_version }
    }

    pub fn abort(&self) -> Result<(), JsValue> { self.transaction.abort() }
}

pub(crate) fn string_list(list: &DomStringList) -> Vec<String> { (0..list.length()).filter_map(|i| list.item(i)).collect() }

impl VersionChange for IdbVersionChange {
    fn old_version(&self) -> u32 { self.old_version }

    fn new_version(&self) -> u32 { self.new_version }

    fn collection_names(&self) -> Vec<String> { string_list(&self.db.object_store_names()) }

    fn index_names(&self, collection: &str) -> Vec<String> {
        match self.transaction.object_store(collection) {
            Ok(store) => string_list(&store.index_names()),
            Err(_) => Vec::new(),
        }
    }

    fn create_collection(&mut self, name: &str, primary_key: &str) -> Result<(), EngineError> {
        if self.db.object_store_names().contains(name) {
            return Err(EngineError::CollectionExists(name.to_owned()));
        }
        let params = IdbObjectStoreParameters::new();
        params.set_key_path(&JsValue::from_str(primary_key));
        self.db.create_object_store_with_optional_parameters(name, &params).map_err(|e| dom_error(e, "create object store"))?;
        Ok(())
    }

    fn create_index(&mut self, collection: &str, spec: &IndexSpec) -> Result<(), EngineError> {
        let store = self.transaction.object_store(collection).map_err(|_| EngineError::NoSuchCollection(collection.to_owned()))?;
        if store.index_names().contains(&spec.name) {
            return Err(EngineError::IndexExists { collection: collection.to_owned(), index: spec.name.clone() });
        }
        let params = IdbIndexParameters::new();
        params.set_unique(spec.unique);
        store.create_index_with_str_and_optional_parameters(&spec.name, &spec.key_field, &params).map_err(|e| dom_error(e, "create index"))?;
        Ok(())
    }
}
