//! Persisted catalog: the stored schema version and every created collection.
//!
//! Both live in the meta tree and are only ever written together, in one batch,
//! when an upgrade commits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sled::Tree;
use wellstore_core::IndexSpec;

use crate::error::SledEngineError;

pub const META_TREE: &str = "__wellstore_meta";
const VERSION_KEY: &[u8] = b"version";
const COLLECTION_PREFIX: &str = "collection/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub primary_key: String,
    pub indexes: Vec<IndexSpec>,
}

impl CatalogEntry {
    pub fn new(primary_key: impl Into<String>) -> Self { Self { primary_key: primary_key.into(), indexes: Vec::new() } }

    pub fn index(&self, name: &str) -> Option<&IndexSpec> { self.indexes.iter().find(|i| i.name == name) }
}

pub type Catalog = BTreeMap<String, CatalogEntry>;

pub fn collection_tree(collection: &str) -> String { format!("collection/{}", collection) }

pub fn index_tree(collection: &str, index: &str) -> String { format!("index/{}/{}", collection, index) }

/// Stored version, or 0 for a database that has never been upgraded.
pub fn read_version(meta: &Tree) -> Result<u32, SledEngineError> {
    match meta.get(VERSION_KEY)? {
        None => Ok(0),
        Some(bytes) => {
            let arr: [u8; 4] = bytes.as_ref().try_into().map_err(|_| SledEngineError::Corrupt("version is not a u32".into()))?;
            Ok(u32::from_be_bytes(arr))
        }
    }
}

pub fn read_catalog(meta: &Tree) -> Result<Catalog, SledEngineError> {
    let mut catalog = Catalog::new();
    for item in meta.scan_prefix(COLLECTION_PREFIX) {
        let (key, bytes) = item?;
        let name = std::str::from_utf8(&key[COLLECTION_PREFIX.len()..])
            .map_err(|_| SledEngineError::Corrupt("collection name is not utf-8".into()))?
            .to_owned();
        catalog.insert(name, bincode::deserialize(&bytes)?);
    }
    Ok(catalog)
}

/// Write `version` and the whole catalog atomically.
pub fn write(meta: &Tree, version: u32, catalog: &Catalog) -> Result<(), SledEngineError> {
    let mut batch = sled::Batch::default();
    batch.insert(VERSION_KEY, version.to_be_bytes().to_vec());
    for (name, entry) in catalog {
        batch.insert(format!("{}{}", COLLECTION_PREFIX, name).as_bytes(), bincode::serialize(entry)?);
    }
    meta.apply_batch(batch)?;
    Ok(())
}
