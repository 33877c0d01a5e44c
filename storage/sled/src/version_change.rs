use std::collections::BTreeSet;

use sled::{Db, Tree};
use tracing::{debug, info};
use wellstore_core::{EngineError, IndexSpec, VersionChange};

use crate::{
    catalog::{self, Catalog, CatalogEntry},
    error::SledEngineError,
    index::SledIndex,
};

/// Structural changes staged during an upgrade. Nothing reaches disk until
/// [`SledVersionChange::commit`], so a failing upgrade leaves the database as it was.
pub struct SledVersionChange {
    old_version: u32,
    new_version: u32,
    catalog: Catalog,
    existing: BTreeSet<String>,
    /// Indexes added to collections that existed before this upgrade and may hold records.
    backfill: Vec<(String, IndexSpec)>,
}

impl SledVersionChange {
    pub fn new(old_version: u32, new_version: u32, catalog: Catalog) -> Self {
        let existing = catalog.keys().cloned().collect();
        Self { old_version, new_version, catalog, existing, backfill: Vec::new() }
    }

    /// Create the staged trees, backfill new indexes on existing collections, then write
    /// the catalog and the new version in one batch.
    ///
    /// Any failure is an upgrade failure of the collection being worked on. The catalog
    /// write is charged to the collections this upgrade touched.
    pub fn commit(self, db: &Db, meta: &Tree) -> Result<Catalog, SledEngineError> {
        for (name, entry) in &self.catalog {
            if self.existing.contains(name) {
                continue;
            }
            create_trees(db, name, entry).map_err(|e| upgrade_error(name, e))?;
        }

        for (collection, spec) in &self.backfill {
            let backfill = || -> Result<(), SledEngineError> {
                let records = db.open_tree(catalog::collection_tree(collection))?;
                let index = SledIndex::new(spec.clone(), db.open_tree(catalog::index_tree(collection, &spec.name))?);
                index.backfill(&records).map(|_| ())
            };
            backfill().map_err(|e| upgrade_error(collection, e))?;
        }

        catalog::write(meta, self.new_version, &self.catalog).map_err(|e| upgrade_error(&self.touched(), e))?;
        info!("upgraded database from v{} to v{}", self.old_version, self.new_version);
        Ok(self.catalog)
    }

    fn touched(&self) -> String {
        let mut names: BTreeSet<&str> = self.catalog.keys().filter(|name| !self.existing.contains(*name)).map(String::as_str).collect();
        names.extend(self.backfill.iter().map(|(collection, _)| collection.as_str()));
        names.into_iter().collect::<Vec<_>>().join(", ")
    }
}

fn create_trees(db: &Db, name: &str, entry: &CatalogEntry) -> Result<(), SledEngineError> {
    // a previously aborted upgrade may have left these behind
    db.open_tree(catalog::collection_tree(name))?.clear()?;
    for index in &entry.indexes {
        db.open_tree(catalog::index_tree(name, &index.name))?.clear()?;
    }
    Ok(())
}

fn upgrade_error(collection: &str, err: SledEngineError) -> SledEngineError {
    let cause = match err {
        SledEngineError::Engine(upgrade @ EngineError::Upgrade { .. }) => return upgrade.into(),
        SledEngineError::Engine(e) => e.to_string(),
        other => other.to_string(),
    };
    EngineError::Upgrade { collection: collection.to_owned(), cause }.into()
}

impl VersionChange for SledVersionChange {
    fn old_version(&self) -> u32 { self.old_version }
    fn new_version(&self) -> u32 { self.new_version }

    fn collection_names(&self) -> Vec<String> { self.catalog.keys().cloned().collect() }
    fn has_collection(&self, name: &str) -> bool { self.catalog.contains_key(name) }

    fn index_names(&self, collection: &str) -> Vec<String> {
        self.catalog.get(collection).map(|entry| entry.indexes.iter().map(|i| i.name.clone()).collect()).unwrap_or_default()
    }

    fn create_collection(&mut self, name: &str, primary_key: &str) -> Result<(), EngineError> {
        if self.catalog.contains_key(name) {
            return Err(EngineError::CollectionExists(name.to_owned()));
        }
        debug!("staging collection {}", name);
        self.catalog.insert(name.to_owned(), CatalogEntry::new(primary_key));
        Ok(())
    }

    fn create_index(&mut self, collection: &str, index: &IndexSpec) -> Result<(), EngineError> {
        let entry = self.catalog.get_mut(collection).ok_or_else(|| EngineError::NoSuchCollection(collection.to_owned()))?;
        if entry.index(&index.name).is_some() {
            return Err(EngineError::IndexExists { collection: collection.to_owned(), index: index.name.clone() });
        }
        debug!("staging index {}.{}", collection, index.name);
        entry.indexes.push(index.clone());
        if self.existing.contains(collection) {
            self.backfill.push((collection.to_owned(), index.clone()));
        }
        Ok(())
    }
}
