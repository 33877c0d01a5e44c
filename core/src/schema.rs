//! Schema Registry: the static description of every collection in a database.
//!
//! A [`Schema`] is built once through [`SchemaBuilder`] and is immutable afterwards.
//! It is consulted by the migration runner (to create missing collections) and by
//! record operations (to reject unknown collection or index names before any transaction).

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    /// Dotted path of the record field the index is keyed on.
    pub key_field: String,
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, key_field: impl Into<String>) -> Self {
        Self { name: name.into(), key_field: key_field.into(), unique: false }
    }

    pub fn unique(name: impl Into<String>, key_field: impl Into<String>) -> Self {
        Self { name: name.into(), key_field: key_field.into(), unique: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    /// Dotted path of the field holding each record's primary key.
    pub primary_key: String,
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self { name: name.into(), primary_key: primary_key.into(), indexes: Vec::new() }
    }

    /// Add a secondary index (builder style).
    pub fn index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    /// Look up an index by name.
    pub fn find_index(&self, name: &str) -> Result<&IndexSpec, StoreError> {
        self.indexes
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| StoreError::UnknownIndex { collection: self.name.clone(), index: name.to_owned() })
    }

    pub fn index_names(&self) -> impl Iterator<Item = &str> { self.indexes.iter().map(|i| i.name.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    version: u32,
    collections: Vec<CollectionSpec>,
}

impl Schema {
    pub fn builder(name: impl Into<String>, version: u32) -> SchemaBuilder {
        SchemaBuilder { name: name.into(), version, collections: Vec::new() }
    }

    /// Database name.
    pub fn name(&self) -> &str { &self.name }

    pub fn version(&self) -> u32 { self.version }

    pub fn collections(&self) -> &[CollectionSpec] { &self.collections }

    /// Look up a collection, failing fast with `UnknownCollection`.
    pub fn collection(&self, name: &str) -> Result<&CollectionSpec, StoreError> {
        self.collections.iter().find(|c| c.name == name).ok_or_else(|| StoreError::UnknownCollection(name.to_owned()))
    }

    /// Look up an index of a collection, failing fast with `UnknownCollection` or `UnknownIndex`.
    pub fn index(&self, collection: &str, index: &str) -> Result<(&CollectionSpec, &IndexSpec), StoreError> {
        let spec = self.collection(collection)?;
        Ok((spec, spec.find_index(index)?))
    }
}

pub struct SchemaBuilder {
    name: String,
    version: u32,
    collections: Vec<CollectionSpec>,
}

impl SchemaBuilder {
    pub fn collection(mut self, collection: CollectionSpec) -> Self {
        self.collections.push(collection);
        self
    }

    /// Validate and freeze the schema.
    pub fn build(self) -> Result<Schema, SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::EmptyName("database".into()));
        }
        if self.version == 0 {
            return Err(SchemaError::InvalidVersion(self.version));
        }

        let mut seen = std::collections::HashSet::new();
        for collection in &self.collections {
            if collection.name.is_empty() {
                return Err(SchemaError::EmptyName("collection".into()));
            }
            if collection.primary_key.is_empty() {
                return Err(SchemaError::EmptyName(format!("primary key of {}", collection.name)));
            }
            if !seen.insert(collection.name.as_str()) {
                return Err(SchemaError::DuplicateCollection(collection.name.clone()));
            }

            let mut index_names = std::collections::HashSet::new();
            for index in &collection.indexes {
                if index.name.is_empty() || index.key_field.is_empty() {
                    return Err(SchemaError::EmptyName(format!("index of {}", collection.name)));
                }
                if !index_names.insert(index.name.as_str()) {
                    return Err(SchemaError::DuplicateIndex { collection: collection.name.clone(), index: index.name.clone() });
                }
            }
        }

        Ok(Schema { name: self.name, version: self.version, collections: self.collections })
    }
}
