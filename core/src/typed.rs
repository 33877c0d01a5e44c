//! Typed accessors over one collection.
//!
//! Records stay open JSON objects on disk; a [`Model`] is the shape the application
//! expects to read back. A stored record that does not decode into the model is an
//! `InvalidRecord` error rather than a panic.

use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{error::StoreError, handle::StoreHandle, key::Key, range::KeyRange, record::Record};

pub trait Model: Serialize + DeserializeOwned + Send + Sync {
    /// Collection the model is stored in.
    const COLLECTION: &'static str;
}

/// A [`StoreHandle`] restricted to one model's collection.
pub struct Typed<M> {
    handle: StoreHandle,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for Typed<M> {
    fn clone(&self) -> Self { Self { handle: self.handle.clone(), _model: PhantomData } }
}

impl StoreHandle {
    pub fn typed<M: Model>(&self) -> Typed<M> { Typed { handle: self.clone(), _model: PhantomData } }
}

impl<M: Model> Typed<M> {
    pub fn handle(&self) -> &StoreHandle { &self.handle }

    pub async fn insert(&self, model: &M) -> Result<Key, StoreError> { self.handle.insert(M::COLLECTION, to_record(model)?).await }

    pub async fn get(&self, key: impl Into<Key>) -> Result<Option<M>, StoreError> {
        self.handle.get(M::COLLECTION, key).await?.map(from_record).transpose()
    }

    pub async fn upsert(&self, model: &M) -> Result<(), StoreError> { self.handle.upsert(M::COLLECTION, to_record(model)?).await }

    pub async fn delete(&self, key: impl Into<Key>) -> Result<(), StoreError> { self.handle.delete(M::COLLECTION, key).await }

    pub async fn all(&self) -> Result<Vec<M>, StoreError> { decode_all(self.handle.scan_all(M::COLLECTION).await?) }

    pub async fn by_index(&self, index: &str, key: impl Into<Key>) -> Result<Vec<M>, StoreError> {
        decode_all(self.handle.query_by_index(M::COLLECTION, index, key).await?)
    }

    pub async fn by_index_range(&self, index: &str, range: KeyRange) -> Result<Vec<M>, StoreError> {
        decode_all(self.handle.query_by_index_range(M::COLLECTION, index, range).await?)
    }

    pub async fn count(&self) -> Result<u64, StoreError> { self.handle.count(M::COLLECTION, None).await }
}

fn to_record<M: Model>(model: &M) -> Result<Record, StoreError> {
    match serde_json::to_value(model) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(other) => Err(StoreError::invalid_record(M::COLLECTION, format!("model serialized to {} instead of an object", kind(&other)))),
        Err(e) => Err(StoreError::invalid_record(M::COLLECTION, e.to_string())),
    }
}

fn from_record<M: Model>(record: Record) -> Result<M, StoreError> {
    serde_json::from_value(Value::Object(record)).map_err(|e| StoreError::invalid_record(M::COLLECTION, e.to_string()))
}

fn decode_all<M: Model>(records: Vec<Record>) -> Result<Vec<M>, StoreError> { records.into_iter().map(from_record).collect() }

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
