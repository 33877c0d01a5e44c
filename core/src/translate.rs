//! Error Translator: the only place engine outcomes become [`StoreError`]s.

use crate::{error::StoreError, key::Key, storage::EngineError};

/// What the failing call was operating on, used to fill in error details the engine
/// does not know about.
#[derive(Debug, Default, Clone, Copy)]
pub struct Context<'a> {
    pub collection: Option<&'a str>,
    /// For writes: the key that clashed (the primary key, or the unique index value).
    pub key: Option<&'a Key>,
}

impl<'a> Context<'a> {
    /// Opening or deleting the database.
    pub fn database() -> Self { Self::default() }

    pub fn collection(collection: &'a str) -> Self { Self { collection: Some(collection), key: None } }

    pub fn write(collection: &'a str, key: &'a Key) -> Self { Self { collection: Some(collection), key: Some(key) } }
}

pub fn translate(error: EngineError, context: Context<'_>) -> StoreError {
    match error {
        EngineError::Unsupported | EngineError::Open(_) | EngineError::VersionTooNew { .. } | EngineError::Blocked | EngineError::Closed => {
            StoreError::connection(error.to_string())
        }
        EngineError::Upgrade { collection, cause } => StoreError::Migration { collection, cause },
        EngineError::NoSuchCollection(name) => StoreError::UnknownCollection(name),
        EngineError::NoSuchIndex { collection, index } => StoreError::UnknownIndex { collection, index },
        EngineError::Constraint { index } => match (context.collection, context.key) {
            (Some(collection), Some(key)) => StoreError::DuplicateKey { collection: collection.to_owned(), key: key.clone(), index },
            _ => StoreError::aborted(EngineError::Constraint { index }.to_string()),
        },
        // structural errors outside an upgrade mean the engine's catalog is out of step
        EngineError::CollectionExists(_)
        | EngineError::IndexExists { .. }
        | EngineError::Aborted(_)
        | EngineError::QuotaExceeded
        | EngineError::Storage(_)
        | EngineError::Codec(_) => StoreError::aborted(error.to_string()),
    }
}
