//! Public error types.
//!
//! Every record operation returns `Result<_, StoreError>`. Engine failures reach
//! this type only through [`crate::translate`].

use thiserror::Error;

use crate::key::Key;

/// Error type for every store operation.
///
/// `Clone` so that one failed open can be handed to every caller that was waiting on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The database could not be opened: unsupported environment, blocked upgrade,
    /// a stored version newer than the schema, or a closed connection.
    #[error("connection error: {reason}")]
    Connection { reason: String },

    /// A structural change failed during upgrade; the stored version is unchanged.
    #[error("migration of collection `{collection}` failed: {cause}")]
    Migration { collection: String, cause: String },

    /// The collection is not part of the schema (a programming error).
    #[error("unknown collection `{0}`")]
    UnknownCollection(String),

    /// The index is not part of the schema, or was never created on disk.
    #[error("unknown index `{index}` on collection `{collection}`")]
    UnknownIndex { collection: String, index: String },

    /// An insert or upsert clashed with an existing primary key (`index: None`) or unique index value.
    #[error("duplicate key {key} in `{collection}`{}", unique_suffix(.index))]
    DuplicateKey { collection: String, key: Key, index: Option<String> },

    /// The engine aborted the transaction (quota exceeded, I/O failure, corrupt data).
    #[error("transaction aborted: {reason}")]
    TransactionAborted { reason: String },

    /// The record cannot be stored: missing or invalid primary key, or it does not decode
    /// into the requested model.
    #[error("invalid record for `{collection}`: {reason}")]
    InvalidRecord { collection: String, reason: String },
}

impl StoreError {
    pub fn connection(reason: impl Into<String>) -> Self { Self::Connection { reason: reason.into() } }

    pub fn aborted(reason: impl Into<String>) -> Self { Self::TransactionAborted { reason: reason.into() } }

    pub fn invalid_record(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecord { collection: collection.into(), reason: reason.into() }
    }

    /// True for the programmer errors that no retry can fix.
    pub fn is_schema_misuse(&self) -> bool { matches!(self, Self::UnknownCollection(_) | Self::UnknownIndex { .. }) }
}

fn unique_suffix(index: &Option<String>) -> String { index.as_ref().map(|i| format!(" (unique index `{}`)", i)).unwrap_or_default() }

/// Error returned when building an invalid [`crate::Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema version must be at least 1, got {0}")]
    InvalidVersion(u32),

    #[error("empty name for {0}")]
    EmptyName(String),

    #[error("collection `{0}` is declared twice")]
    DuplicateCollection(String),

    #[error("index `{index}` is declared twice on collection `{collection}`")]
    DuplicateIndex { collection: String, index: String },
}
