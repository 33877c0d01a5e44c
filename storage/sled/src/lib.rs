//! Native [`wellstore_core::StorageEngine`] on sled.
//!
//! Layout per database: a meta tree holding the stored version and the catalog of
//! created collections, one tree per collection keyed by the encoded primary key, and
//! one tree per secondary index.

pub mod catalog;
mod collection;
mod config;
mod connection;
mod databases;
mod engine;
pub mod error;
mod index;
mod version_change;

pub use collection::SledStorageCollection;
pub use config::SledConfig;
pub use connection::SledConnection;
pub use engine::SledStorageEngine;
pub use error::SledEngineError;
pub use version_change::SledVersionChange;
