//! Browser [`wellstore_core::StorageEngine`] on IndexedDB.
//!
//! Each collection is an object store keyed in-line by its primary-key field, and each
//! secondary index a native IndexedDB index, so the browser keeps indexes consistent
//! and orders transactions itself.

mod collection;
pub mod convert;
mod database;
mod engine;
mod error;
mod request;
mod util;
mod version_change;

pub use collection::IdbCollection;
pub use database::IdbConnection;
pub use engine::IndexedDBStorageEngine;
pub use version_change::IdbVersionChange;
