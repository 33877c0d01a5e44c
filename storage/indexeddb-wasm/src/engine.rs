use std::sync::Arc;

use async_trait::async_trait;
use send_wrapper::SendWrapper;
use tracing::info;
use web_sys::{window, IdbFactory};
use wellstore_core::{EngineError, StorageConnection, StorageEngine, UpgradeHandler};

use crate::{
    database::IdbConnection,
    error::{dom_error, request_error},
    util::{CBFuture, Require},
};

/// Browser engine on the host's IndexedDB.
///
/// The factory is looked up per call, so [`StorageEngine::is_supported`] answers false
/// wherever `window.indexedDB` is missing.
#[derive(Debug, Default, Clone)]
pub struct IndexedDBStorageEngine {}

// The storage traits require Send futures while web-sys values are !Send, so every
// future is wrapped in SendWrapper. wasm32 has a single thread.

impl IndexedDBStorageEngine {
    pub fn new() -> Self { Self {} }

    fn factory() -> anyhow::Result<IdbFactory> {
        let window = window().require("window")?;
        window.indexed_db().require("indexedDB")
    }

    async fn delete_local(name: &str) -> Result<(), EngineError> {
        let factory = Self::factory().map_err(|_| EngineError::Unsupported)?;
        let request = factory.delete_database(name).map_err(|e| dom_error(e, "delete database"))?;
        // "blocked" means other connections are still open; the deletion completes once they close
        CBFuture::new(&request, &["success", "blocked"], "error").await.map_err(|_| request_error(&request, "delete database"))?;
        info!("deleted indexeddb database {}", name);
        Ok(())
    }
}

#[async_trait]
impl StorageEngine for IndexedDBStorageEngine {
    fn is_supported(&self) -> bool { Self::factory().is_ok() }

    async fn open(&self, name: &str, version: u32, on_upgrade: UpgradeHandler) -> Result<Arc<dyn StorageConnection>, EngineError> {
        SendWrapper::new(async move {
            let factory = Self::factory().map_err(|_| EngineError::Unsupported)?;
            let connection = IdbConnection::open(&factory, name, version, on_upgrade).await?;
            Ok(Arc::new(connection) as Arc<dyn StorageConnection>)
        })
        .await
    }

    async fn delete_database(&self, name: &str) -> Result<(), EngineError> { SendWrapper::new(Self::delete_local(name)).await }
}
