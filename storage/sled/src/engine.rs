use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task;
use tracing::info;
use wellstore_core::{EngineError, StorageConnection, StorageEngine, UpgradeHandler};

use crate::{
    config::SledConfig,
    connection::SledConnection,
    databases::Databases,
    error::{open_error, SledEngineError},
};

/// Native engine: one sled database per logical database name.
///
/// A database on disk stays open while a connection to it is open. Temporary databases
/// stay cached until deleted, so they survive a close and reopen within the same engine.
pub struct SledStorageEngine {
    config: SledConfig,
    databases: Arc<Databases>,
}

impl SledStorageEngine {
    pub fn with_config(config: SledConfig) -> Result<Self, SledEngineError> {
        if let (Some(path), false) = (&config.path, config.temporary) {
            std::fs::create_dir_all(path)?;
        }
        let databases = Databases::new(config.temporary);
        Ok(Self { config, databases })
    }

    pub fn with_homedir_folder(folder_name: &str) -> Result<Self, SledEngineError> {
        let dir = dirs::home_dir().ok_or(SledEngineError::NoHomeDir)?.join(folder_name);
        Self::with_path(dir)
    }

    pub fn with_path(path: PathBuf) -> Result<Self, SledEngineError> { Self::with_config(SledConfig::new().path(path)) }

    pub fn new() -> Result<Self, SledEngineError> { Self::with_homedir_folder(".wellstore") }

    /// Temporary storage that disappears with the engine, for tests.
    pub fn new_test() -> Result<Self, SledEngineError> {
        Self::with_config(SledConfig::new().temporary(true).durable(false).flush_every_ms(None))
    }

    pub fn config(&self) -> &SledConfig { &self.config }
}

#[async_trait]
impl StorageEngine for SledStorageEngine {
    fn is_supported(&self) -> bool { true }

    async fn open(&self, name: &str, version: u32, on_upgrade: UpgradeHandler) -> Result<Arc<dyn StorageConnection>, EngineError> {
        let config = self.config.clone();
        let databases = self.databases.clone();
        let name = name.to_owned();

        let connection = task::spawn_blocking(move || {
            let (db, lease) = databases.checkout(&config, &name)?;
            SledConnection::open_blocking(name, db, lease, version, on_upgrade, config.durable)
        })
        .await
        .map_err(|e| EngineError::Open(e.to_string()))?
        .map_err(open_error)?;

        Ok(Arc::new(connection))
    }

    async fn delete_database(&self, name: &str) -> Result<(), EngineError> {
        drop(self.databases.remove(name));

        if let Some(path) = self.config.database_path(name) {
            task::spawn_blocking(move || match std::fs::remove_dir_all(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(SledEngineError::from(e)),
            })
            .await
            .map_err(SledEngineError::from)??;
        }
        info!("deleted sled database {}", name);
        Ok(())
    }
}
