use std::str::FromStr;
use std::sync::Arc;

use tracing::Level;
use wellstore_core::{EngineError, IndexSpec, StorageConnection, StorageEngine, UpgradeHandler, VersionChange};
use wellstore_storage_sled::SledStorageEngine;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    // if LOG_LEVEL env var is set, use it
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        tracing_subscriber::fmt().with_max_level(Level::from_str(&level).unwrap()).with_test_writer().init();
    } else {
        tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init();
    }
}

/// Upgrade handler that creates `emotions` (indexed by `userId`) and `users` (unique `email`).
#[allow(unused)]
pub fn create_wellness() -> UpgradeHandler {
    Box::new(|tx: &mut dyn VersionChange| -> Result<(), EngineError> {
        tx.create_collection("emotions", "id")?;
        tx.create_index("emotions", &IndexSpec::new("userId", "userId"))?;
        tx.create_collection("users", "id")?;
        tx.create_index("users", &IndexSpec::unique("email", "email"))?;
        Ok(())
    })
}

#[allow(unused)]
pub fn no_upgrade() -> UpgradeHandler { Box::new(|_: &mut dyn VersionChange| -> Result<(), EngineError> { Err(EngineError::Aborted("no upgrade expected".into())) }) }

#[allow(unused)]
pub async fn open_wellness(engine: &SledStorageEngine) -> Result<Arc<dyn StorageConnection>, EngineError> {
    engine.open("wellness", 1, create_wellness()).await
}
