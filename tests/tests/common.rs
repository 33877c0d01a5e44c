use std::str::FromStr;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use async_trait::async_trait;
use tracing::Level;
use wellstore_core::{
    CollectionSpec, EngineError, IndexSpec, Schema, StorageConnection, StorageEngine, StoreHandle, UpgradeHandler, VersionChange,
};
use wellstore_storage_sled::SledStorageEngine;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    let level = std::env::var("LOG_LEVEL").ok().and_then(|l| Level::from_str(&l).ok()).unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).with_test_writer().init();
}

/// `emotions` keyed by `id` with a `userId` index.
#[allow(unused)]
pub fn emotions_schema(version: u32) -> Schema {
    Schema::builder("wellness", version)
        .collection(CollectionSpec::new("emotions", "id").index(IndexSpec::new("userId", "userId")))
        .build()
        .expect("valid schema")
}

/// The v1 schema plus `users` with a unique `email` index and a `timestamp` index on emotions.
#[allow(unused)]
pub fn full_schema(version: u32) -> Schema {
    Schema::builder("wellness", version)
        .collection(
            CollectionSpec::new("emotions", "id").index(IndexSpec::new("userId", "userId")).index(IndexSpec::new("timestamp", "timestamp")),
        )
        .collection(CollectionSpec::new("users", "id").index(IndexSpec::unique("email", "email")))
        .build()
        .expect("valid schema")
}

#[allow(unused)]
pub fn store(schema: Schema, engine: Arc<dyn StorageEngine>) -> StoreHandle { StoreHandle::new(Arc::new(schema), engine) }

/// A sled engine that counts physical opens and can be told to slow down opens or to
/// fail while creating a given collection.
pub struct TestEngine {
    inner: SledStorageEngine,
    opens: AtomicUsize,
    open_delay: Mutex<Option<Duration>>,
    fail_creating: Mutex<Option<String>>,
}

#[allow(unused)]
impl TestEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: SledStorageEngine::new_test().expect("temporary sled engine"),
            opens: AtomicUsize::new(0),
            open_delay: Mutex::new(None),
            fail_creating: Mutex::new(None),
        })
    }

    pub fn opens(&self) -> usize { self.opens.load(Ordering::SeqCst) }

    pub fn delay_opens(&self, delay: Duration) { *self.open_delay.lock().unwrap() = Some(delay); }

    /// Fail the next upgrades with a quota error when they try to create `collection`.
    pub fn fail_creating(&self, collection: Option<&str>) { *self.fail_creating.lock().unwrap() = collection.map(str::to_owned); }
}

struct FailOn<'a> {
    inner: &'a mut dyn VersionChange,
    collection: String,
}

impl VersionChange for FailOn<'_> {
    fn old_version(&self) -> u32 { self.inner.old_version() }
    fn new_version(&self) -> u32 { self.inner.new_version() }
    fn collection_names(&self) -> Vec<String> { self.inner.collection_names() }
    fn index_names(&self, collection: &str) -> Vec<String> { self.inner.index_names(collection) }

    fn create_collection(&mut self, name: &str, primary_key: &str) -> Result<(), EngineError> {
        if name == self.collection {
            return Err(EngineError::QuotaExceeded);
        }
        self.inner.create_collection(name, primary_key)
    }

    fn create_index(&mut self, collection: &str, index: &IndexSpec) -> Result<(), EngineError> { self.inner.create_index(collection, index) }
}

#[async_trait]
impl StorageEngine for TestEngine {
    fn is_supported(&self) -> bool { true }

    async fn open(&self, name: &str, version: u32, on_upgrade: UpgradeHandler) -> Result<Arc<dyn StorageConnection>, EngineError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let delay = *self.open_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let fail = self.fail_creating.lock().unwrap().clone();
        let on_upgrade: UpgradeHandler = match fail {
            None => on_upgrade,
            Some(collection) => Box::new(move |tx: &mut dyn VersionChange| -> Result<(), EngineError> {
                on_upgrade(&mut FailOn { inner: tx, collection })
            }),
        };
        self.inner.open(name, version, on_upgrade).await
    }

    async fn delete_database(&self, name: &str) -> Result<(), EngineError> { self.inner.delete_database(name).await }
}
