//! Connection Manager.
//!
//! A [`StoreHandle`] owns at most one engine connection. It is opened lazily by the
//! first operation, cached, and recreated only after [`StoreHandle::close`] or
//! [`StoreHandle::delete_database`]. Concurrent callers that find no connection all
//! await one shared open future, so the engine sees exactly one open (and at most
//! one migration) per lifecycle.

use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc, Mutex, PoisonError,
};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info};

use crate::{
    error::StoreError,
    migration::{self, MigrationReport},
    schema::Schema,
    storage::{EngineError, StorageConnection, StorageEngine, UpgradeHandler},
    translate::{translate, Context},
};

type OpenFuture = Shared<BoxFuture<'static, Result<Arc<dyn StorageConnection>, StoreError>>>;

enum ConnectionState {
    Closed,
    Opening { generation: u64, future: OpenFuture },
    Ready(Arc<dyn StorageConnection>),
}

struct Inner {
    schema: Arc<Schema>,
    engine: Arc<dyn StorageEngine>,
    state: Mutex<ConnectionState>,
    /// Bumped for every open attempt and every close, so a stale open cannot overwrite newer state.
    generation: AtomicU64,
    in_flight: AtomicUsize,
    last_migration: Arc<Mutex<Option<MigrationReport>>>,
}

/// Cloneable handle to one logical database. Clones share the connection.
#[derive(Clone)]
pub struct StoreHandle(Arc<Inner>);

/// Counts a record operation as in flight until dropped.
pub(crate) struct OpGuard<'a>(&'a AtomicUsize);

impl Drop for OpGuard<'_> {
    fn drop(&mut self) { self.0.fetch_sub(1, Ordering::SeqCst); }
}

impl StoreHandle {
    pub fn new(schema: Arc<Schema>, engine: Arc<dyn StorageEngine>) -> Self {
        Self(Arc::new(Inner {
            schema,
            engine,
            state: Mutex::new(ConnectionState::Closed),
            generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            last_migration: Arc::new(Mutex::new(None)),
        }))
    }

    pub fn schema(&self) -> &Schema { &self.0.schema }

    /// Database name.
    pub fn name(&self) -> &str { self.0.schema.name() }

    /// Whether the engine's storage exists in this environment.
    pub fn is_supported(&self) -> bool { self.0.engine.is_supported() }

    /// The report of the last migration this handle ran, if any open needed one.
    pub fn last_migration(&self) -> Option<MigrationReport> { self.0.last_migration.lock().unwrap_or_else(PoisonError::into_inner).clone() }

    pub fn is_open(&self) -> bool { matches!(*self.state(), ConnectionState::Ready(_)) }

    fn state(&self) -> std::sync::MutexGuard<'_, ConnectionState> { self.0.state.lock().unwrap_or_else(PoisonError::into_inner) }

    pub(crate) fn begin_op(&self) -> OpGuard<'_> {
        self.0.in_flight.fetch_add(1, Ordering::SeqCst);
        OpGuard(&self.0.in_flight)
    }

    /// Open the database and run any pending migration, without issuing an operation.
    pub async fn init(&self) -> Result<(), StoreError> {
        self.ensure_ready().await?;
        Ok(())
    }

    /// The open connection, opening it first if needed.
    ///
    /// Callers that arrive while an open is in progress join it rather than starting
    /// another. A failed open leaves the handle closed, so the next call retries.
    pub async fn ensure_ready(&self) -> Result<Arc<dyn StorageConnection>, StoreError> {
        let (generation, future) = {
            let mut state = self.state();
            match &*state {
                ConnectionState::Ready(connection) => return Ok(connection.clone()),
                ConnectionState::Opening { generation, future } => (*generation, future.clone()),
                ConnectionState::Closed => {
                    let generation = self.0.generation.fetch_add(1, Ordering::SeqCst) + 1;
                    let future = self.open_future();
                    *state = ConnectionState::Opening { generation, future: future.clone() };
                    (generation, future)
                }
            }
        };

        let result = future.await;

        let mut state = self.state();
        if matches!(&*state, ConnectionState::Opening { generation: current, .. } if *current == generation) {
            *state = match &result {
                Ok(connection) => ConnectionState::Ready(connection.clone()),
                Err(_) => ConnectionState::Closed,
            };
        }
        result
    }

    // Captures only what the open needs, never `Inner`, so the cached future does not keep the handle alive.
    fn open_future(&self) -> OpenFuture {
        let schema = self.0.schema.clone();
        let engine = self.0.engine.clone();
        let report_slot = self.0.last_migration.clone();

        async move {
            if !engine.is_supported() {
                return Err(translate(EngineError::Unsupported, Context::database()));
            }
            info!("opening {} at v{}", schema.name(), schema.version());

            let staged: Arc<Mutex<Option<MigrationReport>>> = Arc::new(Mutex::new(None));
            let on_upgrade: UpgradeHandler = {
                let schema = schema.clone();
                let staged = staged.clone();
                Box::new(move |tx| {
                    let report = migration::run(&schema, tx)?;
                    *staged.lock().unwrap_or_else(PoisonError::into_inner) = Some(report);
                    Ok(())
                })
            };

            let connection = engine.open(schema.name(), schema.version(), on_upgrade).await.map_err(|e| translate(e, Context::database()))?;

            // the upgrade only counts once the engine has committed it
            if let Some(report) = staged.lock().unwrap_or_else(PoisonError::into_inner).take() {
                *report_slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(report);
            }
            debug!("opened {} at v{}", schema.name(), connection.version());
            Ok(connection)
        }
        .boxed()
        .shared()
    }

    /// Drop the cached connection. The next operation opens a new one.
    pub async fn close(&self) {
        let previous = {
            let mut state = self.state();
            self.0.generation.fetch_add(1, Ordering::SeqCst);
            std::mem::replace(&mut *state, ConnectionState::Closed)
        };
        if let ConnectionState::Ready(connection) = previous {
            connection.close().await;
            info!("closed {}", self.name());
        }
    }

    /// Close the connection and physically delete the database.
    ///
    /// Refused with a connection error while record operations or an open are in flight.
    pub async fn delete_database(&self) -> Result<(), StoreError> {
        let in_flight = self.0.in_flight.load(Ordering::SeqCst);
        if in_flight > 0 {
            return Err(StoreError::connection(format!("cannot delete {} while {} operation(s) are in flight", self.name(), in_flight)));
        }
        if matches!(*self.state(), ConnectionState::Opening { .. }) {
            return Err(StoreError::connection(format!("cannot delete {} while it is being opened", self.name())));
        }

        self.close().await;
        self.0.engine.delete_database(self.name()).await.map_err(|e| translate(e, Context::database()))?;
        *self.0.last_migration.lock().unwrap_or_else(PoisonError::into_inner) = None;
        info!("deleted database {}", self.name());
        Ok(())
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle").field("name", &self.name()).field("version", &self.0.schema.version()).field("open", &self.is_open()).finish()
    }
}
