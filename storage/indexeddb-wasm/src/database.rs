use std::cell::RefCell;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use send_wrapper::SendWrapper;
use tracing::{debug, info, warn};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{Event, IdbDatabase, IdbFactory, IdbOpenDbRequest, IdbVersionChangeEvent};
use wellstore_core::{EngineError, StorageCollection, StorageConnection, UpgradeHandler};

use crate::{
    collection::IdbCollection,
    error::{dom_error, request_error},
    util::{CBFuture, CBRace, Require},
    version_change::{string_list, IdbVersionChange},
};

/// An open IndexedDB database.
///
/// Another context (a second tab, or a deletion) asking for a version change closes this
/// connection; afterwards it refuses new transactions like an explicitly closed one.
pub struct IdbConnection {
    name: String,
    db: SendWrapper<IdbDatabase>,
    closed: Arc<AtomicBool>,
    _onversionchange: SendWrapper<Closure<dyn FnMut(IdbVersionChangeEvent)>>,
}

impl IdbConnection {
    pub(crate) async fn open(factory: &IdbFactory, name: &str, version: u32, on_upgrade: UpgradeHandler) -> Result<Self, EngineError> {
        let open_request = factory.open_with_u32(name, version).map_err(|e| dom_error(e, "open database"))?;

        let race = CBRace::new();
        let handler = RefCell::new(Some(on_upgrade));
        let onupgradeneeded = race.wrap(move |event: IdbVersionChangeEvent| -> Result<(), EngineError> {
            let Some(on_upgrade) = handler.borrow_mut().take() else { return Ok(()) };
            let upgrade = || -> anyhow::Result<IdbVersionChange> {
                let request: IdbOpenDbRequest = event.target().require("upgrade event target")?.unchecked_into();
                let transaction = request.transaction().require("upgrade transaction")?;
                let db: IdbDatabase = request.result().require("upgrading database")?.unchecked_into();
                let new_version = event.new_version().map_or(version, |v| v as u32);
                Ok(IdbVersionChange::new(db, transaction, event.old_version() as u32, new_version))
            };
            let mut tx = upgrade().map_err(|e| EngineError::Open(e.to_string()))?;
            let result = on_upgrade(&mut tx);
            if result.is_err() {
                // rolls back every store and index created so far
                let _ = tx.abort();
            }
            result
        });
        open_request.set_onupgradeneeded(Some(onupgradeneeded.as_ref().unchecked_ref()));

        let outcome = CBFuture::new(&open_request, "success", &["error", "blocked"]).await;
        open_request.set_onupgradeneeded(None);
        let upgrade = race.take_err();

        if let Err(event) = outcome {
            upgrade?;
            return Err(match event {
                Some(event) if event.type_() == "blocked" => {
                    abandon(&open_request);
                    EngineError::Blocked
                }
                _ => request_error(&open_request, "open database"),
            });
        }

        let db: IdbDatabase = open_request.result().map_err(|e| dom_error(e, "open database"))?.unchecked_into();
        let closed = Arc::new(AtomicBool::new(false));
        let onversionchange = Closure::wrap(Box::new({
            let closed = closed.clone();
            let db = db.clone();
            move |event: IdbVersionChangeEvent| {
                warn!("version change to {:?} requested elsewhere, closing connection", event.new_version());
                closed.store(true, Ordering::SeqCst);
                db.close();
            }
        }) as Box<dyn FnMut(IdbVersionChangeEvent)>);
        db.set_onversionchange(Some(onversionchange.as_ref().unchecked_ref()));

        info!("opened indexeddb database {} at version {}", name, db.version());
        Ok(Self { name: name.to_owned(), db: SendWrapper::new(db), closed, _onversionchange: SendWrapper::new(onversionchange) })
    }

    pub fn name(&self) -> &str { &self.name }
}

/// A blocked open stays queued in the browser after we give up on it. When the other
/// connections close it goes ahead, so its upgrade is aborted (the stored version stays
/// put) and a connection it still manages to open is closed at once.
fn abandon(request: &IdbOpenDbRequest) {
    let onupgradeneeded = Closure::once_into_js(|event: Event| {
        let request = event.target().map(|target| target.unchecked_into::<IdbOpenDbRequest>());
        if let Some(transaction) = request.and_then(|r| r.transaction()) {
            let _ = transaction.abort();
            debug!("aborted the upgrade of an abandoned open");
        }
    });
    request.set_onupgradeneeded(Some(onupgradeneeded.unchecked_ref()));

    let onsuccess = Closure::once_into_js(|event: Event| {
        let request = event.target().map(|target| target.unchecked_into::<IdbOpenDbRequest>());
        if let Some(db) = request.and_then(|r| r.result().ok()) {
            db.unchecked_into::<IdbDatabase>().close();
            debug!("closed the connection of an abandoned open");
        }
    });
    request.set_onsuccess(Some(onsuccess.unchecked_ref()));
}

#[async_trait]
impl StorageConnection for IdbConnection {
    fn version(&self) -> u32 { self.db.version() as u32 }

    fn collection_names(&self) -> Vec<String> { string_list(&self.db.object_store_names()) }

    fn index_names(&self, collection: &str) -> Result<Vec<String>, EngineError> {
        let missing = || EngineError::NoSuchCollection(collection.to_owned());
        let transaction = self.db.transaction_with_str(collection).map_err(|_| missing())?;
        let store = transaction.object_store(collection).map_err(|_| missing())?;
        Ok(string_list(&store.index_names()))
    }

    async fn collection(&self, name: &str) -> Result<Arc<dyn StorageCollection>, EngineError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EngineError::Closed);
        }
        if !self.db.object_store_names().contains(name) {
            return Err(EngineError::NoSuchCollection(name.to_owned()));
        }
        Ok(Arc::new(IdbCollection::new(self.db.clone(), name)))
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.db.set_onversionchange(None);
            self.db.close();
            info!("closed indexeddb database {}", self.name);
        }
    }
}
