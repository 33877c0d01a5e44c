//! The sled databases an engine has open, shared by every connection to the same name.
//!
//! A database on disk holds an exclusive file lock for as long as any handle to it
//! lives. Connections take a [`Lease`]; once the last lease on a database is gone the
//! engine drops its handle too, so another engine (or process) can open the directory.
//! Temporary databases are kept until deleted since dropping them loses their data.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use sled::Db;
use tracing::debug;

use crate::{config::SledConfig, error::SledEngineError};

/// How long an open waits for a lock held by a database that is still shutting down.
const LOCK_RETRIES: u32 = 100;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(20);

struct Entry {
    db: Db,
    generation: u64,
    leases: usize,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    opened: u64,
}

pub(crate) struct Databases {
    inner: Mutex<Inner>,
    keep_unused: bool,
}

/// Keeps one database open; dropping the last lease closes it.
pub(crate) struct Lease {
    databases: Arc<Databases>,
    name: String,
    generation: u64,
}

impl Databases {
    pub fn new(keep_unused: bool) -> Arc<Self> { Arc::new(Self { inner: Mutex::new(Inner::default()), keep_unused }) }

    fn inner(&self) -> MutexGuard<'_, Inner> { self.inner.lock().unwrap_or_else(PoisonError::into_inner) }

    /// The open database `name`, opening it on first use.
    pub fn checkout(self: &Arc<Self>, config: &SledConfig, name: &str) -> Result<(Db, Lease), SledEngineError> {
        let mut inner = self.inner();
        if !inner.entries.contains_key(name) {
            debug!("opening sled database {} at {:?}", name, config.database_path(name));
            let db = open_db(config, name)?;
            inner.opened += 1;
            let generation = inner.opened;
            inner.entries.insert(name.to_owned(), Entry { db, generation, leases: 0 });
        }

        let Some(entry) = inner.entries.get_mut(name) else { return Err(SledEngineError::Corrupt(format!("database {} vanished while opening", name))) };
        entry.leases += 1;
        let lease = Lease { databases: self.clone(), name: name.to_owned(), generation: entry.generation };
        Ok((entry.db.clone(), lease))
    }

    /// Forget `name` whatever its leases, ahead of deleting it.
    pub fn remove(&self, name: &str) -> Option<Db> { self.inner().entries.remove(name).map(|entry| entry.db) }

    fn release(&self, name: &str, generation: u64) {
        let mut inner = self.inner();
        let Some(entry) = inner.entries.get_mut(name) else { return };
        // a lease on a database that was deleted and opened again
        if entry.generation != generation {
            return;
        }
        entry.leases = entry.leases.saturating_sub(1);
        if entry.leases == 0 && !self.keep_unused {
            inner.entries.remove(name);
            debug!("released sled database {}", name);
        }
    }

    #[cfg(test)]
    fn leases(&self, name: &str) -> Option<usize> { self.inner().entries.get(name).map(|entry| entry.leases) }
}

impl Drop for Lease {
    fn drop(&mut self) { self.databases.release(&self.name, self.generation) }
}

/// Open the sled directory, waiting while a previous handle on it is still letting go
/// of the file lock.
fn open_db(config: &SledConfig, name: &str) -> Result<Db, SledEngineError> {
    let mut attempt = 0;
    loop {
        match config.sled_config(name).open() {
            Err(e) if is_lock_contention(&e) && attempt < LOCK_RETRIES => {
                attempt += 1;
                debug!("sled database {} is still locked, retrying ({})", name, attempt);
                thread::sleep(LOCK_RETRY_DELAY);
            }
            result => return Ok(result?),
        }
    }
}

fn is_lock_contention(err: &sled::Error) -> bool {
    match err {
        sled::Error::Io(e) => e.kind() == std::io::ErrorKind::WouldBlock || e.to_string().contains("could not acquire lock"),
        _ => false,
    }
}
