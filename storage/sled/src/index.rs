use sled::{transaction::TransactionalTree, Tree};
use tracing::debug;
use wellstore_core::{record, EngineError, IndexSpec, Record};

use crate::error::SledEngineError;

/// One secondary index tree.
///
/// Non-unique entries are `enc(index key) ++ enc(primary key) -> enc(primary key)`, so
/// records sharing an index key sit next to each other in primary-key order. Unique
/// entries are `enc(index key) -> enc(primary key)`, so a second record with the same
/// index key finds the first one by a point lookup.
#[derive(Clone)]
pub struct SledIndex {
    pub spec: IndexSpec,
    pub tree: Tree,
}

impl SledIndex {
    pub fn new(spec: IndexSpec, tree: Tree) -> Self { Self { spec, tree } }

    pub fn name(&self) -> &str { &self.spec.name }

    /// The entry key for a record, or `None` if the record has no valid key at the
    /// indexed field and is left out of the index.
    pub fn entry_key(&self, pk: &[u8], record: &Record) -> Option<Vec<u8>> {
        let mut key = record::key_at(record, &self.spec.key_field)?.encode();
        if !self.spec.unique {
            key.extend_from_slice(pk);
        }
        Some(key)
    }

    /// Insert `record`'s entry inside a transaction, enforcing uniqueness.
    pub(crate) fn insert_entry(&self, tx: &TransactionalTree, pk: &[u8], record: &Record) -> Result<(), TxError> {
        let Some(key) = self.entry_key(pk, record) else { return Ok(()) };
        if self.spec.unique {
            if let Some(existing) = tx.get(key.as_slice())? {
                if existing.as_ref() != pk {
                    return Err(TxError::Abort(EngineError::Constraint { index: Some(self.spec.name.clone()) }));
                }
            }
        }
        tx.insert(key.as_slice(), pk)?;
        Ok(())
    }

    pub(crate) fn remove_entry(&self, tx: &TransactionalTree, pk: &[u8], record: &Record) -> Result<(), TxError> {
        if let Some(key) = self.entry_key(pk, record) {
            tx.remove(key.as_slice())?;
        }
        Ok(())
    }

    /// Rebuild the index from every record in `records`. Used when an index is added to
    /// a collection that already holds data.
    pub fn backfill(&self, records: &Tree) -> Result<usize, SledEngineError> {
        self.tree.clear()?;
        let mut count = 0;
        for item in records.iter() {
            let (pk, bytes) = item?;
            let record: Record = serde_json::from_slice(&bytes)?;
            let Some(key) = self.entry_key(&pk, &record) else { continue };
            if self.spec.unique && self.tree.contains_key(&key)? {
                self.tree.clear()?;
                return Err(EngineError::Constraint { index: Some(self.spec.name.clone()) }.into());
            }
            self.tree.insert(key, pk)?;
            count += 1;
        }
        debug!("backfilled index {} with {} entries", self.spec.name, count);
        Ok(count)
    }
}

pub(crate) type TxError = sled::transaction::ConflictableTransactionError<EngineError>;
