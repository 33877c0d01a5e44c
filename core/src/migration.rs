//! Additive-only schema migration.
//!
//! Runs inside an engine's upgrade step, once per open, only when the stored
//! version is older than the schema version. Missing collections are created
//! together with all of their indexes; existing collections are never touched,
//! dropped or recreated.

use tracing::{debug, info};

use crate::{
    schema::Schema,
    storage::{EngineError, VersionChange},
};

/// What a migration created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
    pub created_collections: Vec<String>,
    /// `(collection, index)` pairs.
    pub created_indexes: Vec<(String, String)>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool { self.created_collections.is_empty() && self.created_indexes.is_empty() }
}

/// Bring `tx` up to `schema`. Any failure is reported as `EngineError::Upgrade` naming
/// the collection being created, which aborts the whole upgrade.
pub fn run(schema: &Schema, tx: &mut dyn VersionChange) -> Result<MigrationReport, EngineError> {
    let mut report = MigrationReport { from_version: tx.old_version(), to_version: tx.new_version(), ..Default::default() };
    info!("migrating {} from v{} to v{}", schema.name(), report.from_version, report.to_version);

    for collection in schema.collections() {
        if tx.has_collection(&collection.name) {
            debug!("collection {} exists, leaving it untouched", collection.name);
            continue;
        }

        let fail = |e: EngineError| EngineError::Upgrade { collection: collection.name.clone(), cause: e.to_string() };

        tx.create_collection(&collection.name, &collection.primary_key).map_err(fail)?;
        report.created_collections.push(collection.name.clone());
        debug!("created collection {} keyed by {}", collection.name, collection.primary_key);

        for index in &collection.indexes {
            tx.create_index(&collection.name, index).map_err(fail)?;
            report.created_indexes.push((collection.name.clone(), index.name.clone()));
            debug!("created index {}.{} on {}{}", collection.name, index.name, index.key_field, if index.unique { " (unique)" } else { "" });
        }
    }

    info!(
        "migration of {} to v{} created {} collection(s) and {} index(es)",
        schema.name(),
        report.to_version,
        report.created_collections.len(),
        report.created_indexes.len()
    );
    Ok(report)
}
