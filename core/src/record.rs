//! Records are open JSON objects; the store reads only key fields out of them.

use serde_json::{Map, Value};

use crate::key::Key;

/// A dynamically shaped record: field name to JSON value.
pub type Record = Map<String, Value>;

/// Resolve a dotted field path (`"profile.email"`) inside a record.
pub fn field<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = record.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// The key stored at `path`, or `None` if the field is missing or not a valid key.
pub fn key_at(record: &Record, path: &str) -> Option<Key> { field(record, path).and_then(Key::from_json) }

/// Why a record cannot be stored under its primary key.
pub fn primary_key(record: &Record, path: &str) -> Result<Key, String> {
    match field(record, path) {
        None => Err(format!("missing primary key field `{}`", path)),
        Some(value) => Key::from_json(value).ok_or_else(|| format!("primary key field `{}` holds {} which is not a valid key", path, value)),
    }
}
