//! Key, range and record conversions between wellstore and IndexedDB values.

use std::ops::Bound;

use js_sys::{Array, ArrayBuffer, Uint8Array};
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::IdbKeyRange;
use wellstore_core::{EngineError, Key, KeyRange, Record};

use crate::error::dom_error;

/// IndexedDB's own key ordering (number < string < binary < array) matches [`Key`]'s, so
/// ranges built from converted keys select the same records as the native engine.
pub fn key_to_js(key: &Key) -> JsValue {
    match key {
        Key::Number(n) => JsValue::from_f64(*n),
        Key::String(s) => JsValue::from_str(s),
        Key::Binary(bytes) => Uint8Array::from(bytes.as_slice()).buffer().into(),
        Key::Array(items) => items.iter().map(key_to_js).collect::<Array>().into(),
    }
}

pub fn key_from_js(value: &JsValue) -> Option<Key> {
    if let Some(n) = value.as_f64() {
        return Key::number(n);
    }
    if let Some(s) = value.as_string() {
        return Some(Key::String(s));
    }
    if value.is_instance_of::<ArrayBuffer>() {
        return Some(Key::Binary(Uint8Array::new(value).to_vec()));
    }
    if let Some(view) = value.dyn_ref::<Uint8Array>() {
        return Some(Key::Binary(view.to_vec()));
    }
    if Array::is_array(value) {
        return Array::from(value).iter().map(|item| key_from_js(&item)).collect::<Option<Vec<_>>>().map(Key::Array);
    }
    None
}

fn bound(bound: &Bound<Key>) -> Option<(JsValue, bool)> {
    match bound {
        Bound::Included(key) => Some((key_to_js(key), false)),
        Bound::Excluded(key) => Some((key_to_js(key), true)),
        Bound::Unbounded => None,
    }
}

/// `None` for the unbounded range, which IndexedDB expresses by passing no range at all.
pub fn range_to_js(range: &KeyRange) -> Result<Option<IdbKeyRange>, EngineError> {
    if let Some(key) = range.as_only() {
        return IdbKeyRange::only(&key_to_js(key)).map(Some).map_err(|e| dom_error(e, "build key range"));
    }
    let built = match (bound(&range.lower), bound(&range.upper)) {
        (None, None) => return Ok(None),
        (Some((lower, open)), None) => IdbKeyRange::lower_bound_with_open(&lower, open),
        (None, Some((upper, open))) => IdbKeyRange::upper_bound_with_open(&upper, open),
        (Some((lower, lower_open)), Some((upper, upper_open))) => {
            IdbKeyRange::bound_with_lower_open_and_upper_open(&lower, &upper, lower_open, upper_open)
        }
    };
    built.map(Some).map_err(|e| dom_error(e, "build key range"))
}

pub fn record_to_js(record: &Record) -> Result<JsValue, EngineError> {
    record.serialize(&serde_wasm_bindgen::Serializer::json_compatible()).map_err(|e| EngineError::Codec(e.to_string()))
}

pub fn record_from_js(value: JsValue) -> Result<Record, EngineError> {
    serde_wasm_bindgen::from_value(value).map_err(|e| EngineError::Codec(e.to_string()))
}

pub fn records_from_js(value: JsValue) -> Result<Vec<Record>, EngineError> {
    Array::from(&value).iter().map(record_from_js).collect()
}

/// An optional record, `undefined` meaning "no such key".
pub fn maybe_record(value: JsValue) -> Result<Option<Record>, EngineError> {
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    record_from_js(value).map(Some)
}

pub fn count_from_js(value: &JsValue) -> Result<u64, EngineError> {
    value.as_f64().map(|n| n as u64).ok_or_else(|| EngineError::Codec("count is not a number".into()))
}
