use anyhow::anyhow;
use wasm_bindgen::JsValue;

use crate::error::extract_message;

/// Turn the assorted `Option` / `Result<_, JsValue>` shapes of web-sys into `anyhow` errors
/// with a short description of what was being fetched.
pub trait Require<T> {
    fn require(self, what: &'static str) -> anyhow::Result<T>;
}

impl<T> Require<T> for Option<T> {
    fn require(self, what: &'static str) -> anyhow::Result<T> { self.ok_or_else(|| anyhow!("{} is unavailable", what)) }
}

impl<T> Require<T> for Result<T, JsValue> {
    fn require(self, what: &'static str) -> anyhow::Result<T> { self.map_err(|e| anyhow!("{}: {}", what, extract_message(e))) }
}

impl<T> Require<T> for Result<Option<T>, JsValue> {
    fn require(self, what: &'static str) -> anyhow::Result<T> {
        match self {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(anyhow!("{} is unavailable", what)),
            Err(e) => Err(anyhow!("{}: {}", what, extract_message(e))),
        }
    }
}
