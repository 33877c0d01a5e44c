use wasm_bindgen::JsValue;
use web_sys::{IdbRequest, IdbTransaction};
use wellstore_core::EngineError;

use crate::{
    error::{dom_error, request_error, transaction_error},
    util::CBFuture,
};

/// Wait for a request to settle and return its result.
pub async fn settled(request: &IdbRequest, what: &'static str) -> Result<JsValue, EngineError> {
    match CBFuture::new(request, "success", "error").await {
        Ok(()) => request.result().map_err(|e| dom_error(e, what)),
        Err(_) => Err(request_error(request, what)),
    }
}

/// Wait for a transaction to commit. Reads resolve on the request alone, writes are only
/// reported once this resolves.
pub async fn committed(transaction: &IdbTransaction, what: &'static str) -> Result<(), EngineError> {
    match CBFuture::new(transaction, "complete", &["error", "abort"]).await {
        Ok(()) => Ok(()),
        Err(_) => Err(transaction_error(transaction, what)),
    }
}
