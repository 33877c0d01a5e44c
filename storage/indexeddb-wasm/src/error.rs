use wasm_bindgen::{JsCast, JsValue};
use web_sys::{DomException, IdbRequest, IdbTransaction};
use wellstore_core::EngineError;

pub(crate) fn extract_message(err: JsValue) -> String {
    if let Some(e) = err.dyn_ref::<DomException>() {
        return format!("{}: {}", e.name(), e.message());
    }
    if let Some(e) = err.dyn_ref::<js_sys::Error>() {
        return format!("{}: {}", e.name(), e.message());
    }
    if let Some(s) = err.as_string() {
        return s;
    }
    js_sys::JSON::stringify(&err).ok().and_then(|s| s.as_string()).unwrap_or_else(|| format!("{:?}", err))
}

fn dom_name(err: &JsValue) -> Option<String> {
    if let Some(e) = err.dyn_ref::<DomException>() {
        return Some(e.name());
    }
    err.dyn_ref::<js_sys::Error>().map(|e| String::from(e.name()))
}

pub(crate) fn is_not_found(err: &JsValue) -> bool { dom_name(err).as_deref() == Some("NotFoundError") }

/// Map an IndexedDB failure onto the engine error vocabulary by its DOMException name.
pub(crate) fn dom_error(err: JsValue, what: &str) -> EngineError {
    let name = dom_name(&err);
    let message = format!("{}: {}", what, extract_message(err));
    match name.as_deref() {
        Some("ConstraintError") => EngineError::Constraint { index: None },
        Some("QuotaExceededError") => EngineError::QuotaExceeded,
        Some("InvalidStateError") => EngineError::Closed,
        Some("DataError") | Some("DataCloneError") => EngineError::Codec(message),
        Some("VersionError") | Some("UnknownError") => EngineError::Open(message),
        Some("AbortError") | Some("TransactionInactiveError") | Some("ReadOnlyError") => EngineError::Aborted(message),
        _ => EngineError::Storage(message),
    }
}

/// The error a failed request reports.
pub(crate) fn request_error(request: &IdbRequest, what: &str) -> EngineError {
    match request.error() {
        Ok(Some(dom)) => dom_error(dom.into(), what),
        Ok(None) => EngineError::Aborted(format!("{}: request failed", what)),
        Err(e) => dom_error(e, what),
    }
}

/// The error an aborted transaction reports. A transaction aborted without one was
/// aborted by us or by the browser, never by a request.
pub(crate) fn transaction_error(transaction: &IdbTransaction, what: &str) -> EngineError {
    match transaction.error() {
        Some(dom) => dom_error(dom.into(), what),
        None => EngineError::Aborted(format!("{}: transaction aborted", what)),
    }
}
