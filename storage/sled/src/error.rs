use sled::transaction::TransactionError;
use thiserror::Error;
use wellstore_core::EngineError;

#[derive(Debug, Error)]
pub enum SledEngineError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("catalog encoding error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("record encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("corrupt catalog: {0}")]
    Corrupt(String),
    #[error("failed to get home directory")]
    NoHomeDir,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<TransactionError<EngineError>> for SledEngineError {
    fn from(err: TransactionError<EngineError>) -> Self {
        match err {
            TransactionError::Abort(e) => SledEngineError::Engine(e),
            TransactionError::Storage(e) => SledEngineError::Sled(e),
        }
    }
}

impl From<SledEngineError> for EngineError {
    fn from(err: SledEngineError) -> Self {
        match err {
            SledEngineError::Engine(e) => e,
            SledEngineError::Sled(e) => EngineError::Storage(e.to_string()),
            SledEngineError::Io(e) => EngineError::Storage(e.to_string()),
            SledEngineError::Bincode(e) => EngineError::Codec(e.to_string()),
            SledEngineError::Json(e) => EngineError::Codec(e.to_string()),
            SledEngineError::Corrupt(e) => EngineError::Codec(e),
            SledEngineError::Join(e) => EngineError::Aborted(e.to_string()),
            SledEngineError::NoHomeDir => EngineError::Open("failed to get home directory".into()),
        }
    }
}

/// Failures while opening a database are connection failures, whatever their cause.
pub(crate) fn open_error(err: SledEngineError) -> EngineError {
    match err {
        SledEngineError::Engine(e) => e,
        other => EngineError::Open(other.to_string()),
    }
}
