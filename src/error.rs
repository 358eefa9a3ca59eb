// Keystrata — Top-level error types
//
// Aggregates errors from the crypto, keystore and history modules into a
// single error enum for the application boundary.

use thiserror::Error;

/// Top-level error type for all Keystrata operations.
#[derive(Debug, Error)]
pub enum KeystrataError {
    #[error("History error: {0}")]
    History(#[from] crate::history::HistoryError),

    #[error("KeyStore error: {0}")]
    KeyStore(#[from] crate::keystore::KeyStoreError),

    #[error("Password error: {0}")]
    Secret(#[from] crate::crypto::SecretError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Script error: {0}")]
    Script(#[from] serde_json::Error),
}

impl From<crate::keystore::StoreCopyError> for KeystrataError {
    fn from(e: crate::keystore::StoreCopyError) -> Self {
        KeystrataError::History(e.into())
    }
}

impl From<crate::history::PropagationError> for KeystrataError {
    fn from(e: crate::history::PropagationError) -> Self {
        KeystrataError::History(e.into())
    }
}

pub type Result<T> = std::result::Result<T, KeystrataError>;
