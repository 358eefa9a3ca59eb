// Keystrata — History error types

use thiserror::Error;

use crate::crypto::SecretError;
use crate::keystore::{KeyStoreError, StoreCopyError};

/// Cached entry passwords could not be carried into an adjacent state
/// because the keystore itself failed (not because a password was wrong).
#[derive(Debug, Error)]
#[error("Could not propagate entry passwords (entry '{alias}'): {source}")]
pub struct PropagationError {
    pub alias: String,
    #[source]
    pub source: KeyStoreError,
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error(transparent)]
    Copy(#[from] StoreCopyError),

    #[error(transparent)]
    Propagation(#[from] PropagationError),

    #[error("KeyStore error: {0}")]
    KeyStore(#[from] KeyStoreError),

    #[error("Password error: {0}")]
    Secret(#[from] SecretError),

    #[error("A password is required for entry '{0}'")]
    PasswordRequired(String),
}
