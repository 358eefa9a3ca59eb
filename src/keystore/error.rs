// Keystrata — KeyStore error types

use thiserror::Error;

use super::KeyStoreType;
use crate::crypto::SecretError;

#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// The supplied password does not unlock the entry.
    #[error("Password incorrect for entry '{alias}'")]
    Auth { alias: String },

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Entry '{0}' is not a key entry")]
    NotKeyEntry(String),

    #[error("An entry with alias '{0}' already exists")]
    AliasExists(String),

    #[error("KeyStore could not be read: {0}")]
    Unreadable(String),

    #[error("Operation not supported by {0} keystores")]
    Unsupported(KeyStoreType),

    #[error("Password error: {0}")]
    Secret(#[from] SecretError),
}

impl KeyStoreError {
    /// Is this a wrong-password failure rather than a problem with the store?
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, KeyStoreError::Auth { .. })
    }
}

/// A keystore could not be duplicated.
#[derive(Debug, Error)]
#[error("Could not copy {store_type} keystore: {reason}")]
pub struct StoreCopyError {
    pub store_type: KeyStoreType,
    pub reason: String,
}

impl StoreCopyError {
    pub fn not_duplicable(store_type: KeyStoreType) -> Self {
        Self {
            store_type,
            reason: "keystores of this type are not file based".to_string(),
        }
    }
}
