// Keystrata — KeyStore Module
//
// The keystore capability consumed by the history engine, the catalogue of
// keystore types, and an in-memory implementation of the capability.

mod error;
mod kind;
mod memory;
mod models;
mod provider;

pub use error::{KeyStoreError, StoreCopyError};
pub use kind::KeyStoreType;
pub use memory::MemoryKeyStore;
pub use models::{Certificate, EntryKind};
pub use provider::KeyStore;

#[cfg(test)]
pub use provider::mock;
