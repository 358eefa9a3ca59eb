// Keystrata — Library root
//
// Re-exports the crypto, keystore, history, edits and CLI modules.

pub mod cli;
pub mod crypto;
pub mod edits;
pub mod error;
pub mod history;
pub mod keystore;

pub use error::{KeystrataError, Result};
