// Keystrata — Edits Module
//
// The keystore edits offered to users, each recorded as one history state:
// an edit asks the history for the basis of the next state, changes the
// keystore and password cache inside it, then appends it.

mod entry;
mod keystore;

use std::fmt;

use crate::history::HistoryAction;
use crate::keystore::KeyStoreType;

pub use entry::{add_key_pair, add_trusted_certificate, delete_entry, rename_entry, set_entry_password};
pub use keystore::{change_store_type, set_store_password};

/// The kinds of edit recorded in a keystore history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    AddKeyPair,
    ImportTrustedCertificate,
    DeleteEntry,
    RenameEntry,
    SetKeyPairPassword,
    SetKeyStorePassword,
    ChangeType(KeyStoreType),
}

impl HistoryAction for Edit {
    fn history_description(&self) -> String {
        match self {
            Edit::AddKeyPair => "Add Key Pair".to_string(),
            Edit::ImportTrustedCertificate => "Import Trusted Certificate".to_string(),
            Edit::DeleteEntry => "Delete Entry".to_string(),
            Edit::RenameEntry => "Rename Entry".to_string(),
            Edit::SetKeyPairPassword => "Set Key Pair Password".to_string(),
            Edit::SetKeyStorePassword => "Set KeyStore Password".to_string(),
            Edit::ChangeType(target) => format!("Change KeyStore Type to {}", target),
        }
    }
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.history_description())
    }
}
