// Keystrata — KeyStore-wide edits

use std::collections::HashSet;

use super::Edit;
use crate::crypto::Password;
use crate::history::{HistoryError, HistoryMode, StateId, StoreHistory};
use crate::keystore::{EntryKind, KeyStoreError, KeyStoreType};

/// Set the password protecting the keystore as a whole.
pub fn set_store_password(history: &mut StoreHistory, password: Password) -> Result<StateId, HistoryError> {
    let mut next = history.create_basis_for_next_state(Edit::SetKeyStorePassword)?;
    next.set_password(password);

    let id = next.append();
    tracing::info!(state = %id, "KeyStore password changed");
    Ok(id)
}

/// Convert the keystore to another type by copying every entry into an
/// empty keystore of `target`. Every key entry must have a cached password.
/// Converting to the current type is a no-op. Aliases that `target` would
/// treat as the same alias are refused with `AliasExists`.
pub fn change_store_type(history: &mut StoreHistory, target: KeyStoreType) -> Result<StateId, HistoryError> {
    let current_type = history.current_state().store_type();
    if current_type == target {
        return Ok(history.current_id());
    }
    if history.mode() == HistoryMode::InPlace {
        return Err(KeyStoreError::Unsupported(current_type).into());
    }

    let mut next = history.create_basis_for_next_state(Edit::ChangeType(target))?;
    let mut converted = next.store().create_empty(target)?;
    let aliases = next.store().aliases()?;

    let mut normalized = HashSet::new();
    for alias in &aliases {
        if !normalized.insert(target.normalize_alias(alias)) {
            return Err(KeyStoreError::AliasExists(alias.clone()).into());
        }
    }

    for alias in aliases {
        match next.store().entry_kind(&alias)? {
            Some(EntryKind::TrustedCertificate) => {
                let certificate = next.store().trusted_certificate(&alias)?;
                converted.set_certificate_entry(&alias, certificate)?;
            }
            Some(EntryKind::KeyPair | EntryKind::Key) => {
                let password = next
                    .entry_password(&alias)
                    .ok_or_else(|| HistoryError::PasswordRequired(alias.clone()))?;
                let key = next.store().unlock_entry(&alias, password)?;
                let chain = next.store().certificate_chain(&alias)?;
                converted.set_key_entry(&alias, key, password, chain)?;
            }
            None => {}
        }
    }

    next.set_store(converted)?;

    let id = next.append();
    tracing::info!(from = %current_type, to = %target, state = %id, "KeyStore type changed");
    Ok(id)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
