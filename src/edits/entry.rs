// Keystrata — Entry edits
//
// Edits that touch a single keystore entry. Entry passwords in the state
// cache are kept in step with the entries: removed with the entry, moved
// with a rename, replaced when the password changes.

use super::Edit;
use crate::crypto::{KeyMaterial, Password};
use crate::history::{HistoryError, StateId, StoreHistory};
use crate::keystore::{Certificate, EntryKind, KeyStoreError};

/// Add a key entry protected by `password`. A non-empty `chain` makes it a
/// key pair entry; an empty one a secret key entry.
pub fn add_key_pair(
    history: &mut StoreHistory,
    alias: &str,
    key: KeyMaterial,
    password: Password,
    chain: Vec<Certificate>,
) -> Result<StateId, HistoryError> {
    let mut next = history.create_basis_for_next_state(Edit::AddKeyPair)?;

    if next.store().contains_alias(alias)? {
        return Err(KeyStoreError::AliasExists(alias.to_string()).into());
    }

    next.store_mut().set_key_entry(alias, key, &password, chain)?;
    next.set_entry_password(alias, password);

    let id = next.append();
    tracing::info!(alias = %alias, state = %id, "Key entry added");
    Ok(id)
}

pub fn add_trusted_certificate(
    history: &mut StoreHistory,
    alias: &str,
    certificate: Certificate,
) -> Result<StateId, HistoryError> {
    let mut next = history.create_basis_for_next_state(Edit::ImportTrustedCertificate)?;

    if next.store().contains_alias(alias)? {
        return Err(KeyStoreError::AliasExists(alias.to_string()).into());
    }

    next.store_mut().set_certificate_entry(alias, certificate)?;

    let id = next.append();
    tracing::info!(alias = %alias, state = %id, "Trusted certificate imported");
    Ok(id)
}

/// Delete an entry together with its cached password.
pub fn delete_entry(history: &mut StoreHistory, alias: &str) -> Result<StateId, HistoryError> {
    let mut next = history.create_basis_for_next_state(Edit::DeleteEntry)?;

    if !next.store_mut().delete_entry(alias)? {
        return Err(KeyStoreError::EntryNotFound(alias.to_string()).into());
    }
    next.remove_entry_password(alias);

    let id = next.append();
    tracing::info!(alias = %alias, state = %id, "Entry deleted");
    Ok(id)
}

/// Rename an entry by re-inserting it under `new_alias` and removing the
/// old one. Key entries need their password: the cached one if present,
/// otherwise `password`.
pub fn rename_entry(
    history: &mut StoreHistory,
    old_alias: &str,
    new_alias: &str,
    password: Option<Password>,
) -> Result<StateId, HistoryError> {
    let mut next = history.create_basis_for_next_state(Edit::RenameEntry)?;

    let store_type = next.store_type();
    let same_entry = store_type.normalize_alias(old_alias) == store_type.normalize_alias(new_alias);
    if !same_entry && next.store().contains_alias(new_alias)? {
        return Err(KeyStoreError::AliasExists(new_alias.to_string()).into());
    }

    let kind = next.store().entry_kind(old_alias)?;
    match kind {
        None => return Err(KeyStoreError::EntryNotFound(old_alias.to_string()).into()),
        Some(EntryKind::TrustedCertificate) => {
            let certificate = next.store().trusted_certificate(old_alias)?;
            next.store_mut().delete_entry(old_alias)?;
            next.store_mut().set_certificate_entry(new_alias, certificate)?;
        }
        Some(EntryKind::KeyPair | EntryKind::Key) => {
            let cached = next.entry_password(old_alias).map(Password::duplicate);
            let from_caller = cached.is_none();
            let password = match cached.or(password) {
                Some(password) => password,
                None => return Err(HistoryError::PasswordRequired(old_alias.to_string())),
            };

            let key = next.store().unlock_entry(old_alias, &password)?;
            let chain = next.store().certificate_chain(old_alias)?;

            if from_caller {
                // Verified by the unlock above; remember it where the edit started.
                next.previous_state_mut()
                    .set_entry_password(old_alias, password.duplicate());
            }

            next.store_mut().delete_entry(old_alias)?;
            next.remove_entry_password(old_alias);
            next.store_mut().set_key_entry(new_alias, key, &password, chain)?;
            next.set_entry_password(new_alias, password);
        }
    }

    let id = next.append();
    tracing::info!(from = %old_alias, to = %new_alias, state = %id, "Entry renamed");
    Ok(id)
}

/// Change the password protecting a key entry by recreating the entry.
///
/// The old password is the cached one if present, otherwise `old_password`.
/// Once verified it is also cached on the state the edit started from, so
/// that undo still knows it.
pub fn set_entry_password(
    history: &mut StoreHistory,
    alias: &str,
    old_password: Option<Password>,
    new_password: Password,
) -> Result<StateId, HistoryError> {
    let mut next = history.create_basis_for_next_state(Edit::SetKeyPairPassword)?;

    let old_password = match next.entry_password(alias).map(Password::duplicate).or(old_password) {
        Some(password) => password,
        None => return Err(HistoryError::PasswordRequired(alias.to_string())),
    };

    let key = next.store().unlock_entry(alias, &old_password)?;
    let chain = next.store().certificate_chain(alias)?;

    next.store_mut().delete_entry(alias)?;
    next.remove_entry_password(alias);
    next.store_mut().set_key_entry(alias, key, &new_password, chain)?;

    if next.previous_state_mut().entry_password(alias).is_none() {
        next.previous_state_mut().set_entry_password(alias, old_password);
    }
    next.set_entry_password(alias, new_password);

    let id = next.append();
    tracing::info!(alias = %alias, state = %id, "Entry password changed");
    Ok(id)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
