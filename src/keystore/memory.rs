// Keystrata — In-memory KeyStore
//
// Reference implementation of the `KeyStore` capability. Key entries are
// gated by a salted SHA-256 password verifier; the key material itself is
// held in zeroizing buffers. Duplication is a deep copy and is refused for
// kinds that are not file based, exactly as a hardware token would refuse.

use std::collections::BTreeMap;
use std::fmt;

use rand::RngCore;
use sha2::{Digest, Sha256};

use super::{Certificate, EntryKind, KeyStore, KeyStoreError, KeyStoreType, StoreCopyError};
use crate::crypto::{KeyMaterial, Password};

/// Length of the per-entry random salt in bytes.
const SALT_LEN: usize = 16;

#[derive(Clone)]
struct Protection {
    salt: [u8; SALT_LEN],
    verifier: [u8; 32],
}

impl Protection {
    fn new(password: &str) -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::rng().fill_bytes(&mut salt);
        let verifier = Self::digest(&salt, password);
        Self { salt, verifier }
    }

    fn digest(salt: &[u8], password: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(password.as_bytes());
        hasher.finalize().into()
    }

    fn verify(&self, password: &str) -> bool {
        Self::digest(&self.salt, password) == self.verifier
    }
}

impl fmt::Debug for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Protection([REDACTED])")
    }
}

#[derive(Debug, Clone)]
enum EntryBody {
    Key {
        protection: Protection,
        key: KeyMaterial,
        chain: Vec<Certificate>,
    },
    TrustedCertificate(Certificate),
}

#[derive(Debug, Clone)]
struct StoredEntry {
    /// Alias as originally given, before normalisation.
    alias: String,
    body: EntryBody,
}

/// A keystore held entirely in process memory.
#[derive(Debug, Clone)]
pub struct MemoryKeyStore {
    store_type: KeyStoreType,
    entries: BTreeMap<String, StoredEntry>,
}

impl MemoryKeyStore {
    pub fn new(store_type: KeyStoreType) -> Self {
        Self {
            store_type,
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(&self, alias: &str) -> String {
        self.store_type.normalize_alias(alias)
    }

    fn entry(&self, alias: &str) -> Result<&StoredEntry, KeyStoreError> {
        self.entries
            .get(&self.key(alias))
            .ok_or_else(|| KeyStoreError::EntryNotFound(alias.to_string()))
    }
}

impl KeyStore for MemoryKeyStore {
    fn store_type(&self) -> KeyStoreType {
        self.store_type
    }

    fn duplicate(&self) -> Result<Box<dyn KeyStore>, StoreCopyError> {
        if !self.store_type.is_file_based() {
            return Err(StoreCopyError::not_duplicable(self.store_type));
        }
        Ok(Box::new(self.clone()))
    }

    fn create_empty(&self, store_type: KeyStoreType) -> Result<Box<dyn KeyStore>, KeyStoreError> {
        if !store_type.is_file_based() {
            return Err(KeyStoreError::Unsupported(store_type));
        }
        Ok(Box::new(MemoryKeyStore::new(store_type)))
    }

    fn aliases(&self) -> Result<Vec<String>, KeyStoreError> {
        Ok(self.entries.values().map(|e| e.alias.clone()).collect())
    }

    fn entry_kind(&self, alias: &str) -> Result<Option<EntryKind>, KeyStoreError> {
        Ok(self.entries.get(&self.key(alias)).map(|e| match &e.body {
            EntryBody::Key { chain, .. } if chain.is_empty() => EntryKind::Key,
            EntryBody::Key { .. } => EntryKind::KeyPair,
            EntryBody::TrustedCertificate(_) => EntryKind::TrustedCertificate,
        }))
    }

    fn certificate_chain(&self, alias: &str) -> Result<Vec<Certificate>, KeyStoreError> {
        match &self.entry(alias)?.body {
            EntryBody::Key { chain, .. } => Ok(chain.clone()),
            EntryBody::TrustedCertificate(_) => Ok(Vec::new()),
        }
    }

    fn trusted_certificate(&self, alias: &str) -> Result<Certificate, KeyStoreError> {
        match &self.entry(alias)?.body {
            EntryBody::TrustedCertificate(cert) => Ok(cert.clone()),
            EntryBody::Key { .. } => Err(KeyStoreError::EntryNotFound(alias.to_string())),
        }
    }

    fn unlock_entry(&self, alias: &str, password: &Password) -> Result<KeyMaterial, KeyStoreError> {
        match &self.entry(alias)?.body {
            EntryBody::Key {
                protection, key, ..
            } => {
                if self.store_type.has_entry_passwords() && !protection.verify(password.expose()?) {
                    return Err(KeyStoreError::Auth {
                        alias: alias.to_string(),
                    });
                }
                Ok(key.clone())
            }
            EntryBody::TrustedCertificate(_) => Err(KeyStoreError::NotKeyEntry(alias.to_string())),
        }
    }

    fn set_key_entry(
        &mut self,
        alias: &str,
        key: KeyMaterial,
        password: &Password,
        chain: Vec<Certificate>,
    ) -> Result<(), KeyStoreError> {
        let protection = Protection::new(password.expose()?);
        self.entries.insert(
            self.key(alias),
            StoredEntry {
                alias: alias.to_string(),
                body: EntryBody::Key {
                    protection,
                    key,
                    chain,
                },
            },
        );
        Ok(())
    }

    fn set_certificate_entry(&mut self, alias: &str, certificate: Certificate) -> Result<(), KeyStoreError> {
        self.entries.insert(
            self.key(alias),
            StoredEntry {
                alias: alias.to_string(),
                body: EntryBody::TrustedCertificate(certificate),
            },
        );
        Ok(())
    }

    fn delete_entry(&mut self, alias: &str) -> Result<bool, KeyStoreError> {
        Ok(self.entries.remove(&self.key(alias)).is_some())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
