// Keystrata — KeyStore capability
//
// The history engine never loads, saves or encrypts a keystore itself. It
// consumes this trait, which is implemented by whatever backend holds the
// entries (an in-memory store, a file-backed store, a hardware token).

use std::fmt;

use super::{Certificate, EntryKind, KeyStoreError, KeyStoreType, StoreCopyError};
use crate::crypto::{KeyMaterial, Password};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a mutable keystore, enabling in-memory, file-backed and
/// hardware-backed implementations as well as test doubles.
pub trait KeyStore: fmt::Debug {
    /// The kind of keystore, which determines its capabilities.
    fn store_type(&self) -> KeyStoreType;

    /// Produce a structurally independent copy of this keystore.
    /// Fails for kinds that cannot be serialized and reloaded.
    fn duplicate(&self) -> Result<Box<dyn KeyStore>, StoreCopyError>;

    /// Create an empty keystore of another type from the same backend.
    fn create_empty(&self, store_type: KeyStoreType) -> Result<Box<dyn KeyStore>, KeyStoreError>;

    /// All entry aliases, in a stable order.
    fn aliases(&self) -> Result<Vec<String>, KeyStoreError>;

    /// Classify an entry. Returns `None` when the alias is absent.
    fn entry_kind(&self, alias: &str) -> Result<Option<EntryKind>, KeyStoreError>;

    /// Certificate chain of a key pair entry (empty for other entries).
    fn certificate_chain(&self, alias: &str) -> Result<Vec<Certificate>, KeyStoreError>;

    /// Certificate of a trusted certificate entry.
    fn trusted_certificate(&self, alias: &str) -> Result<Certificate, KeyStoreError>;

    /// Recover the private or secret key of an entry using `password`.
    /// A wrong password fails with [`KeyStoreError::Auth`].
    fn unlock_entry(&self, alias: &str, password: &Password) -> Result<KeyMaterial, KeyStoreError>;

    /// Store a key entry protected by `password`, replacing any entry under
    /// the same alias. An empty `chain` creates a secret key entry.
    fn set_key_entry(
        &mut self,
        alias: &str,
        key: KeyMaterial,
        password: &Password,
        chain: Vec<Certificate>,
    ) -> Result<(), KeyStoreError>;

    /// Store a trusted certificate entry, replacing any entry under the same alias.
    fn set_certificate_entry(&mut self, alias: &str, certificate: Certificate) -> Result<(), KeyStoreError>;

    /// Delete an entry. Returns true if it existed.
    fn delete_entry(&mut self, alias: &str) -> Result<bool, KeyStoreError>;

    /// Can this keystore be snapshot-copied for undo/redo?
    fn is_duplicable(&self) -> bool {
        self.store_type().is_file_based()
    }

    fn contains_alias(&self, alias: &str) -> Result<bool, KeyStoreError> {
        Ok(self.entry_kind(alias)?.is_some())
    }

    /// Does the entry hold a key that needs a password to access?
    fn is_key_entry(&self, alias: &str) -> Result<bool, KeyStoreError> {
        Ok(self.entry_kind(alias)?.is_some_and(|kind| kind.is_protected()))
    }

    /// Is the entry a private key with a non-empty certificate chain?
    fn is_key_pair_entry(&self, alias: &str) -> Result<bool, KeyStoreError> {
        Ok(self.entry_kind(alias)? == Some(EntryKind::KeyPair))
    }

    fn is_trusted_certificate_entry(&self, alias: &str) -> Result<bool, KeyStoreError> {
        Ok(self.entry_kind(alias)? == Some(EntryKind::TrustedCertificate))
    }
}

// ─── Test Double ─────────────────────────────────────────────────────────────

/// A keystore wrapper whose backend can be switched into an unreadable
/// state. Used to inject structural failures that are not wrong passwords.
#[cfg(test)]
pub mod mock {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::keystore::MemoryKeyStore;

    #[derive(Debug)]
    pub struct FaultyKeyStore {
        inner: MemoryKeyStore,
        unreadable: Rc<Cell<bool>>,
    }

    impl FaultyKeyStore {
        /// Wrap `inner`. The returned switch is shared by every duplicate.
        pub fn new(inner: MemoryKeyStore) -> (Self, Rc<Cell<bool>>) {
            let unreadable = Rc::new(Cell::new(false));
            (
                Self {
                    inner,
                    unreadable: Rc::clone(&unreadable),
                },
                unreadable,
            )
        }

        fn check(&self) -> Result<(), KeyStoreError> {
            if self.unreadable.get() {
                return Err(KeyStoreError::Unreadable("backend unavailable".to_string()));
            }
            Ok(())
        }
    }

    impl KeyStore for FaultyKeyStore {
        fn store_type(&self) -> KeyStoreType {
            self.inner.store_type()
        }

        fn duplicate(&self) -> Result<Box<dyn KeyStore>, StoreCopyError> {
            Ok(Box::new(Self {
                inner: self.inner.clone(),
                unreadable: Rc::clone(&self.unreadable),
            }))
        }

        fn create_empty(&self, store_type: KeyStoreType) -> Result<Box<dyn KeyStore>, KeyStoreError> {
            self.inner.create_empty(store_type)
        }

        fn aliases(&self) -> Result<Vec<String>, KeyStoreError> {
            self.check()?;
            self.inner.aliases()
        }

        fn entry_kind(&self, alias: &str) -> Result<Option<EntryKind>, KeyStoreError> {
            self.check()?;
            self.inner.entry_kind(alias)
        }

        fn certificate_chain(&self, alias: &str) -> Result<Vec<Certificate>, KeyStoreError> {
            self.check()?;
            self.inner.certificate_chain(alias)
        }

        fn trusted_certificate(&self, alias: &str) -> Result<Certificate, KeyStoreError> {
            self.check()?;
            self.inner.trusted_certificate(alias)
        }

        fn unlock_entry(&self, alias: &str, password: &Password) -> Result<KeyMaterial, KeyStoreError> {
            self.check()?;
            self.inner.unlock_entry(alias, password)
        }

        fn set_key_entry(
            &mut self,
            alias: &str,
            key: KeyMaterial,
            password: &Password,
            chain: Vec<Certificate>,
        ) -> Result<(), KeyStoreError> {
            self.inner.set_key_entry(alias, key, password, chain)
        }

        fn set_certificate_entry(&mut self, alias: &str, certificate: Certificate) -> Result<(), KeyStoreError> {
            self.inner.set_certificate_entry(alias, certificate)
        }

        fn delete_entry(&mut self, alias: &str) -> Result<bool, KeyStoreError> {
            self.inner.delete_entry(alias)
        }
    }
}
