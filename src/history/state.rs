// Keystrata — History state
//
// One snapshot of a keystore in the undo/redo history: the keystore itself,
// its cached password, and a cache of entry passwords. States are linked
// through `StateId`s into the arena owned by `StoreHistory`.
//
// The propagation algorithm lives here. When the history moves from one
// state to an adjacent one, entry passwords known in the source but not in
// the target are carried over, but only when the password both unlocks the
// entry in the target and unlocks the *same* key there.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::{HistoryAction, PropagationError};
use crate::crypto::{key_material_matches, KeyMaterial, Password};
use crate::keystore::{KeyStore, KeyStoreError, KeyStoreType, StoreCopyError};

/// Stable handle of a state within its history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StateId(pub(crate) usize);

impl StateId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single keystore snapshot in the undo/redo history.
#[derive(Debug)]
pub struct StoreState {
    store: Box<dyn KeyStore>,
    password: Option<Password>,
    entry_passwords: HashMap<String, Password>,
    pub(crate) previous: Option<StateId>,
    pub(crate) next: Option<StateId>,
    action: Option<Box<dyn HistoryAction>>,
    stored_in_password_manager: bool,
}

impl StoreState {
    pub(crate) fn new(store: Box<dyn KeyStore>, password: Option<Password>) -> Self {
        Self {
            store,
            password,
            entry_passwords: HashMap::new(),
            previous: None,
            next: None,
            action: None,
            stored_in_password_manager: false,
        }
    }

    /// Create the basis for the next state: a copy of this state, excluding
    /// its position in the history, tagged with the action that will
    /// produce it. The copy shares no mutable data with this state.
    pub fn create_basis_for_next_state<A>(&self, action: A) -> Result<StoreState, StoreCopyError>
    where
        A: HistoryAction + 'static,
    {
        let store = self.store.duplicate()?;

        let entry_passwords = self
            .entry_passwords
            .iter()
            .map(|(alias, password)| (alias.clone(), password.duplicate()))
            .collect();

        Ok(StoreState {
            store,
            password: self.password.as_ref().map(Password::duplicate),
            entry_passwords,
            previous: None,
            next: None,
            action: Some(Box::new(action)),
            stored_in_password_manager: self.stored_in_password_manager,
        })
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    pub fn store(&self) -> &dyn KeyStore {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut dyn KeyStore {
        self.store.as_mut()
    }

    /// Replace the keystore, e.g. after converting it to another type.
    ///
    /// Cached entry passwords are re-keyed for the new store's alias rules.
    /// Passwords of aliases the new store does not hold are wiped.
    pub fn set_store(&mut self, store: Box<dyn KeyStore>) -> Result<(), KeyStoreError> {
        let aliases = store.aliases()?;
        let old_type = self.store_type();
        let new_type = store.store_type();

        let mut rekeyed = HashMap::new();
        for alias in aliases {
            if let Some(password) = self.entry_passwords.remove(&old_type.normalize_alias(&alias)) {
                rekeyed.insert(new_type.normalize_alias(&alias), password);
            }
        }
        for (alias, mut stale) in self.entry_passwords.drain() {
            tracing::debug!(alias = %alias, "Cached password dropped with replaced keystore");
            stale.wipe();
        }

        self.entry_passwords = rekeyed;
        self.store = store;
        Ok(())
    }

    pub fn store_type(&self) -> KeyStoreType {
        self.store.store_type()
    }

    pub fn password(&self) -> Option<&Password> {
        self.password.as_ref()
    }

    /// Set the cached keystore password. A replaced password is wiped.
    pub fn set_password(&mut self, password: Password) {
        if let Some(mut old) = self.password.replace(password) {
            old.wipe();
        }
    }

    pub fn entry_password(&self, alias: &str) -> Option<&Password> {
        self.entry_passwords.get(&self.cache_key(alias))
    }

    /// Cache the password of an entry. A replaced password is wiped.
    pub fn set_entry_password(&mut self, alias: &str, password: Password) {
        let key = self.cache_key(alias);
        if let Some(mut old) = self.entry_passwords.insert(key, password) {
            old.wipe();
        }
    }

    /// Remove and wipe an entry's cached password.
    pub fn remove_entry_password(&mut self, alias: &str) {
        let key = self.cache_key(alias);
        if let Some(mut removed) = self.entry_passwords.remove(&key) {
            removed.wipe();
        }
    }

    /// Cache key of an alias: the alias as the keystore type compares it.
    fn cache_key(&self, alias: &str) -> String {
        self.store_type().normalize_alias(alias)
    }

    /// Aliases with a cached password, in their normalised form, sorted.
    pub fn cached_aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.entry_passwords.keys().cloned().collect();
        aliases.sort();
        aliases
    }

    pub fn action_description(&self) -> Option<String> {
        self.action.as_ref().map(|a| a.history_description())
    }

    pub fn previous_state(&self) -> Option<StateId> {
        self.previous
    }

    pub fn next_state(&self) -> Option<StateId> {
        self.next
    }

    pub fn has_previous_state(&self) -> bool {
        self.previous.is_some()
    }

    pub fn has_next_state(&self) -> bool {
        self.next.is_some()
    }

    /// Did a password cached in this state come from an external password manager?
    pub fn is_stored_in_password_manager(&self) -> bool {
        self.stored_in_password_manager
    }

    pub fn set_stored_in_password_manager(&mut self, stored: bool) {
        self.stored_in_password_manager = stored;
    }

    /// Wipe the keystore password and every cached entry password of this
    /// state. Other states in the history are untouched.
    pub fn wipe_passwords(&mut self) {
        if let Some(password) = self.password.as_mut() {
            password.wipe();
        }
        for password in self.entry_passwords.values_mut() {
            password.wipe();
        }
    }

    // ─── Propagation ─────────────────────────────────────────────────────────

    /// Copy entry passwords not yet cached in `target` from this state,
    /// where valid. Returns the number of passwords propagated.
    pub fn propagate_new_passwords(&self, target: &mut StoreState) -> Result<usize, PropagationError> {
        let plan = self.plan_propagation(target)?;
        Ok(plan.apply(target))
    }

    /// Decide which cached entry passwords may be carried into `target`
    /// without modifying it. Wrong passwords are skipped; any other keystore
    /// failure aborts the whole plan.
    pub fn plan_propagation(&self, target: &StoreState) -> Result<PropagationPlan, PropagationError> {
        let mut plan = PropagationPlan::default();

        for (alias, password) in &self.entry_passwords {
            let fail = |source: KeyStoreError| PropagationError {
                alias: alias.clone(),
                source,
            };

            let Some(target_alias) = self.resolve_alias_in(target, alias).map_err(fail)? else {
                continue;
            };
            if !target.store.is_key_entry(&target_alias).map_err(fail)? {
                continue;
            }
            let target_key = target.cache_key(&target_alias);
            if target.entry_passwords.contains_key(&target_key) {
                continue;
            }

            if self
                .is_password_propagation_valid(target, alias, &target_alias, password)
                .map_err(fail)?
            {
                tracing::debug!(alias = %alias, "Entry password propagated to adjacent state");
                plan.passwords.push((target_key, password.duplicate()));
            } else {
                tracing::debug!(alias = %alias, "Entry password not valid in adjacent state");
            }
        }

        Ok(plan)
    }

    /// Find the alias in `target` that this state's cache key `key` refers
    /// to. Stores of the same type share alias rules; across types (after a
    /// type change) the target's aliases are matched under this state's rules.
    fn resolve_alias_in(&self, target: &StoreState, key: &str) -> Result<Option<String>, KeyStoreError> {
        if target.store_type() == self.store_type() {
            return Ok(Some(key.to_string()));
        }
        Ok(target
            .store
            .aliases()?
            .into_iter()
            .find(|alias| self.cache_key(alias) == key))
    }

    /// A password may only be propagated if it is correct for the target
    /// entry and unlocks the same private key as in this state.
    fn is_password_propagation_valid(
        &self,
        target: &StoreState,
        alias: &str,
        target_alias: &str,
        password: &Password,
    ) -> Result<bool, KeyStoreError> {
        let Some(target_key) = Self::unlock_if_correct(target, target_alias, password)? else {
            return Ok(false);
        };
        let current_key = self.store.unlock_entry(alias, password)?;

        Ok(key_material_matches(&current_key, &target_key))
    }

    /// Unlock `alias` in `target`, mapping a wrong password to `None`.
    fn unlock_if_correct(
        target: &StoreState,
        alias: &str,
        password: &Password,
    ) -> Result<Option<KeyMaterial>, KeyStoreError> {
        match target.store.unlock_entry(alias, password) {
            Ok(key) => Ok(Some(key)),
            Err(e) if e.is_auth_failure() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Entry passwords vetted for insertion into a target state, keyed by the
/// target's normalised aliases.
///
/// Applying a plan cannot fail, so a target state either receives every
/// vetted password or, when planning failed, none of them.
#[derive(Debug, Default)]
pub struct PropagationPlan {
    passwords: Vec<(String, Password)>,
}

impl PropagationPlan {
    pub fn len(&self) -> usize {
        self.passwords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passwords.is_empty()
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.passwords.iter().map(|(alias, _)| alias.as_str())
    }

    /// Insert the vetted passwords into `target`. Aliases that gained a
    /// cached password since planning keep it.
    pub fn apply(self, target: &mut StoreState) -> usize {
        let mut applied = 0;
        for (alias, password) in self.passwords {
            if let std::collections::hash_map::Entry::Vacant(slot) = target.entry_passwords.entry(alias) {
                slot.insert(password);
                applied += 1;
            }
        }
        applied
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{DsaPrivateKey, KeyAlgorithm};
    use crate::keystore::mock::FaultyKeyStore;
    use crate::keystore::{Certificate, MemoryKeyStore};

    fn chain() -> Vec<Certificate> {
        vec![Certificate::new("CN=k", vec![0x30])]
    }

    fn state_with_entry(alias: &str, key: KeyMaterial, password: &str) -> StoreState {
        let mut store = MemoryKeyStore::new(KeyStoreType::Pkcs12);
        store
            .set_key_entry(alias, key, &Password::new(password), chain())
            .unwrap();
        let mut state = StoreState::new(Box::new(store), Some(Password::new("storepass")));
        state.set_entry_password(alias, Password::new(password));
        state
    }

    /// A copy of `source` with the cached password for `alias` dropped.
    fn target_without_cache(source: &StoreState, alias: &str) -> StoreState {
        let mut target = source.create_basis_for_next_state("copy").unwrap();
        target.remove_entry_password(alias);
        target
    }

    #[test]
    fn test_basis_is_isolated_from_original() {
        let original = state_with_entry("k1", KeyMaterial::generate(KeyAlgorithm::Rsa), "A");
        let mut basis = original.create_basis_for_next_state("Delete Entry").unwrap();

        basis.store_mut().delete_entry("k1").unwrap();
        basis.remove_entry_password("k1");
        basis.set_password(Password::new("other"));

        assert!(original.store().contains_alias("k1").unwrap());
        assert_eq!(original.entry_password("k1").unwrap().expose().unwrap(), "A");
        assert_eq!(original.password().unwrap().expose().unwrap(), "storepass");
        assert!(!basis.store().contains_alias("k1").unwrap());
    }

    #[test]
    fn test_wiping_original_does_not_wipe_basis() {
        let mut original = state_with_entry("k1", KeyMaterial::generate(KeyAlgorithm::Rsa), "A");
        let basis = original.create_basis_for_next_state("Copy").unwrap();

        original.wipe_passwords();

        assert!(original.entry_password("k1").unwrap().is_wiped());
        assert_eq!(basis.entry_password("k1").unwrap().expose().unwrap(), "A");
        assert_eq!(basis.password().unwrap().expose().unwrap(), "storepass");
    }

    #[test]
    fn test_basis_carries_action_but_no_links() {
        let original = state_with_entry("k1", KeyMaterial::generate(KeyAlgorithm::Ec), "A");
        let basis = original.create_basis_for_next_state("Rename Entry").unwrap();

        assert_eq!(basis.action_description().as_deref(), Some("Rename Entry"));
        assert!(!basis.has_previous_state());
        assert!(!basis.has_next_state());
        assert!(original.action_description().is_none());
    }

    #[test]
    fn test_basis_of_hardware_store_fails() {
        let state = StoreState::new(Box::new(MemoryKeyStore::new(KeyStoreType::Pkcs11)), None);
        assert!(state.create_basis_for_next_state("Edit").is_err());
    }

    #[test]
    fn test_propagates_correct_password_for_same_key() {
        let source = state_with_entry("k1", KeyMaterial::generate(KeyAlgorithm::Rsa), "A");
        let mut target = target_without_cache(&source, "k1");

        let copied = source.propagate_new_passwords(&mut target).unwrap();

        assert_eq!(copied, 1);
        assert_eq!(target.entry_password("k1").unwrap().expose().unwrap(), "A");
    }

    #[test]
    fn test_does_not_propagate_wrong_password() {
        let key = KeyMaterial::generate(KeyAlgorithm::Rsa);
        let source = state_with_entry("k1", key.clone(), "A");
        let mut target = target_without_cache(&source, "k1");
        // Same key, re-protected with a different password in the target.
        target
            .store_mut()
            .set_key_entry("k1", key, &Password::new("B"), chain())
            .unwrap();

        let copied = source.propagate_new_passwords(&mut target).unwrap();

        assert_eq!(copied, 0, "A password that fails to unlock the target must be skipped");
        assert!(target.entry_password("k1").is_none());
    }

    #[test]
    fn test_does_not_propagate_password_for_different_key() {
        let source = state_with_entry("k1", KeyMaterial::generate(KeyAlgorithm::Rsa), "A");
        let mut target = target_without_cache(&source, "k1");
        // Different key under the same alias and the same password.
        target
            .store_mut()
            .set_key_entry("k1", KeyMaterial::generate(KeyAlgorithm::Rsa), &Password::new("A"), chain())
            .unwrap();

        let copied = source.propagate_new_passwords(&mut target).unwrap();

        assert_eq!(copied, 0, "A password unlocking a different key must not be propagated");
        assert!(target.entry_password("k1").is_none());
    }

    #[test]
    fn test_does_not_overwrite_existing_target_password() {
        let source = state_with_entry("k1", KeyMaterial::generate(KeyAlgorithm::Rsa), "A");
        let mut target = source.create_basis_for_next_state("copy").unwrap();
        target.set_entry_password("k1", Password::new("kept"));

        let copied = source.propagate_new_passwords(&mut target).unwrap();

        assert_eq!(copied, 0);
        assert_eq!(target.entry_password("k1").unwrap().expose().unwrap(), "kept");
    }

    #[test]
    fn test_skips_aliases_absent_from_target() {
        let source = state_with_entry("k1", KeyMaterial::generate(KeyAlgorithm::Rsa), "A");
        let mut target = target_without_cache(&source, "k1");
        target.store_mut().delete_entry("k1").unwrap();

        assert_eq!(source.propagate_new_passwords(&mut target).unwrap(), 0);
        assert!(target.entry_password("k1").is_none());
    }

    #[test]
    fn test_dsa_keys_propagate_despite_differing_encodings() {
        let x = vec![0x11, 0x22, 0x33];
        let dsa = |encoding: &[u8]| {
            KeyMaterial::Dsa(DsaPrivateKey::new(
                x.clone(),
                vec![0xE1, 0x01],
                vec![0xA7],
                vec![0x05],
                encoding.to_vec(),
            ))
        };
        let source = state_with_entry("dsa", dsa(b"loaded-by-provider-a"), "A");
        let mut target = target_without_cache(&source, "dsa");
        target
            .store_mut()
            .set_key_entry("dsa", dsa(b"loaded-by-provider-b"), &Password::new("A"), chain())
            .unwrap();

        assert_eq!(source.propagate_new_passwords(&mut target).unwrap(), 1);
        assert!(target.entry_password("dsa").is_some());
    }

    #[test]
    fn test_structural_failure_aborts_without_partial_update() {
        let mut inner = MemoryKeyStore::new(KeyStoreType::Pkcs12);
        for alias in ["a", "b", "c"] {
            inner
                .set_key_entry(alias, KeyMaterial::generate(KeyAlgorithm::Ec), &Password::new(alias), chain())
                .unwrap();
        }
        let (faulty, unreadable) = FaultyKeyStore::new(inner);
        let mut source = StoreState::new(Box::new(faulty), None);
        for alias in ["a", "b", "c"] {
            source.set_entry_password(alias, Password::new(alias));
        }
        let mut target = source.create_basis_for_next_state("copy").unwrap();
        for alias in ["a", "b", "c"] {
            target.remove_entry_password(alias);
        }

        unreadable.set(true);
        let err = source.propagate_new_passwords(&mut target).unwrap_err();

        assert!(matches!(err.source, KeyStoreError::Unreadable(_)));
        assert!(
            target.cached_aliases().is_empty(),
            "A failed propagation must not leave partial cache updates"
        );
    }

    #[test]
    fn test_remove_entry_password_wipes_and_forgets() {
        let mut state = state_with_entry("k1", KeyMaterial::generate(KeyAlgorithm::Rsa), "A");
        state.remove_entry_password("k1");
        assert!(state.entry_password("k1").is_none());
        // Removing an alias without a cached password is a no-op.
        state.remove_entry_password("k1");
    }

    #[test]
    fn test_wipe_passwords_is_idempotent() {
        let mut state = state_with_entry("k1", KeyMaterial::generate(KeyAlgorithm::Rsa), "A");
        state.wipe_passwords();
        state.wipe_passwords();

        assert!(state.password().unwrap().is_wiped());
        assert!(state.entry_password("k1").unwrap().is_wiped());
    }

    #[test]
    fn test_plan_does_not_modify_target() {
        let source = state_with_entry("k1", KeyMaterial::generate(KeyAlgorithm::Rsa), "A");
        let target = target_without_cache(&source, "k1");

        let plan = source.plan_propagation(&target).unwrap();

        assert_eq!(plan.aliases().collect::<Vec<_>>(), vec!["k1"]);
        assert!(target.entry_password("k1").is_none());
    }

    fn state_of(store_type: KeyStoreType, entries: &[(&str, &KeyMaterial, &str)]) -> StoreState {
        let mut store = MemoryKeyStore::new(store_type);
        for (alias, key, password) in entries {
            store
                .set_key_entry(alias, (*key).clone(), &Password::new(*password), chain())
                .unwrap();
        }
        StoreState::new(Box::new(store), None)
    }

    #[test]
    fn test_cached_password_lookup_ignores_case_for_case_insensitive_types() {
        let mut state = state_with_entry("MyKey", KeyMaterial::generate(KeyAlgorithm::Rsa), "A");

        assert_eq!(state.entry_password("mykey").unwrap().expose().unwrap(), "A");
        assert_eq!(state.cached_aliases(), vec!["mykey".to_string()]);

        state.remove_entry_password("MYKEY");
        assert!(
            state.cached_aliases().is_empty(),
            "Removing a differently cased alias must drop the cached password"
        );
    }

    #[test]
    fn test_cached_passwords_stay_distinct_for_case_sensitive_types() {
        let key = KeyMaterial::generate(KeyAlgorithm::Ec);
        let mut state = state_of(KeyStoreType::Bks, &[("a", &key, "lower"), ("A", &key, "upper")]);
        state.set_entry_password("a", Password::new("lower"));
        state.set_entry_password("A", Password::new("upper"));

        assert_eq!(state.entry_password("a").unwrap().expose().unwrap(), "lower");
        assert_eq!(state.entry_password("A").unwrap().expose().unwrap(), "upper");
        assert_eq!(state.cached_aliases().len(), 2);
    }

    #[test]
    fn test_set_store_rekeys_cache_for_new_alias_rules() {
        let key = KeyMaterial::generate(KeyAlgorithm::Rsa);
        let mut state = state_of(KeyStoreType::Bks, &[("MyKey", &key, "A"), ("gone", &key, "G")]);
        state.set_entry_password("MyKey", Password::new("A"));
        state.set_entry_password("gone", Password::new("G"));

        let mut converted = MemoryKeyStore::new(KeyStoreType::Jks);
        converted
            .set_key_entry("MyKey", key.clone(), &Password::new("A"), chain())
            .unwrap();
        state.set_store(Box::new(converted)).unwrap();

        assert_eq!(state.entry_password("mykey").unwrap().expose().unwrap(), "A");
        assert_eq!(
            state.cached_aliases(),
            vec!["mykey".to_string()],
            "Passwords of aliases missing from the new store must be dropped"
        );
    }

    #[test]
    fn test_propagates_across_store_types_with_different_alias_rules() {
        let key = KeyMaterial::generate(KeyAlgorithm::Rsa);
        let mut source = state_of(KeyStoreType::Jks, &[("MyKey", &key, "A")]);
        source.set_entry_password("MyKey", Password::new("A"));
        let mut target = state_of(KeyStoreType::Bks, &[("MyKey", &key, "A")]);

        let copied = source.propagate_new_passwords(&mut target).unwrap();

        assert_eq!(copied, 1);
        assert_eq!(target.entry_password("MyKey").unwrap().expose().unwrap(), "A");
        assert!(target.entry_password("mykey").is_none());
    }
}
