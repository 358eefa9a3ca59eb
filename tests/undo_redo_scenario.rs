// Keystrata — End-to-end undo/redo scenarios against the public API.

use keystrata::crypto::{DsaPrivateKey, KeyAlgorithm, KeyMaterial, Password};
use keystrata::edits;
use keystrata::history::{HistoryMode, StoreHistory};
use keystrata::keystore::{Certificate, KeyStore, KeyStoreType, MemoryKeyStore};

fn chain(subject: &str) -> Vec<Certificate> {
    vec![Certificate::new(subject, subject.as_bytes().to_vec())]
}

fn dsa_key(encoding: u8) -> KeyMaterial {
    KeyMaterial::Dsa(DsaPrivateKey::new(
        vec![0x11, 0x22],
        vec![0x7f, 0x01],
        vec![0x3b],
        vec![0x05],
        vec![encoding],
    ))
}

#[test]
fn delete_and_add_then_undo_and_redo() {
    let mut store = MemoryKeyStore::new(KeyStoreType::Pkcs12);
    store
        .set_key_entry("k1", KeyMaterial::generate(KeyAlgorithm::Rsa), &Password::new("A"), chain("CN=k1"))
        .unwrap();
    let mut history = StoreHistory::new(Box::new(store), "Untitled-1", Some(Password::new("storepass")));
    history.current_state_mut().set_entry_password("k1", Password::new("A"));

    // One state holding two changes.
    let mut next = history.create_basis_for_next_state("Replace k1 with k2").unwrap();
    next.store_mut().delete_entry("k1").unwrap();
    next.remove_entry_password("k1");
    next.store_mut()
        .set_key_entry("k2", KeyMaterial::generate(KeyAlgorithm::Ec), &Password::new("B"), chain("CN=k2"))
        .unwrap();
    next.set_entry_password("k2", Password::new("B"));
    next.append();

    assert!(history.undo().unwrap());
    let state = history.current_state();
    assert!(state.store().contains_alias("k1").unwrap());
    assert!(!state.store().contains_alias("k2").unwrap());
    assert_eq!(state.entry_password("k1").unwrap().expose().unwrap(), "A");
    assert!(state.entry_password("k2").is_none());

    assert!(history.redo().unwrap());
    let state = history.current_state();
    assert!(!state.store().contains_alias("k1").unwrap());
    assert_eq!(state.entry_password("k2").unwrap().expose().unwrap(), "B");
    assert!(state.entry_password("k1").is_none());
}

#[test]
fn password_supplied_late_follows_undo() {
    let mut store = MemoryKeyStore::new(KeyStoreType::Jceks);
    store
        .set_key_entry("k1", KeyMaterial::generate(KeyAlgorithm::Rsa), &Password::new("A"), chain("CN=k1"))
        .unwrap();
    let mut history = StoreHistory::open(Box::new(store), "/var/keys/app.jceks", Some(Password::new("storepass")));

    edits::add_trusted_certificate(&mut history, "ca", Certificate::new("CN=ca", vec![1])).unwrap();
    history.current_state_mut().set_entry_password("k1", Password::new("A"));

    history.undo().unwrap();

    assert_eq!(
        history.current_state().entry_password("k1").unwrap().expose().unwrap(),
        "A"
    );
    assert!(!history.is_dirty());
}

#[test]
fn password_does_not_follow_a_different_key() {
    let mut store = MemoryKeyStore::new(KeyStoreType::Jks);
    store
        .set_key_entry("k1", KeyMaterial::generate(KeyAlgorithm::Rsa), &Password::new("A"), vec![])
        .unwrap();
    let mut history = StoreHistory::new(Box::new(store), "Untitled-1", None);

    let mut next = history.create_basis_for_next_state("Regenerate k1").unwrap();
    next.store_mut().delete_entry("k1").unwrap();
    next.store_mut()
        .set_key_entry("k1", KeyMaterial::generate(KeyAlgorithm::Rsa), &Password::new("A"), vec![])
        .unwrap();
    next.set_entry_password("k1", Password::new("A"));
    next.append();

    history.undo().unwrap();

    assert!(history.current_state().entry_password("k1").is_none());
}

#[test]
fn dsa_password_follows_same_key() {
    let mut store = MemoryKeyStore::new(KeyStoreType::Bks);
    store
        .set_key_entry("dsa", dsa_key(0xA0), &Password::new("D"), chain("CN=dsa"))
        .unwrap();
    let mut history = StoreHistory::new(Box::new(store), "Untitled-1", None);

    edits::set_store_password(&mut history, Password::new("storepass")).unwrap();
    history.current_state_mut().set_entry_password("dsa", Password::new("D"));

    history.undo().unwrap();

    assert_eq!(
        history.current_state().entry_password("dsa").unwrap().expose().unwrap(),
        "D"
    );
}

#[test]
fn non_copyable_store_never_grows() {
    let store = MemoryKeyStore::new(KeyStoreType::Pkcs11);
    let mut history = StoreHistory::new(Box::new(store), "token", None);
    assert_eq!(history.mode(), HistoryMode::InPlace);

    edits::add_key_pair(&mut history, "k1", KeyMaterial::generate(KeyAlgorithm::Ec), Password::new(""), chain("CN=k1"))
        .unwrap();
    edits::add_trusted_certificate(&mut history, "ca", Certificate::new("CN=ca", vec![2])).unwrap();

    assert_eq!(history.len(), 1);
    assert!(!history.can_undo());
    assert!(!history.undo().unwrap());
    assert!(!history.redo().unwrap());
    assert!(!history.is_dirty());

    let store = history.current_state().store();
    assert!(store.contains_alias("k1").unwrap());
    assert!(store.contains_alias("ca").unwrap());
}

#[test]
fn new_edit_after_undo_discards_redo() {
    let mut history = StoreHistory::new(Box::new(MemoryKeyStore::new(KeyStoreType::Pkcs12)), "Untitled-1", None);

    edits::add_trusted_certificate(&mut history, "a", Certificate::new("CN=a", vec![1])).unwrap();
    edits::add_trusted_certificate(&mut history, "b", Certificate::new("CN=b", vec![2])).unwrap();
    history.undo().unwrap();
    edits::add_trusted_certificate(&mut history, "c", Certificate::new("CN=c", vec![3])).unwrap();

    assert!(!history.can_redo());
    assert_eq!(history.len(), 3);
    let store = history.current_state().store();
    assert!(store.contains_alias("c").unwrap());
    assert!(!store.contains_alias("b").unwrap());

    history.close();
}
