// Keystrata — KeyStore types
//
// Catalogue of supported keystore kinds and their capabilities. Only file
// based kinds can be serialized and reloaded, which is what makes them
// copyable for undo/redo snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyStoreType {
    #[serde(rename = "JKS")]
    Jks,
    #[serde(rename = "JCEKS")]
    Jceks,
    #[serde(rename = "PKCS12")]
    Pkcs12,
    #[serde(rename = "BKS")]
    Bks,
    #[serde(rename = "UBER")]
    Uber,
    #[serde(rename = "BCFKS")]
    Bcfks,
    #[serde(rename = "KeychainStore")]
    Keychain,
    #[serde(rename = "Windows-MY")]
    MsCapiPersonal,
    #[serde(rename = "Windows-ROOT")]
    MsCapiRoot,
    #[serde(rename = "PKCS11")]
    Pkcs11,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

const ALL_TYPES: [KeyStoreType; 11] = [
    KeyStoreType::Jks,
    KeyStoreType::Jceks,
    KeyStoreType::Pkcs12,
    KeyStoreType::Bks,
    KeyStoreType::Uber,
    KeyStoreType::Bcfks,
    KeyStoreType::Keychain,
    KeyStoreType::MsCapiPersonal,
    KeyStoreType::MsCapiRoot,
    KeyStoreType::Pkcs11,
    KeyStoreType::Unknown,
];

impl KeyStoreType {
    pub fn all() -> &'static [KeyStoreType] {
        &ALL_TYPES
    }

    /// Provider-level type name.
    pub fn jce(&self) -> &'static str {
        match self {
            KeyStoreType::Jks => "JKS",
            KeyStoreType::Jceks => "JCEKS",
            KeyStoreType::Pkcs12 => "PKCS12",
            KeyStoreType::Bks => "BKS",
            KeyStoreType::Uber => "UBER",
            KeyStoreType::Bcfks => "BCFKS",
            KeyStoreType::Keychain => "KeychainStore",
            KeyStoreType::MsCapiPersonal => "Windows-MY",
            KeyStoreType::MsCapiRoot => "Windows-ROOT",
            KeyStoreType::Pkcs11 => "PKCS11",
            KeyStoreType::Unknown => "UNKNOWN",
        }
    }

    pub fn friendly(&self) -> &'static str {
        match self {
            KeyStoreType::Jks => "JKS",
            KeyStoreType::Jceks => "JCEKS",
            KeyStoreType::Pkcs12 => "PKCS #12",
            KeyStoreType::Bks => "BKS",
            KeyStoreType::Uber => "UBER",
            KeyStoreType::Bcfks => "BCFKS",
            KeyStoreType::Keychain => "Apple Keychain",
            KeyStoreType::MsCapiPersonal => "MS CAPI Personal Certificates",
            KeyStoreType::MsCapiRoot => "MS CAPI Root Certificates",
            KeyStoreType::Pkcs11 => "PKCS #11",
            KeyStoreType::Unknown => "Unknown",
        }
    }

    /// Can stores of this type be written out and loaded back?
    pub fn is_file_based(&self) -> bool {
        matches!(
            self,
            KeyStoreType::Jks
                | KeyStoreType::Jceks
                | KeyStoreType::Pkcs12
                | KeyStoreType::Bks
                | KeyStoreType::Uber
                | KeyStoreType::Bcfks
        )
    }

    /// Are entries individually password protected?
    pub fn has_entry_passwords(&self) -> bool {
        !matches!(
            self,
            KeyStoreType::Pkcs11 | KeyStoreType::MsCapiPersonal | KeyStoreType::MsCapiRoot
        )
    }

    /// Does the type distinguish aliases that differ only in case?
    pub fn is_case_sensitive(&self) -> bool {
        matches!(
            self,
            KeyStoreType::Bks
                | KeyStoreType::Uber
                | KeyStoreType::Bcfks
                | KeyStoreType::MsCapiPersonal
                | KeyStoreType::MsCapiRoot
                | KeyStoreType::Pkcs11
        )
    }

    /// Canonical form of an alias for lookups in a store of this type.
    pub fn normalize_alias(&self, alias: &str) -> String {
        if self.is_case_sensitive() {
            alias.to_string()
        } else {
            alias.to_lowercase()
        }
    }

    /// Resolve a provider-level type name. Unrecognised names map to `Unknown`.
    pub fn resolve_jce(jce: &str) -> KeyStoreType {
        ALL_TYPES
            .iter()
            .copied()
            .find(|t| t.jce() == jce)
            .unwrap_or(KeyStoreType::Unknown)
    }
}

impl fmt::Display for KeyStoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.friendly())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_jce_round_trips_every_type() {
        for t in ALL_TYPES {
            assert_eq!(KeyStoreType::resolve_jce(t.jce()), t);
        }
    }

    #[test]
    fn test_resolve_unknown_name() {
        assert_eq!(KeyStoreType::resolve_jce("NOPE"), KeyStoreType::Unknown);
    }

    #[test]
    fn test_hardware_types_are_not_file_based() {
        assert!(!KeyStoreType::Pkcs11.is_file_based());
        assert!(!KeyStoreType::MsCapiPersonal.is_file_based());
        assert!(!KeyStoreType::Keychain.is_file_based());
        assert!(KeyStoreType::Pkcs12.is_file_based());
        assert!(KeyStoreType::Jks.is_file_based());
    }

    #[test]
    fn test_entry_passwords() {
        assert!(KeyStoreType::Jceks.has_entry_passwords());
        assert!(!KeyStoreType::Pkcs11.has_entry_passwords());
    }

    #[test]
    fn test_alias_normalization_follows_case_sensitivity() {
        assert_eq!(KeyStoreType::Jks.normalize_alias("MyKey"), "mykey");
        assert_eq!(KeyStoreType::Bks.normalize_alias("MyKey"), "MyKey");
    }

    #[test]
    fn test_serde_uses_jce_names() {
        let json = serde_json::to_string(&KeyStoreType::MsCapiRoot).unwrap();
        assert_eq!(json, "\"Windows-ROOT\"");
        let parsed: KeyStoreType = serde_json::from_str("\"PKCS12\"").unwrap();
        assert_eq!(parsed, KeyStoreType::Pkcs12);
    }
}
