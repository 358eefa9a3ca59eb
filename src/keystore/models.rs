// Keystrata — KeyStore entry models
//
// Certificates are carried as opaque DER blobs; chain ordering and trust
// are the business of the certificate utilities, not of this crate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub subject: String,
    pub der: Vec<u8>,
}

impl Certificate {
    pub fn new(subject: impl Into<String>, der: Vec<u8>) -> Self {
        Self {
            subject: subject.into(),
            der,
        }
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.subject, self.der.len())
    }
}

/// Classification of a keystore entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Private key with a certificate chain.
    KeyPair,
    /// Secret key without a certificate chain.
    Key,
    TrustedCertificate,
}

impl EntryKind {
    /// Does accessing an entry of this kind require a password?
    pub fn is_protected(&self) -> bool {
        matches!(self, EntryKind::KeyPair | EntryKind::Key)
    }
}
