// Keystrata — Unlocked key material
//
// The private key recovered from a keystore entry. Two values are compared
// when deciding whether a cached password may follow an entry across
// history states: the password must unlock the *same* key on both sides.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Byte length of generated key material.
const GENERATED_KEY_LEN: usize = 32;

/// Byte length of generated DSA parameters (toy sizes, not for real use).
const GENERATED_DSA_PARAM_LEN: usize = 64;
const GENERATED_DSA_SUBGROUP_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    Rsa,
    Dsa,
    Ec,
    Ed25519,
    Aes,
    Hmac,
}

impl KeyAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            KeyAlgorithm::Rsa => "RSA",
            KeyAlgorithm::Dsa => "DSA",
            KeyAlgorithm::Ec => "EC",
            KeyAlgorithm::Ed25519 => "Ed25519",
            KeyAlgorithm::Aes => "AES",
            KeyAlgorithm::Hmac => "HMAC",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A DSA private key.
///
/// No `PartialEq`: the provider encoding differs between loads of the same
/// key. Identity is the private exponent `x` with the domain parameters
/// `p`, `q` and `g`; see [`DsaPrivateKey::same_key`].
#[derive(Clone)]
pub struct DsaPrivateKey {
    x: Zeroizing<Vec<u8>>,
    p: Vec<u8>,
    q: Vec<u8>,
    g: Vec<u8>,
    provider_encoding: Vec<u8>,
}

impl DsaPrivateKey {
    /// Integers are big-endian and may carry leading zero bytes.
    pub fn new(x: Vec<u8>, p: Vec<u8>, q: Vec<u8>, g: Vec<u8>, provider_encoding: Vec<u8>) -> Self {
        Self {
            x: Zeroizing::new(x),
            p,
            q,
            g,
            provider_encoding,
        }
    }

    pub fn x(&self) -> &[u8] {
        &self.x
    }

    pub fn p(&self) -> &[u8] {
        &self.p
    }

    pub fn q(&self) -> &[u8] {
        &self.q
    }

    pub fn g(&self) -> &[u8] {
        &self.g
    }

    pub fn provider_encoding(&self) -> &[u8] {
        &self.provider_encoding
    }

    /// Field-by-field comparison of the private exponent and domain parameters.
    pub fn same_key(&self, other: &DsaPrivateKey) -> bool {
        same_integer(&self.x, &other.x)
            && same_integer(&self.g, &other.g)
            && same_integer(&self.p, &other.p)
            && same_integer(&self.q, &other.q)
    }
}

impl fmt::Debug for DsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DsaPrivateKey")
            .field("x", &"[REDACTED]")
            .field("p_len", &self.p.len())
            .finish_non_exhaustive()
    }
}

/// Private key recovered from a keystore entry.
#[derive(Clone)]
pub enum KeyMaterial {
    /// Keys with a canonical encoding: equal keys have equal bytes.
    Encoded {
        algorithm: KeyAlgorithm,
        der: Zeroizing<Vec<u8>>,
    },
    Dsa(DsaPrivateKey),
}

impl KeyMaterial {
    pub fn encoded(algorithm: KeyAlgorithm, der: Vec<u8>) -> Self {
        KeyMaterial::Encoded {
            algorithm,
            der: Zeroizing::new(der),
        }
    }

    /// Generate fresh random key material for the given algorithm.
    pub fn generate(algorithm: KeyAlgorithm) -> Self {
        match algorithm {
            KeyAlgorithm::Dsa => {
                let x = random_bytes(GENERATED_DSA_SUBGROUP_LEN);
                let p = random_bytes(GENERATED_DSA_PARAM_LEN);
                let q = random_bytes(GENERATED_DSA_SUBGROUP_LEN);
                let g = random_bytes(GENERATED_DSA_PARAM_LEN);
                KeyMaterial::Dsa(DsaPrivateKey::new(x, p, q, g, random_bytes(8)))
            }
            other => KeyMaterial::encoded(other, random_bytes(GENERATED_KEY_LEN)),
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            KeyMaterial::Encoded { algorithm, .. } => *algorithm,
            KeyMaterial::Dsa(_) => KeyAlgorithm::Dsa,
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMaterial::Encoded { algorithm, .. } => f
                .debug_struct("KeyMaterial")
                .field("algorithm", algorithm)
                .field("der", &"[REDACTED]")
                .finish(),
            KeyMaterial::Dsa(key) => f.debug_tuple("KeyMaterial::Dsa").field(key).finish(),
        }
    }
}

/// Do two unlocked keys represent the same private key?
///
/// DSA keys have no usable equality, so they are compared on `x`, `p`, `q`
/// and `g`. Every other key type compares structurally.
pub fn key_material_matches(current: &KeyMaterial, target: &KeyMaterial) -> bool {
    match (current, target) {
        (KeyMaterial::Dsa(a), KeyMaterial::Dsa(b)) => a.same_key(b),
        (KeyMaterial::Dsa(_), _) | (_, KeyMaterial::Dsa(_)) => false,
        (
            KeyMaterial::Encoded {
                algorithm: alg_a,
                der: der_a,
            },
            KeyMaterial::Encoded {
                algorithm: alg_b,
                der: der_b,
            },
        ) => alg_a == alg_b && der_a == der_b,
    }
}

/// Compare two big-endian unsigned integers, ignoring leading zero bytes.
fn same_integer(a: &[u8], b: &[u8]) -> bool {
    strip_leading_zeros(a) == strip_leading_zeros(b)
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

// ─── Tests ───────────────────────────────────────────────────────────────────
