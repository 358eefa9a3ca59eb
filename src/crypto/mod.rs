// Keystrata — Crypto Module
//
// In-memory secret primitives: the wipeable `Password` handle and the
// unlocked `KeyMaterial` compared during password propagation.

mod error;
mod key;
mod password;

pub use error::SecretError;
pub use key::{key_material_matches, DsaPrivateKey, KeyAlgorithm, KeyMaterial};
pub use password::Password;
