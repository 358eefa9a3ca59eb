// Keystrata — Secret error types

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretError {
    #[error("Password was read after it had been wiped")]
    Wiped,
}
