// Keystrata — Password handle
//
// SECURITY: the wrapped characters are never included in Debug output or
// log messages. A password can be duplicated explicitly and wiped
// explicitly; once wiped it refuses to be read.

use std::fmt;

use zeroize::{Zeroize, Zeroizing};

use super::SecretError;

/// A decrypted password held in memory.
///
/// Not `Clone`: copies are made with [`Password::duplicate`] and each
/// holder wipes its own buffer.
pub struct Password {
    value: Zeroizing<String>,
    wiped: bool,
}

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Zeroizing::new(value.into()),
            wiped: false,
        }
    }

    /// Access the raw password characters.
    /// Fails with [`SecretError::Wiped`] once [`Password::wipe`] has run.
    pub fn expose(&self) -> Result<&str, SecretError> {
        if self.wiped {
            return Err(SecretError::Wiped);
        }
        Ok(self.value.as_str())
    }

    /// Create an independent copy with its own buffer.
    /// Duplicating a wiped password yields another wiped password.
    pub fn duplicate(&self) -> Self {
        if self.wiped {
            return Self {
                value: Zeroizing::new(String::new()),
                wiped: true,
            };
        }
        Self::new(self.value.as_str())
    }

    /// Zero the backing memory. Calling this more than once is harmless.
    pub fn wipe(&mut self) {
        self.value.zeroize();
        self.wiped = true;
    }

    pub fn is_wiped(&self) -> bool {
        self.wiped
    }

    /// Is the password the empty string? Wiped passwords report `false`.
    pub fn is_empty(&self) -> bool {
        !self.wiped && self.value.is_empty()
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Custom Debug implementation that NEVER reveals the password.
impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Password")
            .field("value", &"[REDACTED]")
            .field("wiped", &self.wiped)
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
