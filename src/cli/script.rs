// Keystrata — Replay scripts
//
// A replay script describes a keystore and a sequence of edits and
// navigation steps. Scripts are JSON; unit steps are plain strings
// ("undo", "redo", "save") and edits are single-key objects.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::crypto::KeyAlgorithm;
use crate::keystore::KeyStoreType;
use crate::KeystrataError;

fn default_name() -> String {
    "Untitled-1".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Script {
    #[serde(default = "default_name")]
    pub name: String,
    pub store_type: KeyStoreType,
    /// Keystore password.
    #[serde(default)]
    pub password: Option<String>,
    /// Treat the keystore as loaded from this file (the initial state is saved).
    #[serde(default)]
    pub file: Option<PathBuf>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Generate a key pair (or a secret key when `subject` is absent).
    Generate {
        alias: String,
        algorithm: KeyAlgorithm,
        password: String,
        #[serde(default)]
        subject: Option<String>,
    },
    ImportCertificate {
        alias: String,
        subject: String,
    },
    Delete {
        alias: String,
    },
    Rename {
        from: String,
        to: String,
        #[serde(default)]
        password: Option<String>,
    },
    SetEntryPassword {
        alias: String,
        #[serde(default)]
        old: Option<String>,
        new: String,
    },
    SetStorePassword {
        password: String,
    },
    ChangeType {
        store_type: KeyStoreType,
    },
    /// Drop the cached password of an entry in the current state.
    Forget {
        alias: String,
    },
    Undo,
    Redo,
    Save,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self, KeystrataError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
