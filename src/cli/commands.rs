// Keystrata — CLI Command Handlers
//
// Each function handles one CLI subcommand. `replay` drives a keystore
// history through the edits and navigation steps of a script; a failing
// step is reported and the replay carries on with the next one.

use std::path::Path;

use crate::crypto::{KeyMaterial, Password};
use crate::edits;
use crate::error::KeystrataError;
use crate::history::StoreHistory;
use crate::keystore::{Certificate, KeyStoreType, MemoryKeyStore};

use super::report::HistoryReport;
use super::script::{Script, Step};
use super::Commands;

/// Execute the parsed CLI command.
pub fn execute(command: Commands) -> Result<(), KeystrataError> {
    match command {
        Commands::Replay { script, json } => cmd_replay(&script, json),
        Commands::Types => cmd_types(),
    }
}

// ─── Replay ──────────────────────────────────────────────────────────────────

fn cmd_replay(path: &Path, json: bool) -> Result<(), KeystrataError> {
    let script = Script::load(path)?;
    let (history, outcomes) = replay(script);

    for (index, outcome) in outcomes.iter().enumerate() {
        match outcome {
            Ok(message) => println!("✓ [{}] {}", index + 1, message),
            Err(e) => println!("✗ [{}] {}", index + 1, e),
        }
    }
    println!();

    let report = HistoryReport::from_history(&history)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    history.close();
    Ok(())
}

/// Build the history a script describes and run every step against it.
/// Returns the history and one outcome per step.
pub(crate) fn replay(script: Script) -> (StoreHistory, Vec<Result<String, KeystrataError>>) {
    let store = Box::new(MemoryKeyStore::new(script.store_type));
    let password = script.password.map(Password::from);

    let mut history = match script.file {
        Some(file) => StoreHistory::open(store, file, password),
        None => StoreHistory::new(store, script.name, password),
    };

    let outcomes = script
        .steps
        .into_iter()
        .map(|step| {
            let outcome = apply_step(&mut history, step);
            if let Err(e) = &outcome {
                tracing::warn!(error = %e, "Replay step failed");
            }
            outcome
        })
        .collect();

    (history, outcomes)
}

fn apply_step(history: &mut StoreHistory, step: Step) -> Result<String, KeystrataError> {
    match step {
        Step::Generate {
            alias,
            algorithm,
            password,
            subject,
        } => {
            let chain = subject
                .map(|s| {
                    let der = s.as_bytes().to_vec();
                    vec![Certificate::new(s, der)]
                })
                .unwrap_or_default();
            let id = edits::add_key_pair(
                history,
                &alias,
                KeyMaterial::generate(algorithm),
                Password::from(password),
                chain,
            )?;
            Ok(format!("Generated {} key '{}' ({})", algorithm, alias, id))
        }
        Step::ImportCertificate { alias, subject } => {
            let der = subject.as_bytes().to_vec();
            let id = edits::add_trusted_certificate(history, &alias, Certificate::new(subject, der))?;
            Ok(format!("Imported trusted certificate '{}' ({})", alias, id))
        }
        Step::Delete { alias } => {
            let id = edits::delete_entry(history, &alias)?;
            Ok(format!("Deleted '{}' ({})", alias, id))
        }
        Step::Rename { from, to, password } => {
            let id = edits::rename_entry(history, &from, &to, password.map(Password::from))?;
            Ok(format!("Renamed '{}' to '{}' ({})", from, to, id))
        }
        Step::SetEntryPassword { alias, old, new } => {
            let id = edits::set_entry_password(history, &alias, old.map(Password::from), Password::from(new))?;
            Ok(format!("Changed password of '{}' ({})", alias, id))
        }
        Step::SetStorePassword { password } => {
            let id = edits::set_store_password(history, Password::from(password))?;
            Ok(format!("Changed KeyStore password ({})", id))
        }
        Step::ChangeType { store_type } => {
            let id = edits::change_store_type(history, store_type)?;
            Ok(format!("KeyStore is now {} ({})", store_type, id))
        }
        Step::Forget { alias } => {
            history.current_state_mut().remove_entry_password(&alias);
            Ok(format!("Forgot cached password of '{}'", alias))
        }
        Step::Undo => {
            let description = history.undo_description();
            if history.undo()? {
                Ok(format!("Undo {}", description.as_deref().unwrap_or("-")))
            } else {
                Ok("Nothing to undo".to_string())
            }
        }
        Step::Redo => {
            let description = history.redo_description();
            if history.redo()? {
                Ok(format!("Redo {}", description.as_deref().unwrap_or("-")))
            } else {
                Ok("Nothing to redo".to_string())
            }
        }
        Step::Save => {
            history.mark_saved();
            Ok(format!("Saved ({})", history.current_id()))
        }
    }
}

// ─── Types ───────────────────────────────────────────────────────────────────

fn cmd_types() -> Result<(), KeystrataError> {
    println!(
        "{:<14} {:<32} {:<10} {:<16} {:<14}",
        "TYPE", "NAME", "UNDOABLE", "ENTRY PASSWORDS", "CASE SENSITIVE"
    );
    println!("{:-<90}", "");

    for store_type in KeyStoreType::all() {
        println!(
            "{:<14} {:<32} {:<10} {:<16} {:<14}",
            store_type.jce(),
            store_type.friendly(),
            yes_no(store_type.is_file_based()),
            yes_no(store_type.has_entry_passwords()),
            yes_no(store_type.is_case_sensitive()),
        );
    }

    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
