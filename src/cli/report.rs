// Keystrata — History reports
//
// A printable view of a history: one line per state with its action,
// entries and the aliases whose passwords are cached. Password values are
// never part of a report.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::history::{HistoryMode, StateId, StoreHistory, StoreState};
use crate::keystore::{KeyStoreError, KeyStoreType};

#[derive(Debug, Clone, Serialize)]
pub struct StateReport {
    pub id: StateId,
    pub action: Option<String>,
    pub store_type: KeyStoreType,
    pub entries: Vec<String>,
    pub cached_passwords: Vec<String>,
    pub initial: bool,
    pub current: bool,
    pub saved: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryReport {
    pub id: Uuid,
    pub name: String,
    pub mode: HistoryMode,
    pub dirty: bool,
    pub undo: Option<String>,
    pub redo: Option<String>,
    pub states: Vec<StateReport>,
}

impl HistoryReport {
    pub fn from_history(history: &StoreHistory) -> Result<Self, KeyStoreError> {
        let states = history
            .chain()
            .map(|(id, state)| state_report(history, id, state))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: history.id(),
            name: history.name(),
            mode: history.mode(),
            dirty: history.is_dirty(),
            undo: history.undo_description(),
            redo: history.redo_description(),
            states,
        })
    }
}

fn state_report(history: &StoreHistory, id: StateId, state: &StoreState) -> Result<StateReport, KeyStoreError> {
    Ok(StateReport {
        id,
        action: state.action_description(),
        store_type: state.store_type(),
        entries: state.store().aliases()?,
        cached_passwords: state.cached_aliases(),
        initial: history.is_initial_state(id),
        current: id == history.current_id(),
        saved: history.is_saved_state(id),
    })
}

impl fmt::Display for HistoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "History: {} ({})", self.name, self.id)?;
        writeln!(f, "Mode:    {:?}", self.mode)?;
        writeln!(f, "Dirty:   {}", if self.dirty { "yes" } else { "no" })?;
        writeln!(f, "Undo:    {}", self.undo.as_deref().unwrap_or("-"))?;
        writeln!(f, "Redo:    {}", self.redo.as_deref().unwrap_or("-"))?;
        writeln!(f, "{:-<80}", "")?;
        for state in &self.states {
            let marker = match (state.current, state.saved) {
                (true, true) => "*S",
                (true, false) => "* ",
                (false, true) => " S",
                (false, false) => "  ",
            };
            writeln!(
                f,
                "{} {:<4} {:<32} {:<10} entries=[{}] cached=[{}]",
                marker,
                state.id.to_string(),
                state.action.as_deref().unwrap_or("(initial)"),
                state.store_type.jce(),
                state.entries.join(", "),
                state.cached_passwords.join(", ")
            )?;
        }
        write!(f, "{:-<80}", "")
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
