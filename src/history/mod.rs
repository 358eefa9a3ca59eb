// Keystrata — History Module
//
// Undo/redo history for keystores. Each edit is applied to an independent
// snapshot of the keystore; snapshots are linked into a linear chain and
// cached entry passwords follow undo/redo only where they remain valid.

mod action;
mod chain;
mod error;
mod state;

pub use action::HistoryAction;
pub use chain::{HistoryMode, NextState, StoreHistory};
pub use error::{HistoryError, PropagationError};
pub use state::{PropagationPlan, StateId, StoreState};
