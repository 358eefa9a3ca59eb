// Keystrata — History actions

use std::fmt;

/// An action that produces a new history state. Its description labels the
/// corresponding undo/redo step.
pub trait HistoryAction: fmt::Debug {
    fn history_description(&self) -> String;
}

impl HistoryAction for &'static str {
    fn history_description(&self) -> String {
        (*self).to_string()
    }
}

impl HistoryAction for String {
    fn history_description(&self) -> String {
        self.clone()
    }
}
