// Keystrata — KeyStore history
//
// Owns every state of one open keystore in an arena, linked into a single
// linear chain. Tracks the initial, current and saved states and moves
// between neighbours on undo/redo, propagating entry passwords as it goes.
//
// Keystores that cannot be copied (hardware tokens, OS certificate stores)
// get an in-place history: the same interface, but every history operation
// is an identity no-op and edits mutate the single state directly.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{HistoryAction, PropagationError, StateId, StoreState};
use crate::crypto::Password;
use crate::keystore::{KeyStore, StoreCopyError};

/// How a history records edits. Chosen once, when the history is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryMode {
    /// Every edit is applied to a copy of the keystore, enabling undo/redo.
    Snapshot,
    /// The keystore cannot be copied; edits apply in place and there is no undo.
    InPlace,
}

/// Undo/redo history of one open keystore.
#[derive(Debug)]
pub struct StoreHistory {
    id: Uuid,
    name: String,
    file: Option<PathBuf>,
    provider: Option<String>,
    mode: HistoryMode,
    states: Vec<StoreState>,
    initial: StateId,
    current: StateId,
    saved: Option<StateId>,
    saved_at: Option<DateTime<Utc>>,
}

impl StoreHistory {
    /// Start the history of a newly created keystore that has never been saved.
    pub fn new(store: Box<dyn KeyStore>, name: impl Into<String>, password: Option<Password>) -> Self {
        let mode = if store.is_duplicable() {
            HistoryMode::Snapshot
        } else {
            HistoryMode::InPlace
        };
        let name = name.into();

        tracing::info!(
            name = %name,
            store_type = %store.store_type(),
            mode = ?mode,
            "KeyStore history created"
        );

        Self {
            id: Uuid::new_v4(),
            name,
            file: None,
            provider: None,
            mode,
            states: vec![StoreState::new(store, password)],
            initial: StateId(0),
            current: StateId(0),
            saved: None,
            saved_at: None,
        }
    }

    /// Start the history of a keystore loaded from `file`. The initial state
    /// is the saved state.
    pub fn open(store: Box<dyn KeyStore>, file: impl Into<PathBuf>, password: Option<Password>) -> Self {
        let file = file.into();
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());

        let mut history = Self::new(store, name, password);
        history.file = Some(file);
        history.saved = Some(history.initial);
        history
    }

    /// Record the non-default cryptographic provider the keystore was loaded with.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    // ─── Identity ────────────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Display name: the file name once the keystore has a backing file.
    pub fn name(&self) -> String {
        match &self.file {
            Some(file) => file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.name.clone()),
            None => self.name.clone(),
        }
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Associate a backing file, e.g. after "save as".
    pub fn set_file(&mut self, file: impl Into<PathBuf>) {
        self.file = Some(file.into());
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn mode(&self) -> HistoryMode {
        self.mode
    }

    // ─── States ──────────────────────────────────────────────────────────────

    pub fn current_state(&self) -> &StoreState {
        &self.states[self.current.0]
    }

    pub fn current_state_mut(&mut self) -> &mut StoreState {
        &mut self.states[self.current.0]
    }

    pub fn current_id(&self) -> StateId {
        self.current
    }

    pub fn initial_id(&self) -> StateId {
        self.initial
    }

    pub fn saved_id(&self) -> Option<StateId> {
        self.saved
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.saved_at
    }

    pub fn state(&self, id: StateId) -> Option<&StoreState> {
        self.states.get(id.0)
    }

    pub fn is_initial_state(&self, id: StateId) -> bool {
        id == self.initial
    }

    /// In-place histories have nothing to undo, so every state counts as saved.
    pub fn is_saved_state(&self, id: StateId) -> bool {
        match self.mode {
            HistoryMode::InPlace => true,
            HistoryMode::Snapshot => self.saved == Some(id),
        }
    }

    /// Does the current state differ from what was last saved?
    pub fn is_dirty(&self) -> bool {
        !self.is_saved_state(self.current) && !self.is_initial_state(self.current)
    }

    /// Mark the current state as written to stable storage.
    pub fn mark_saved(&mut self) {
        self.set_as_saved_state(self.current);
    }

    /// Mark `id` as the state matching stable storage. Returns false, leaving
    /// the saved state unchanged, when `id` is not on the live chain.
    pub fn set_as_saved_state(&mut self, id: StateId) -> bool {
        if !self.chain().any(|(chain_id, _)| chain_id == id) {
            tracing::warn!(history = %self.id, state = %id, "Ignoring save mark for a state outside the chain");
            return false;
        }
        let now = Utc::now();
        self.saved = Some(id);
        self.saved_at = Some(now);
        tracing::info!(history = %self.id, state = %id, saved_at = %now, "KeyStore state marked as saved");
        true
    }

    /// States reachable from the initial state, in history order.
    pub fn chain(&self) -> impl Iterator<Item = (StateId, &StoreState)> + '_ {
        let mut cursor = Some(self.initial);
        std::iter::from_fn(move || {
            let id = cursor?;
            let state = &self.states[id.0];
            cursor = state.next;
            Some((id, state))
        })
    }

    /// Number of states in the chain from the initial state to the tip.
    pub fn len(&self) -> usize {
        self.chain().count()
    }

    /// A history always holds at least its initial state.
    pub fn is_empty(&self) -> bool {
        false
    }

    // ─── Editing ─────────────────────────────────────────────────────────────

    /// Create the basis for the next state. Mutate the returned guard, then
    /// call [`NextState::append`] to make it the current state. Dropping the
    /// guard without appending discards the edit (in-place histories have
    /// already applied it).
    pub fn create_basis_for_next_state<A>(&mut self, action: A) -> Result<NextState<'_>, StoreCopyError>
    where
        A: HistoryAction + 'static,
    {
        let basis = match self.mode {
            HistoryMode::Snapshot => Some(self.current_state().create_basis_for_next_state(action)?),
            HistoryMode::InPlace => {
                tracing::debug!(
                    action = %action.history_description(),
                    "KeyStore cannot be copied; editing current state in place"
                );
                None
            }
        };

        Ok(NextState { history: self, basis })
    }

    /// Link `state` after the current state and make it current. Any redo
    /// branch beyond the current state is abandoned. In-place histories
    /// ignore the call and keep the current state.
    ///
    /// Abandoned states stay in the arena, with their cached passwords, until
    /// the history is dropped; `wipe_all` only reaches states on the live
    /// chain. The arena therefore grows with every abandoned branch.
    pub fn append(&mut self, mut state: StoreState) -> StateId {
        if self.mode == HistoryMode::InPlace {
            return self.current;
        }

        let id = StateId(self.states.len());
        state.previous = Some(self.current);
        state.next = None;

        if let Some(abandoned) = self.states[self.current.0].next.replace(id) {
            tracing::debug!(abandoned = %abandoned, "Redo branch discarded by new edit");
        }

        tracing::info!(
            state = %id,
            action = state.action_description().as_deref().unwrap_or("-"),
            "KeyStore state appended"
        );

        self.states.push(state);
        self.current = id;
        id
    }

    // ─── Navigation ──────────────────────────────────────────────────────────

    pub fn can_undo(&self) -> bool {
        self.current_state().has_previous_state()
    }

    pub fn can_redo(&self) -> bool {
        self.current_state().has_next_state()
    }

    /// Description of the action undone by [`StoreHistory::undo`].
    pub fn undo_description(&self) -> Option<String> {
        if !self.can_undo() {
            return None;
        }
        self.current_state().action_description()
    }

    /// Description of the action redone by [`StoreHistory::redo`].
    pub fn redo_description(&self) -> Option<String> {
        let next = self.current_state().next_state()?;
        self.states[next.0].action_description()
    }

    /// Make the previous state current. Returns false if there is none.
    pub fn undo(&mut self) -> Result<bool, PropagationError> {
        match self.current_state().previous_state() {
            Some(previous) => {
                self.move_to(previous)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Make the next state current. Returns false if there is none.
    pub fn redo(&mut self) -> Result<bool, PropagationError> {
        match self.current_state().next_state() {
            Some(next) => {
                self.move_to(next)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Propagate new entry passwords into `target`, then make it current.
    /// On failure neither the target's cache nor the current state change.
    fn move_to(&mut self, target: StateId) -> Result<(), PropagationError> {
        let source = self.current;
        let plan = self.states[source.0].plan_propagation(&self.states[target.0])?;
        let propagated = plan.apply(&mut self.states[target.0]);

        self.current = target;
        tracing::info!(from = %source, to = %target, propagated, "Current KeyStore state changed");
        Ok(())
    }

    // ─── Teardown ────────────────────────────────────────────────────────────

    /// Wipe every password held by the states of the chain.
    pub fn wipe_all(&mut self) {
        let mut cursor = Some(self.initial);
        while let Some(id) = cursor {
            let state = &mut self.states[id.0];
            state.wipe_passwords();
            cursor = state.next;
        }
    }

    /// Close the history, wiping all cached passwords.
    pub fn close(mut self) {
        self.wipe_all();
        tracing::info!(history = %self.id, name = %self.name(), "KeyStore history closed");
    }
}

/// The basis for the next history state, borrowed from its history.
///
/// Dereferences to the state being edited: a detached copy for snapshot
/// histories, the current state itself for in-place histories.
#[derive(Debug)]
pub struct NextState<'h> {
    history: &'h mut StoreHistory,
    basis: Option<StoreState>,
}

impl NextState<'_> {
    /// The state the edit starts from. For in-place histories this is the
    /// same state as the one being edited.
    pub fn previous_state_mut(&mut self) -> &mut StoreState {
        self.history.current_state_mut()
    }

    /// Link the edited state into the history as the new current state.
    pub fn append(self) -> StateId {
        match self.basis {
            Some(basis) => self.history.append(basis),
            None => self.history.current,
        }
    }
}

impl Deref for NextState<'_> {
    type Target = StoreState;

    fn deref(&self) -> &StoreState {
        match &self.basis {
            Some(basis) => basis,
            None => self.history.current_state(),
        }
    }
}

impl DerefMut for NextState<'_> {
    fn deref_mut(&mut self) -> &mut StoreState {
        match &mut self.basis {
            Some(basis) => basis,
            None => self.history.current_state_mut(),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
