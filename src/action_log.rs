//! Action log: ordered history plus the redo stack.
//!
//! DESIGN
//! ======
//! `history` is what every client renders. `undone` holds actions popped
//! by undo, most recent last. An action lives in exactly one of the two.
//! Appending new work drops `undone`: history never branches.
//!
//! Pure data and mutation rules. The coordinator owns the only instance
//! for a room and decides what to broadcast after each mutation.

use crate::action::{Action, ActionId};

#[derive(Debug, Default)]
pub struct ActionLog {
    history: Vec<Action>,
    undone: Vec<Action>,
}

impl ActionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an accepted action. Invalidates any pending redo state.
    pub fn append(&mut self, action: Action) -> &Action {
        self.undone.clear();
        self.history.push(action);
        &self.history[self.history.len() - 1]
    }

    /// Move the newest action onto the redo stack.
    pub fn undo(&mut self) -> Option<&Action> {
        let action = self.history.pop()?;
        self.undone.push(action);
        self.undone.last()
    }

    /// Move the most recently undone action back onto history.
    pub fn redo(&mut self) -> Option<&Action> {
        let action = self.undone.pop()?;
        self.history.push(action);
        self.history.last()
    }

    /// Drop everything. Not reversible.
    pub fn clear(&mut self) {
        self.history.clear();
        self.undone.clear();
    }

    /// Copy of the current history, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Action> {
        self.history.clone()
    }

    /// Replace history with the output of `compactor`.
    ///
    /// Returns whether history changed, in ids or in content. On change the
    /// redo stack is dropped, since its actions may no longer line up with
    /// the rewritten history. An unchanged history keeps pending redos.
    pub fn compact<F>(&mut self, compactor: F) -> bool
    where
        F: FnOnce(Vec<Action>) -> Vec<Action>,
    {
        let compacted = compactor(self.history.clone());
        if compacted == self.history {
            return false;
        }
        self.history = compacted;
        self.undone.clear();
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    #[must_use]
    pub fn undone_len(&self) -> usize {
        self.undone.len()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    /// Largest id held in either stack.
    #[must_use]
    pub fn max_id(&self) -> Option<ActionId> {
        self.history.iter().chain(&self.undone).map(|a| a.id).max()
    }

    /// Redo stack contents, oldest first.
    #[must_use]
    pub fn undone(&self) -> &[Action] {
        &self.undone
    }
}

#[cfg(test)]
#[path = "action_log_test.rs"]
mod tests;
