//! Participant registry: who is connected to a room, and where their
//! cursor was last seen.
//!
//! DESIGN
//! ======
//! Purely ephemeral presence bookkeeping. Nothing here is part of the
//! drawing history and nothing here can fail: adding a known id or removing
//! an unknown one is reported through the return value, not an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Connection-scoped participant identity.
pub type ParticipantId = Uuid;

/// Pointer position as fractions of the participant's viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub last_cursor: Option<Cursor>,
}

#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    participants: HashMap<ParticipantId, Participant>,
}

impl ParticipantRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant. Returns `false` if the id was already present.
    pub fn add(&mut self, id: ParticipantId) -> bool {
        if self.participants.contains_key(&id) {
            return false;
        }
        self.participants.insert(id, Participant { id, last_cursor: None });
        true
    }

    pub fn remove(&mut self, id: ParticipantId) -> Option<Participant> {
        self.participants.remove(&id)
    }

    #[must_use]
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants.contains_key(&id)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.participants.len()
    }

    /// Record a cursor position. Returns `false` for unknown ids.
    pub fn set_cursor(&mut self, id: ParticipantId, cursor: Cursor) -> bool {
        let Some(participant) = self.participants.get_mut(&id) else {
            return false;
        };
        participant.last_cursor = Some(cursor);
        true
    }

    /// Forget a cursor position, returning the last one seen.
    pub fn clear_cursor(&mut self, id: ParticipantId) -> Option<Cursor> {
        self.participants.get_mut(&id)?.last_cursor.take()
    }

    /// Known cursors of everyone except `exclude`.
    pub fn cursors_except(&self, exclude: ParticipantId) -> impl Iterator<Item = (ParticipantId, Cursor)> + '_ {
        self.participants
            .values()
            .filter(move |p| p.id != exclude)
            .filter_map(|p| p.last_cursor.map(|c| (p.id, c)))
    }
}

#[cfg(test)]
#[path = "presence_test.rs"]
mod tests;
