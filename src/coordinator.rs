//! Sync coordinator: the single authority for one shared canvas.
//!
//! DESIGN
//! ======
//! The coordinator owns the room's `ActionLog` and `ParticipantRegistry`
//! and processes one event at a time. Every operation returns the list of
//! addressed outbound events; the caller owns delivery. Nothing here does
//! I/O, so the whole protocol is testable without a transport.
//!
//! DELTA VS. FULL RESYNC
//! =====================
//! - `draw` only grows history, so peers get the single new action.
//! - `undo` / `redo` change the shape of history. Everyone, sender
//!   included, gets the full snapshot as `sync_state`. A client can never
//!   apply an undo for a stroke it has not seen yet.
//! - `clear` has nothing to resend, so it is a bare signal.
//!
//! The cost is one full snapshot per structural change. That is the
//! scalability ceiling of this protocol.

use tracing::{debug, info};

use crate::action::{Action, ActionIds};
use crate::action_log::ActionLog;
use crate::presence::{ParticipantId, ParticipantRegistry};
use crate::protocol::{ClientEvent, ServerEvent};

// =============================================================================
// OUTBOUND
// =============================================================================

/// Who receives an outbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipients {
    Only(ParticipantId),
    All,
    AllExcept(ParticipantId),
}

impl Recipients {
    #[must_use]
    pub fn includes(self, id: ParticipantId) -> bool {
        match self {
            Self::Only(target) => target == id,
            Self::All => true,
            Self::AllExcept(excluded) => excluded != id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: Recipients,
    pub event: ServerEvent,
}

impl Outbound {
    fn only(id: ParticipantId, event: ServerEvent) -> Self {
        Self { to: Recipients::Only(id), event }
    }

    fn all(event: ServerEvent) -> Self {
        Self { to: Recipients::All, event }
    }

    fn all_except(id: ParticipantId, event: ServerEvent) -> Self {
        Self { to: Recipients::AllExcept(id), event }
    }
}

// =============================================================================
// COORDINATOR
// =============================================================================

pub struct SyncCoordinator {
    log: ActionLog,
    participants: ParticipantRegistry,
    ids: ActionIds,
}

impl SyncCoordinator {
    /// Take ownership of `log`. Nothing else may mutate it afterwards.
    /// New ids continue after the largest id already in the log.
    #[must_use]
    pub fn new(log: ActionLog) -> Self {
        let ids = ActionIds::starting_after(log.max_id().unwrap_or(0));
        Self { log, participants: ParticipantRegistry::new(), ids }
    }

    #[must_use]
    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    #[must_use]
    pub fn participants(&self) -> &ParticipantRegistry {
        &self.participants
    }

    /// A new participant connected: full history to them, presence to all,
    /// then the cursors of peers they would otherwise not see until the
    /// peers move.
    pub fn join(&mut self, id: ParticipantId) -> Vec<Outbound> {
        if !self.participants.add(id) {
            debug!(%id, "join for already registered participant");
        }

        let mut out = vec![
            Outbound::only(id, ServerEvent::InitState(self.log.snapshot())),
            Outbound::all(ServerEvent::PresenceCount(self.participants.count())),
        ];
        out.extend(
            self.participants
                .cursors_except(id)
                .map(|(author_id, cursor)| Outbound::only(id, ServerEvent::Cursor { author_id, cursor })),
        );

        info!(%id, participants = self.participants.count(), actions = self.log.len(), "participant joined");
        out
    }

    /// Apply one validated request from `from`.
    pub fn handle(&mut self, from: ParticipantId, event: ClientEvent) -> Vec<Outbound> {
        if !self.participants.contains(from) {
            debug!(%from, event = event.name(), "event from unregistered participant ignored");
            return Vec::new();
        }

        match event {
            ClientEvent::Draw(stroke) => {
                let action = Action::draw(self.ids.next_id(), from, stroke);
                let action = self.log.append(action).clone();
                vec![Outbound::all_except(from, ServerEvent::Draw(action))]
            }
            ClientEvent::Undo => {
                if self.log.undo().is_none() {
                    return Vec::new();
                }
                debug!(%from, remaining = self.log.len(), "undo");
                vec![self.resync()]
            }
            ClientEvent::Redo => {
                if self.log.redo().is_none() {
                    return Vec::new();
                }
                debug!(%from, actions = self.log.len(), "redo");
                vec![self.resync()]
            }
            ClientEvent::Clear => {
                self.log.clear();
                info!(%from, "canvas cleared");
                vec![Outbound::all(ServerEvent::Clear)]
            }
            ClientEvent::Cursor(cursor) => {
                self.participants.set_cursor(from, cursor);
                vec![Outbound::all_except(from, ServerEvent::Cursor { author_id: from, cursor })]
            }
        }
    }

    /// A participant went away. Unknown ids produce nothing, so a second
    /// disconnect for the same connection is harmless.
    pub fn disconnect(&mut self, id: ParticipantId) -> Vec<Outbound> {
        if self.participants.clear_cursor(id).is_some() {
            debug!(%id, "dropping visible cursor");
        }
        if self.participants.remove(id).is_none() {
            return Vec::new();
        }

        info!(%id, participants = self.participants.count(), "participant left");
        vec![
            Outbound::all(ServerEvent::CursorDisconnect { author_id: id }),
            Outbound::all(ServerEvent::PresenceCount(self.participants.count())),
        ]
    }

    /// Rewrite history with `compactor` and resync everyone if it changed.
    pub fn compact<F>(&mut self, compactor: F) -> Vec<Outbound>
    where
        F: FnOnce(Vec<Action>) -> Vec<Action>,
    {
        let before = self.log.len();
        if !self.log.compact(compactor) {
            return Vec::new();
        }
        if let Some(max) = self.log.max_id() {
            self.ids.observe(max);
        }
        info!(before, after = self.log.len(), "history compacted");
        vec![self.resync()]
    }

    fn resync(&self) -> Outbound {
        Outbound::all(ServerEvent::SyncState(self.log.snapshot()))
    }
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;
