//! Room service: join, leave, event processing and fan-out.
//!
//! DESIGN
//! ======
//! A room is created on first join and kept for the process lifetime, so a
//! participant who joins an empty room still receives its history. Every
//! operation locks the room, asks the coordinator what to send, and fans
//! the result out under the same lock. Each connection's channel therefore
//! receives frames in exactly the order the coordinator produced them.
//!
//! ERROR HANDLING
//! ==============
//! Delivery is fire-and-forget via `try_send`. A participant whose channel
//! is full or closed is evicted: its sender is dropped (which ends its
//! connection) and the coordinator processes a disconnect for it. The
//! client's reconnect produces a fresh join and a full `init_state`, so it
//! never renders a history with gaps.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::coordinator::Outbound;
use crate::frame::{ErrorCode, Frame};
use crate::presence::ParticipantId;
use crate::protocol::ClientEvent;
use crate::state::{AppState, Room, RoomHandle};

pub const MAX_ROOM_NAME_LEN: usize = 64;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoomNameError {
    #[error("room name is empty")]
    Empty,
    #[error("room name longer than {MAX_ROOM_NAME_LEN} bytes: {0}")]
    TooLong(usize),
    #[error("room name contains invalid character {0:?}")]
    InvalidChar(char),
}

impl ErrorCode for RoomNameError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "E_ROOM_NAME_EMPTY",
            Self::TooLong(_) => "E_ROOM_NAME_TOO_LONG",
            Self::InvalidChar(_) => "E_ROOM_NAME_INVALID",
        }
    }
}

/// Counts exposed by the diagnostics endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub room: String,
    pub participants: usize,
    pub actions: usize,
    pub undone: usize,
}

/// Room names are 1..=64 ASCII letters, digits, `-` or `_`.
///
/// # Errors
///
/// Returns the first rule the name breaks.
pub fn validate_room_name(name: &str) -> Result<(), RoomNameError> {
    if name.is_empty() {
        return Err(RoomNameError::Empty);
    }
    if name.len() > MAX_ROOM_NAME_LEN {
        return Err(RoomNameError::TooLong(name.len()));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(RoomNameError::InvalidChar(c));
    }
    Ok(())
}

// =============================================================================
// LOOKUP
// =============================================================================

/// Get a room, creating it if this is the first time it is named.
pub async fn get_or_create_room(state: &AppState, name: &str) -> RoomHandle {
    if let Some(room) = state.rooms.read().await.get(name) {
        return room.clone();
    }

    let mut rooms = state.rooms.write().await;
    rooms
        .entry(name.to_string())
        .or_insert_with(|| {
            info!(room = name, "room created");
            Arc::new(Mutex::new(Room::new(name)))
        })
        .clone()
}

/// Snapshot of a room's counts, or `None` if it was never created.
pub async fn room_summary(state: &AppState, name: &str) -> Option<RoomSummary> {
    let handle = state.rooms.read().await.get(name).cloned()?;
    let room = handle.lock().await;
    Some(RoomSummary {
        room: room.name.clone(),
        participants: room.coordinator.participants().count(),
        actions: room.coordinator.log().len(),
        undone: room.coordinator.log().undone_len(),
    })
}

// =============================================================================
// JOIN / EVENT / LEAVE
// =============================================================================

/// Register a participant and send them the current history.
///
/// `tx` should be the only sender for the connection's channel, so that
/// eviction closes it.
pub async fn join_room(
    state: &AppState,
    name: &str,
    participant_id: ParticipantId,
    tx: mpsc::Sender<Frame>,
) -> RoomHandle {
    let handle = get_or_create_room(state, name).await;
    {
        let mut room = handle.lock().await;
        room.clients.insert(participant_id, tx);
        let outbound = room.coordinator.join(participant_id);
        deliver(&mut room, outbound);
        info!(room = name, %participant_id, clients = room.clients.len(), "client joined room");
    }
    handle
}

/// Process one validated event from a participant.
pub async fn handle_event(room: &Mutex<Room>, from: ParticipantId, event: ClientEvent) {
    let mut room = room.lock().await;
    let outbound = room.coordinator.handle(from, event);
    deliver(&mut room, outbound);
}

/// Remove a participant. Safe to call for one that was already evicted.
pub async fn leave_room(room: &Mutex<Room>, participant_id: ParticipantId) {
    let mut room = room.lock().await;
    room.clients.remove(&participant_id);
    let outbound = room.coordinator.disconnect(participant_id);
    deliver(&mut room, outbound);
    info!(room = %room.name, %participant_id, remaining = room.clients.len(), "client left room");
}

// =============================================================================
// FAN-OUT
// =============================================================================

/// Send coordinator output to the addressed clients, evicting any client
/// that cannot take a frame.
pub fn deliver(room: &mut Room, outbound: Vec<Outbound>) {
    let mut queue: VecDeque<Outbound> = outbound.into();

    while let Some(out) = queue.pop_front() {
        let frame = out.event.to_frame();
        let mut lagging = Vec::new();
        if !out.event.is_cursor() {
            debug!(room = %room.name, event = out.event.name(), to = ?out.to, "fan-out");
        }

        for (client_id, tx) in &room.clients {
            if !out.to.includes(*client_id) {
                continue;
            }
            match tx.try_send(frame.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => lagging.push((*client_id, "channel full")),
                Err(TrySendError::Closed(_)) => lagging.push((*client_id, "channel closed")),
            }
        }

        for (client_id, reason) in lagging {
            room.clients.remove(&client_id);
            warn!(room = %room.name, %client_id, reason, event = out.event.name(), "evicting lagging client");
            queue.extend(room.coordinator.disconnect(client_id));
        }
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
