//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the server config and a map of live rooms. Each room has its own
//! coordinator (and therefore its own action log) plus the outbound channels
//! of its connected participants.
//!
//! Rooms sit behind their own mutex so that one room's traffic is processed
//! strictly one event at a time while other rooms proceed in parallel. The
//! outer map lock is only held long enough to look a room up or create it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, mpsc};

use crate::action_log::ActionLog;
use crate::config::ServerConfig;
use crate::coordinator::SyncCoordinator;
use crate::frame::Frame;
use crate::presence::ParticipantId;

// =============================================================================
// ROOM
// =============================================================================

/// Per-room live state. Lives for the process lifetime once created.
pub struct Room {
    pub name: String,
    pub coordinator: SyncCoordinator,
    /// Connected participants: `participant_id` -> sender for outgoing frames.
    pub clients: HashMap<ParticipantId, mpsc::Sender<Frame>>,
}

impl Room {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), coordinator: SyncCoordinator::new(ActionLog::new()), clients: HashMap::new() }
    }
}

/// Shared handle to one room.
pub type RoomHandle = Arc<Mutex<Room>>;

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum: all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub rooms: Arc<RwLock<HashMap<String, RoomHandle>>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self { config: Arc::new(config), rooms: Arc::new(RwLock::new(HashMap::new())) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
