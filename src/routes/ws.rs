//! WebSocket handler: bidirectional frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a participant ID, joins the requested room and
//! enters a `select!` loop:
//! - Incoming client frames → decode → room service
//! - Frames queued for this participant → forward to client
//!
//! The room holds the only sender for this connection's queue. If the room
//! evicts the participant for lagging, the queue closes and the loop ends,
//! which closes the socket. The client reconnects and is resynced by a
//! fresh join.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `connected` with `participantId`
//! 2. Join room → `init_state` + `presence_count` arrive via the queue
//! 3. Client sends frames → decode → coordinator → fan-out
//! 4. Close or eviction → leave room → cleanup

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::frame::{ErrorCode, Frame};
use crate::presence::ParticipantId;
use crate::protocol::{self, ClientEvent, EV_CURSOR, ServerEvent};
use crate::services;
use crate::state::{AppState, Room};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub room: Option<String>,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, Query(params): Query<WsParams>, ws: WebSocketUpgrade) -> Response {
    let room = params
        .room
        .unwrap_or_else(|| state.config.default_room.clone());

    if let Err(e) = services::room::validate_room_name(&room) {
        warn!(error = %e, code = e.error_code(), "ws: rejected room name");
        return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
    }

    ws.on_upgrade(move |socket| run_ws(socket, state, room))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, room_name: String) {
    let participant_id = Uuid::new_v4();

    // Per-connection queue. The room owns the sender.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.config.client_channel_capacity);

    let welcome = ServerEvent::Connected { participant_id, room: room_name.clone() }.to_frame();
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    let room = services::room::join_room(&state, &room_name, participant_id, client_tx).await;
    info!(%participant_id, room = %room_name, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => process_inbound_text(&room, participant_id, text.as_str()).await,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            frame = client_rx.recv() => {
                let Some(frame) = frame else {
                    info!(%participant_id, "ws: evicted by room, closing");
                    if let Err(e) = socket.send(Message::Close(None)).await {
                        debug!(%participant_id, error = %e, "ws: close after eviction failed");
                    }
                    break;
                };
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    services::room::leave_room(&room, participant_id).await;
    info!(%participant_id, room = %room_name, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Decode one inbound text frame and hand it to the room. Malformed input
/// is logged and dropped; the connection stays open and peers see nothing.
async fn process_inbound_text(room: &Mutex<Room>, participant_id: ParticipantId, text: &str) {
    let event = match protocol::decode_text(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(%participant_id, error = %e, code = e.error_code(), "ws: dropped inbound frame");
            return;
        }
    };

    log_inbound(participant_id, &event);
    services::room::handle_event(room, participant_id, event).await;
}

fn log_inbound(participant_id: ParticipantId, event: &ClientEvent) {
    if event.name() == EV_CURSOR {
        trace!(%participant_id, "ws: recv cursor");
    } else {
        debug!(%participant_id, event = event.name(), "ws: recv frame");
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if frame.event == EV_CURSOR {
        trace!(id = %frame.id, "ws: send cursor");
    } else {
        debug!(id = %frame.id, event = %frame.event, "ws: send frame");
    }
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
