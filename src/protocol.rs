//! Protocol: typed inbound and outbound events.
//!
//! DESIGN
//! ======
//! `ClientEvent::try_from(Frame)` is the only place raw payloads are
//! inspected. Anything that gets past it is well-typed and in range, so the
//! coordinator never re-checks input. `ServerEvent` is what the coordinator
//! emits; it is turned into a `Frame` once per broadcast, not per recipient.

use serde::Deserialize;

use crate::action::{Action, Stroke};
use crate::frame::{Data, ErrorCode, Frame};
use crate::presence::{Cursor, ParticipantId};

// =============================================================================
// EVENT NAMES
// =============================================================================

pub const EV_DRAW: &str = "draw";
pub const EV_UNDO: &str = "undo";
pub const EV_REDO: &str = "redo";
pub const EV_CLEAR: &str = "clear";
pub const EV_CURSOR: &str = "cursor";
pub const EV_CONNECTED: &str = "connected";
pub const EV_INIT_STATE: &str = "init_state";
pub const EV_SYNC_STATE: &str = "sync_state";
pub const EV_CURSOR_DISCONNECT: &str = "cursor_disconnect";
pub const EV_PRESENCE_COUNT: &str = "presence_count";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid frame: {0}")]
    InvalidFrame(#[source] serde_json::Error),
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    #[error("malformed payload: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("stroke width must be positive: {0}")]
    InvalidStrokeWidth(f64),
    #[error("color must be 1..=64 bytes, got {len}")]
    InvalidColor { len: usize },
}

impl ErrorCode for DecodeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidFrame(_) => "E_INVALID_FRAME",
            Self::UnknownEvent(_) => "E_UNKNOWN_EVENT",
            Self::Malformed(_) => "E_MALFORMED_PAYLOAD",
            Self::OutOfRange { .. } => "E_OUT_OF_RANGE",
            Self::InvalidStrokeWidth(_) => "E_INVALID_STROKE_WIDTH",
            Self::InvalidColor { .. } => "E_INVALID_COLOR",
        }
    }
}

// =============================================================================
// INBOUND
// =============================================================================

/// A validated request from a participant.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Draw(Stroke),
    Undo,
    Redo,
    Clear,
    Cursor(Cursor),
}

impl ClientEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Draw(_) => EV_DRAW,
            Self::Undo => EV_UNDO,
            Self::Redo => EV_REDO,
            Self::Clear => EV_CLEAR,
            Self::Cursor(_) => EV_CURSOR,
        }
    }
}

impl TryFrom<Frame> for ClientEvent {
    type Error = DecodeError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        match frame.event.as_str() {
            EV_DRAW => Ok(Self::Draw(Stroke::try_from(frame.data)?)),
            EV_UNDO => Ok(Self::Undo),
            EV_REDO => Ok(Self::Redo),
            EV_CLEAR => Ok(Self::Clear),
            EV_CURSOR => decode_cursor(frame.data).map(Self::Cursor),
            _ => Err(DecodeError::UnknownEvent(frame.event)),
        }
    }
}

/// Parse one inbound text message into a validated event.
///
/// # Errors
///
/// Returns `InvalidFrame` if the text is not a JSON frame, otherwise
/// whatever `ClientEvent::try_from` rejects.
pub fn decode_text(text: &str) -> Result<ClientEvent, DecodeError> {
    let frame: Frame = serde_json::from_str(text).map_err(DecodeError::InvalidFrame)?;
    ClientEvent::try_from(frame)
}

fn decode_cursor(data: Data) -> Result<Cursor, DecodeError> {
    let value = serde_json::Value::Object(data.into_iter().collect());
    let cursor = Cursor::deserialize(value).map_err(DecodeError::Malformed)?;
    for (field, v) in [("x", cursor.x), ("y", cursor.y)] {
        if !v.is_finite() {
            return Err(DecodeError::OutOfRange { field, value: v });
        }
    }
    Ok(cursor)
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// An event the authority sends to one or more participants.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Connected { participant_id: ParticipantId, room: String },
    InitState(Vec<Action>),
    Draw(Action),
    SyncState(Vec<Action>),
    Clear,
    Cursor { author_id: ParticipantId, cursor: Cursor },
    CursorDisconnect { author_id: ParticipantId },
    PresenceCount(usize),
}

impl ServerEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => EV_CONNECTED,
            Self::InitState(_) => EV_INIT_STATE,
            Self::Draw(_) => EV_DRAW,
            Self::SyncState(_) => EV_SYNC_STATE,
            Self::Clear => EV_CLEAR,
            Self::Cursor { .. } => EV_CURSOR,
            Self::CursorDisconnect { .. } => EV_CURSOR_DISCONNECT,
            Self::PresenceCount(_) => EV_PRESENCE_COUNT,
        }
    }

    /// Ephemeral pointer traffic, kept out of normal logs.
    #[must_use]
    pub fn is_cursor(&self) -> bool {
        matches!(self, Self::Cursor { .. })
    }

    #[must_use]
    pub fn to_frame(&self) -> Frame {
        let frame = Frame::signal(self.name());
        match self {
            Self::Connected { participant_id, room } => frame
                .with_data("participantId", participant_id.to_string())
                .with_data("room", room.clone()),
            Self::InitState(actions) | Self::SyncState(actions) => {
                frame.with_data("actions", serde_json::to_value(actions).unwrap_or_default())
            }
            Self::Draw(action) => Frame::new(self.name(), action.to_data()),
            Self::Clear => frame,
            Self::Cursor { author_id, cursor } => frame
                .with_data("x", cursor.x)
                .with_data("y", cursor.y)
                .with_data("authorId", author_id.to_string()),
            Self::CursorDisconnect { author_id } => frame.with_data("authorId", author_id.to_string()),
            Self::PresenceCount(n) => frame.with_data("n", *n),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;
