//! Action: one immutable entry in the authoritative drawing history.
//!
//! DESIGN
//! ======
//! Inbound draw payloads are decoded into a `Stroke` before anything else
//! sees them. A `Stroke` only exists if every coordinate is a finite number
//! in `[0, 1]`, the stroke width is positive, and the color is a short,
//! non-empty string. The coordinator wraps a validated stroke into an
//! `Action` by assigning an id and the author.
//!
//! Action ids are milliseconds since the Unix epoch, bumped by one whenever
//! the clock has not moved past the previous id. Within one log they are
//! unique and strictly increasing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::frame::{Data, now_ms};
use crate::protocol::DecodeError;

/// Longest accepted color spec, in bytes.
pub const MAX_COLOR_LEN: usize = 64;

// =============================================================================
// TYPES
// =============================================================================

/// Identifier assigned to an action when the authority accepts it.
pub type ActionId = u64;

/// A validated line segment in normalized canvas coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub color: String,
    pub stroke_width: f64,
    pub is_eraser: bool,
}

/// What an action does. Only line segments exist today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    Draw(Stroke),
}

/// One accepted drawing operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: ActionId,
    pub author_id: Uuid,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl Action {
    #[must_use]
    pub fn draw(id: ActionId, author_id: Uuid, stroke: Stroke) -> Self {
        Self { id, author_id, kind: ActionKind::Draw(stroke) }
    }

    /// Flat payload for a `draw` delta frame.
    #[must_use]
    pub fn to_data(&self) -> Data {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => Data::new(),
        }
    }
}

// =============================================================================
// DECODE
// =============================================================================

/// Raw shape of an inbound `draw` payload. Types are checked by serde,
/// ranges by `Stroke::try_from`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StrokePayload {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    color: String,
    stroke_width: f64,
    #[serde(default)]
    is_eraser: bool,
}

impl TryFrom<Data> for Stroke {
    type Error = DecodeError;

    fn try_from(data: Data) -> Result<Self, Self::Error> {
        let value = serde_json::Value::Object(data.into_iter().collect());
        let raw: StrokePayload = serde_json::from_value(value).map_err(DecodeError::Malformed)?;

        for (field, v) in [("x0", raw.x0), ("y0", raw.y0), ("x1", raw.x1), ("y1", raw.y1)] {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(DecodeError::OutOfRange { field, value: v });
            }
        }
        if !raw.stroke_width.is_finite() || raw.stroke_width <= 0.0 {
            return Err(DecodeError::InvalidStrokeWidth(raw.stroke_width));
        }
        if raw.color.is_empty() || raw.color.len() > MAX_COLOR_LEN {
            return Err(DecodeError::InvalidColor { len: raw.color.len() });
        }

        Ok(Self {
            x0: raw.x0,
            y0: raw.y0,
            x1: raw.x1,
            y1: raw.y1,
            color: raw.color,
            stroke_width: raw.stroke_width,
            is_eraser: raw.is_eraser,
        })
    }
}

// =============================================================================
// ID ASSIGNMENT
// =============================================================================

/// Time-based id source that never repeats or goes backwards.
#[derive(Debug, Default)]
pub struct ActionIds {
    last: ActionId,
}

impl ActionIds {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Source whose ids all come after `last`, for logs that already hold
    /// actions.
    #[must_use]
    pub fn starting_after(last: ActionId) -> Self {
        Self { last }
    }

    /// Never hand out an id at or below `id` from now on.
    pub fn observe(&mut self, id: ActionId) {
        self.last = self.last.max(id);
    }

    /// Next id using the wall clock.
    pub fn next_id(&mut self) -> ActionId {
        self.next_at(ActionId::try_from(now_ms()).unwrap_or(0))
    }

    /// Next id given an explicit clock reading.
    pub fn next_at(&mut self, now: ActionId) -> ActionId {
        let id = now.max(self.last.saturating_add(1));
        self.last = id;
        id
    }
}

#[cfg(test)]
#[path = "action_test.rs"]
mod tests;
