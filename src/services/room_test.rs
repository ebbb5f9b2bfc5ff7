use super::*;
use crate::action::Stroke;
use crate::presence::Cursor;
use crate::protocol::test_helpers::{actions_from_frame, author_from_frame};
use crate::protocol::{EV_CURSOR, EV_CURSOR_DISCONNECT, EV_DRAW, EV_INIT_STATE, EV_PRESENCE_COUNT, EV_SYNC_STATE};
use crate::state::test_helpers;
use tokio::time::{Duration, timeout};
use uuid::Uuid;

async fn recv_frame(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("frame receive timed out")
        .expect("channel closed")
}

async fn assert_channel_empty(rx: &mut mpsc::Receiver<Frame>) {
    assert!(
        timeout(Duration::from_millis(80), rx.recv()).await.is_err(),
        "expected channel to remain empty"
    );
}

/// Drain frames until one with the given event arrives.
async fn recv_event(rx: &mut mpsc::Receiver<Frame>, event: &str) -> Frame {
    loop {
        let frame = recv_frame(rx).await;
        if frame.event == event {
            return frame;
        }
    }
}

fn stroke(x: f64) -> Stroke {
    Stroke {
        x0: x,
        y0: x,
        x1: x,
        y1: x,
        color: "#abcdef".into(),
        stroke_width: 1.5,
        is_eraser: false,
    }
}

async fn join(state: &AppState, room: &str) -> (ParticipantId, RoomHandle, mpsc::Receiver<Frame>) {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(32);
    let handle = join_room(state, room, id, tx).await;
    (id, handle, rx)
}

// =============================================================================
// ROOM NAMES
// =============================================================================

#[test]
fn room_name_rules() {
    assert_eq!(validate_room_name("default"), Ok(()));
    assert_eq!(validate_room_name("Team_42-b"), Ok(()));
    assert_eq!(validate_room_name(""), Err(RoomNameError::Empty));
    assert_eq!(validate_room_name(&"a".repeat(MAX_ROOM_NAME_LEN + 1)), Err(RoomNameError::TooLong(65)));
    assert_eq!(validate_room_name("a b"), Err(RoomNameError::InvalidChar(' ')));
    assert_eq!(validate_room_name("../etc"), Err(RoomNameError::InvalidChar('.')));
    assert_eq!(RoomNameError::Empty.error_code(), "E_ROOM_NAME_EMPTY");
}

// =============================================================================
// JOIN / LEAVE
// =============================================================================

#[tokio::test]
async fn join_creates_room_and_sends_init_state_then_presence() {
    let state = test_helpers::test_app_state();
    let (_id, _handle, mut rx) = join(&state, "fresh").await;

    let init = recv_frame(&mut rx).await;
    assert_eq!(init.event, EV_INIT_STATE);
    assert!(actions_from_frame(&init).expect("actions").is_empty());

    let presence = recv_frame(&mut rx).await;
    assert_eq!(presence.event, EV_PRESENCE_COUNT);
    assert_eq!(presence.data.get("n").and_then(serde_json::Value::as_u64), Some(1));

    assert!(state.rooms.read().await.contains_key("fresh"));
}

#[tokio::test]
async fn late_joiner_receives_history_before_later_draws() {
    let state = test_helpers::test_app_state();
    let (a, handle, _rx_a) = join(&state, "r").await;
    handle_event(&handle, a, ClientEvent::Draw(stroke(0.1))).await;
    handle_event(&handle, a, ClientEvent::Draw(stroke(0.2))).await;

    let (_b, _, mut rx_b) = join(&state, "r").await;
    handle_event(&handle, a, ClientEvent::Draw(stroke(0.3))).await;

    let init = recv_frame(&mut rx_b).await;
    assert_eq!(init.event, EV_INIT_STATE);
    let history = actions_from_frame(&init).expect("actions");
    assert_eq!(history.len(), 2);
    assert!(history[0].id < history[1].id);

    let draw = recv_event(&mut rx_b, EV_DRAW).await;
    let later_id = draw.data.get("id").and_then(serde_json::Value::as_u64).expect("id");
    assert!(later_id > history[1].id);
}

#[tokio::test]
async fn leave_broadcasts_cursor_removal_and_presence() {
    let state = test_helpers::test_app_state();
    let (a, handle, _rx_a) = join(&state, "r").await;
    let (_b, _, mut rx_b) = join(&state, "r").await;
    recv_event(&mut rx_b, EV_PRESENCE_COUNT).await;

    leave_room(&handle, a).await;

    let gone = recv_event(&mut rx_b, EV_CURSOR_DISCONNECT).await;
    assert_eq!(author_from_frame(&gone), Some(a));
    let presence = recv_event(&mut rx_b, EV_PRESENCE_COUNT).await;
    assert_eq!(presence.data.get("n").and_then(serde_json::Value::as_u64), Some(1));
}

#[tokio::test]
async fn leaving_twice_broadcasts_once() {
    let state = test_helpers::test_app_state();
    let (a, handle, _rx_a) = join(&state, "r").await;
    let (_b, _, mut rx_b) = join(&state, "r").await;
    recv_event(&mut rx_b, EV_PRESENCE_COUNT).await;

    leave_room(&handle, a).await;
    leave_room(&handle, a).await;

    recv_event(&mut rx_b, EV_CURSOR_DISCONNECT).await;
    recv_event(&mut rx_b, EV_PRESENCE_COUNT).await;
    assert_channel_empty(&mut rx_b).await;
}

// =============================================================================
// BROADCAST SHAPE
// =============================================================================

#[tokio::test]
async fn draw_goes_to_peers_not_sender() {
    let state = test_helpers::test_app_state();
    let (a, handle, mut rx_a) = join(&state, "r").await;
    let (_b, _, mut rx_b) = join(&state, "r").await;
    // a sees: init, presence(1), presence(2). b sees: init, presence(2).
    recv_frame(&mut rx_a).await;
    recv_frame(&mut rx_a).await;
    recv_frame(&mut rx_a).await;
    recv_frame(&mut rx_b).await;
    recv_frame(&mut rx_b).await;

    handle_event(&handle, a, ClientEvent::Draw(stroke(0.5))).await;

    let draw = recv_frame(&mut rx_b).await;
    assert_eq!(draw.event, EV_DRAW);
    assert_eq!(author_from_frame(&draw), Some(a));
    assert_channel_empty(&mut rx_a).await;
}

#[tokio::test]
async fn undo_resyncs_everyone_including_sender() {
    let state = test_helpers::test_app_state();
    let (a, handle, mut rx_a) = join(&state, "r").await;
    let (_b, _, mut rx_b) = join(&state, "r").await;
    handle_event(&handle, a, ClientEvent::Draw(stroke(0.1))).await;
    handle_event(&handle, a, ClientEvent::Draw(stroke(0.2))).await;

    handle_event(&handle, a, ClientEvent::Undo).await;

    for rx in [&mut rx_a, &mut rx_b] {
        let sync = recv_event(rx, EV_SYNC_STATE).await;
        assert_eq!(actions_from_frame(&sync).expect("actions").len(), 1);
    }
}

#[tokio::test]
async fn undo_on_empty_room_sends_nothing() {
    let state = test_helpers::test_app_state();
    let (a, handle, mut rx_a) = join(&state, "r").await;
    recv_frame(&mut rx_a).await;
    recv_frame(&mut rx_a).await;

    handle_event(&handle, a, ClientEvent::Undo).await;
    handle_event(&handle, a, ClientEvent::Redo).await;

    assert_channel_empty(&mut rx_a).await;
}

#[tokio::test]
async fn cursor_goes_to_peers_only() {
    let state = test_helpers::test_app_state();
    let (a, handle, mut rx_a) = join(&state, "r").await;
    let (_b, _, mut rx_b) = join(&state, "r").await;
    recv_event(&mut rx_a, EV_PRESENCE_COUNT).await;
    recv_event(&mut rx_a, EV_PRESENCE_COUNT).await;

    handle_event(&handle, a, ClientEvent::Cursor(Cursor { x: 0.4, y: 0.6 })).await;

    let cursor = recv_event(&mut rx_b, EV_CURSOR).await;
    assert_eq!(author_from_frame(&cursor), Some(a));
    assert_channel_empty(&mut rx_a).await;
}

#[tokio::test]
async fn rooms_are_isolated() {
    let state = test_helpers::test_app_state();
    let (a, red, _rx_a) = join(&state, "red").await;
    let (_b, _, mut rx_b) = join(&state, "blue").await;
    recv_event(&mut rx_b, EV_PRESENCE_COUNT).await;

    handle_event(&red, a, ClientEvent::Draw(stroke(0.1))).await;

    assert_channel_empty(&mut rx_b).await;
    let blue = room_summary(&state, "blue").await.expect("blue exists");
    assert_eq!(blue.actions, 0);
    let red = room_summary(&state, "red").await.expect("red exists");
    assert_eq!(red.actions, 1);
}

// =============================================================================
// EVICTION
// =============================================================================

#[tokio::test]
async fn full_channel_evicts_client_and_notifies_peers() {
    let state = test_helpers::test_app_state();
    let handle = test_helpers::seed_room(&state, "r").await;

    let slow = Uuid::new_v4();
    let (slow_tx, mut slow_rx) = mpsc::channel(2);
    join_room(&state, "r", slow, slow_tx).await;
    // init_state + presence fill the slow client's buffer.

    let (fast, _, mut fast_rx) = join(&state, "r").await;
    recv_event(&mut fast_rx, EV_PRESENCE_COUNT).await;

    let gone = recv_event(&mut fast_rx, EV_CURSOR_DISCONNECT).await;
    assert_eq!(author_from_frame(&gone), Some(slow));
    let presence = recv_event(&mut fast_rx, EV_PRESENCE_COUNT).await;
    assert_eq!(presence.data.get("n").and_then(serde_json::Value::as_u64), Some(1));

    {
        let room = handle.lock().await;
        assert!(!room.clients.contains_key(&slow));
        assert!(room.clients.contains_key(&fast));
        assert!(!room.coordinator.participants().contains(slow));
    }

    // Buffered frames drain, then the channel reports closed.
    recv_frame(&mut slow_rx).await;
    recv_frame(&mut slow_rx).await;
    let closed = timeout(Duration::from_millis(200), slow_rx.recv())
        .await
        .expect("closed channel should resolve");
    assert!(closed.is_none());
}

#[tokio::test]
async fn closed_channel_is_evicted_on_next_broadcast() {
    let state = test_helpers::test_app_state();
    let (a, handle, rx_a) = join(&state, "r").await;
    drop(rx_a);

    let (_b, _, mut rx_b) = join(&state, "r").await;

    let gone = recv_event(&mut rx_b, EV_CURSOR_DISCONNECT).await;
    assert_eq!(author_from_frame(&gone), Some(a));
    assert_eq!(handle.lock().await.coordinator.participants().count(), 1);
}

#[tokio::test]
async fn summary_of_unknown_room_is_none() {
    let state = test_helpers::test_app_state();
    assert!(room_summary(&state, "nowhere").await.is_none());
}
