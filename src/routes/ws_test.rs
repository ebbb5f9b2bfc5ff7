use super::*;
use crate::protocol::{EV_DRAW, EV_INIT_STATE, EV_PRESENCE_COUNT};
use crate::state::test_helpers;
use std::time::Duration;
use tokio::time::timeout;

async fn recv_event(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("channel closed")
}

struct Joined {
    room: crate::state::RoomHandle,
    sender: Uuid,
    // Held so the sender is not evicted for a closed channel.
    _sender_rx: mpsc::Receiver<Frame>,
    peer_rx: mpsc::Receiver<Frame>,
}

async fn joined_pair(state: &AppState) -> Joined {
    let sender = Uuid::new_v4();
    let peer = Uuid::new_v4();
    let (sender_tx, sender_rx) = mpsc::channel(16);
    let (peer_tx, mut peer_rx) = mpsc::channel(16);

    let room = services::room::join_room(state, "ws-test", sender, sender_tx).await;
    services::room::join_room(state, "ws-test", peer, peer_tx).await;

    assert_eq!(recv_event(&mut peer_rx).await.event, EV_INIT_STATE);
    assert_eq!(recv_event(&mut peer_rx).await.event, EV_PRESENCE_COUNT);
    Joined { room, sender, _sender_rx: sender_rx, peer_rx }
}

#[tokio::test]
async fn valid_draw_text_reaches_peer() {
    let state = test_helpers::test_app_state();
    let Joined { room, sender, _sender_rx, mut peer_rx } = joined_pair(&state).await;

    let text = r##"{"event":"draw","data":{"x0":0,"y0":0,"x1":1,"y1":1,"color":"#000","strokeWidth":3}}"##;
    process_inbound_text(&room, sender, text).await;

    let frame = recv_event(&mut peer_rx).await;
    assert_eq!(frame.event, EV_DRAW);
    assert_eq!(room.lock().await.coordinator.log().len(), 1);
}

#[tokio::test]
async fn malformed_text_is_dropped_without_side_effects() {
    let state = test_helpers::test_app_state();
    let Joined { room, sender, _sender_rx, mut peer_rx } = joined_pair(&state).await;

    for text in [
        "not json",
        r##"{"event":"draw","data":{"x0":2,"y0":0,"x1":1,"y1":1,"color":"#000","strokeWidth":3}}"##,
        r##"{"event":"draw","data":{"x0":0,"y0":0,"x1":1,"y1":1,"color":"#000","strokeWidth":0}}"##,
        r#"{"event":"teleport","data":{}}"#,
    ] {
        process_inbound_text(&room, sender, text).await;
    }

    assert!(room.lock().await.coordinator.log().is_empty());
    assert!(peer_rx.try_recv().is_err());
}

#[tokio::test]
async fn text_from_unjoined_participant_is_ignored() {
    let state = test_helpers::test_app_state();
    let Joined { room, _sender_rx, mut peer_rx, .. } = joined_pair(&state).await;

    process_inbound_text(&room, Uuid::new_v4(), r#"{"event":"clear"}"#).await;

    assert!(peer_rx.try_recv().is_err());
}
