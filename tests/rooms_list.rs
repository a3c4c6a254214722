mod support;

use futures_util::StreamExt;
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite};

#[tokio::test]
async fn unknown_room_is_rejected_before_upgrade() {
    let url = support::ws_url(&format!("/ws?room_id=room-{}", uuid::Uuid::new_v4()));

    match connect_async(url).await {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status().as_u16(), 404);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("upgrade should be refused for an unknown room"),
    }
}

#[tokio::test]
async fn lists_waiting_rooms_with_participants() {
    let base_url = support::ensure_server();
    let (mut ws, _) = connect_async(support::ws_url("/ws"))
        .await
        .expect("websocket should connect");

    // Wait for the seat before asking for the listing.
    let first = timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("joined in time")
        .expect("stream open")
        .expect("frame");
    let joined: serde_json::Value =
        serde_json::from_str(first.to_text().expect("text frame")).expect("json");
    assert_eq!(joined["type"], "joined");

    let rooms: serde_json::Value = reqwest::Client::new()
        .get(format!("{base_url}/rooms"))
        .send()
        .await
        .expect("request should succeed")
        .json()
        .await
        .expect("json body");

    let rooms = rooms.as_array().expect("array");
    let room = rooms
        .iter()
        .find(|room| room["participants"] == 1)
        .expect("our room should be listed");
    assert_eq!(room["phase"], "waiting");
    assert!(
        room["roomId"]
            .as_str()
            .is_some_and(|id| id.starts_with("room-"))
    );
}
