// Shared helpers for black-box tests: each test boots its own server on an
// ephemeral port and drives it over real WebSockets. Servers are not shared
// because the game is one process-wide session; sharing would leak state
// between tests.

use futures_util::{SinkExt, StreamExt};
use planet_rush::SessionSettings;
use planet_rush::domain::planet::PlanetLedger;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings with timers short enough for tests.
pub fn fast_settings() -> SessionSettings {
    SessionSettings {
        event_channel_capacity: 64,
        outbound_channel_capacity: 256,
        quiz_time_limit: Duration::from_millis(400),
        reset_delay: Duration::from_millis(300),
    }
}

/// Boots a server on an ephemeral port and returns its WebSocket URL.
pub async fn spawn_server(settings: SessionSettings) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");
    tokio::spawn(async move {
        planet_rush::run(listener, settings).await.expect("server failed");
    });
    format!("ws://{addr}/ws")
}

/// Connects a client and waits out the init handshake, returning the socket,
/// the assigned player id, and the init payload.
pub async fn join(url: &str) -> (WsClient, u64, Value) {
    let (mut client, _response) = connect_async(url).await.expect("websocket connect");
    let init = recv_until(&mut client, "init").await;
    let id = init["data"]["playerId"].as_u64().expect("numeric playerId");
    (client, id, init)
}

pub async fn send(client: &mut WsClient, value: Value) {
    client
        .send(Message::text(value.to_string()))
        .await
        .expect("websocket send");
}

/// Reads frames until one with the wanted `type` arrives, skipping others.
pub async fn recv_until(client: &mut WsClient, wanted: &str) -> Value {
    loop {
        let msg = tokio::time::timeout(RECV_TIMEOUT, client.next())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {wanted}"))
            .unwrap_or_else(|| panic!("connection closed waiting for {wanted}"))
            .expect("websocket error");
        if let Message::Text(txt) = msg {
            let value: Value = serde_json::from_str(txt.as_str()).expect("server sent invalid json");
            if value["type"] == wanted {
                return value;
            }
        }
    }
}

/// Reads frames for `window`, asserting none of type `unwanted` arrives.
pub async fn assert_silent(client: &mut WsClient, unwanted: &str, window: Duration) {
    let deadline = tokio::time::Instant::now() + window;
    loop {
        let Some(remaining) = deadline.checked_duration_since(tokio::time::Instant::now()) else {
            return;
        };
        match tokio::time::timeout(remaining, client.next()).await {
            Ok(Some(Ok(Message::Text(txt)))) => {
                let value: Value =
                    serde_json::from_str(txt.as_str()).expect("server sent invalid json");
                assert_ne!(value["type"], unwanted, "unexpected {unwanted}: {value}");
            }
            Ok(Some(Ok(_))) => {}
            Ok(Some(Err(e))) => panic!("websocket error: {e}"),
            Ok(None) => return,
            // Window elapsed without the unwanted message.
            Err(_) => return,
        }
    }
}

pub fn ready_msg() -> Value {
    json!({"type": "player-ready"})
}

pub fn quiz_request(planet: &str) -> Value {
    json!({"type": "request-planet-quiz", "data": {"planet": planet}})
}

pub fn answer_msg(planet: &str, answer: &str) -> Value {
    json!({"type": "submit-answer", "data": {"planet": planet, "answer": answer}})
}

/// Planet names in catalogue order.
pub fn planet_names() -> Vec<String> {
    PlanetLedger::new().iter().map(|p| p.name.to_string()).collect()
}

/// The stored correct answer for a planet, read from the catalogue.
pub fn correct_answer(planet: &str) -> String {
    PlanetLedger::new()
        .get(planet)
        .unwrap_or_else(|| panic!("unknown planet {planet}"))
        .quiz
        .correct_answer
        .to_string()
}

/// Connects two clients and readies both, waiting for the start signal.
pub async fn start_two_player_game(url: &str) -> (WsClient, u64, WsClient, u64) {
    let (mut a, a_id, _) = join(url).await;
    let (mut b, b_id, _) = join(url).await;
    send(&mut a, ready_msg()).await;
    send(&mut b, ready_msg()).await;
    recv_until(&mut a, "game-start").await;
    recv_until(&mut b, "game-start").await;
    (a, a_id, b, b_id)
}

/// Drives one full lock-and-claim of `planet` through `client`.
pub async fn claim(client: &mut WsClient, planet: &str) {
    send(client, quiz_request(planet)).await;
    recv_until(client, "start-quiz").await;
    send(client, answer_msg(planet, &correct_answer(planet))).await;
    let result = recv_until(client, "quiz-result").await;
    assert_eq!(result["data"]["correct"], true, "claim of {planet} failed");
}
