// End-to-end scenarios against a real server over WebSockets.

mod support;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::time::Duration;
use support::*;
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn init_reports_identity_and_fresh_board() {
    let url = spawn_server(fast_settings()).await;
    let (_client, id, init) = join(&url).await;

    let state = &init["data"]["gameState"];
    assert_eq!(state["status"], "waiting");
    assert_eq!(state["planets"].as_object().expect("planets map").len(), 8);
    assert_eq!(state["planets"]["Mars"]["points"], 15);
    assert_eq!(state["planets"]["Mars"]["claimedBy"], serde_json::Value::Null);
    assert_eq!(state["planets"]["Mars"]["isLocked"], false);
    // Snapshots never carry quiz content.
    assert!(state["planets"]["Mars"].get("quiz").is_none());

    let me = &state["players"][id.to_string().as_str()];
    assert!(me["name"].as_str().expect("name").starts_with("Explorer-"));
    assert!(me["color"].as_str().expect("color").starts_with('#'));
    assert_eq!(me["isReady"], false);
    assert_eq!(state["scores"][id.to_string().as_str()], 0);
}

#[tokio::test]
async fn roster_updates_follow_joins_and_leaves() {
    let url = spawn_server(fast_settings()).await;
    let (mut a, a_id, _) = join(&url).await;
    let (b, b_id, _) = join(&url).await;

    // A sees B arrive, after possibly catching its own join update first.
    loop {
        let update = recv_until(&mut a, "player-status-update").await;
        let players = update["data"].as_object().expect("players map");
        if players.contains_key(&b_id.to_string()) {
            break;
        }
    }

    drop(b);
    loop {
        let update = recv_until(&mut a, "player-status-update").await;
        let players = update["data"].as_object().expect("players map");
        if !players.contains_key(&b_id.to_string()) {
            assert!(players.contains_key(&a_id.to_string()));
            break;
        }
    }
}

#[tokio::test]
async fn ready_players_start_the_game_once() {
    let url = spawn_server(fast_settings()).await;
    let (mut a, _, mut b, _) = start_two_player_game(&url).await;

    // Both got exactly one start signal.
    assert_silent(&mut a, "game-start", Duration::from_millis(300)).await;
    assert_silent(&mut b, "game-start", Duration::from_millis(300)).await;
}

#[tokio::test]
async fn single_ready_player_does_not_start_the_game() {
    let url = spawn_server(fast_settings()).await;
    let (mut a, _, _) = join(&url).await;
    send(&mut a, ready_msg()).await;
    assert_silent(&mut a, "game-start", Duration::from_millis(300)).await;
}

#[tokio::test]
async fn lock_request_before_start_is_ignored() {
    let url = spawn_server(fast_settings()).await;
    let (mut a, _, _) = join(&url).await;
    send(&mut a, quiz_request("Mars")).await;
    assert_silent(&mut a, "start-quiz", Duration::from_millis(300)).await;
}

#[tokio::test]
async fn competing_lock_request_gets_no_quiz() {
    let url = spawn_server(fast_settings()).await;
    let (mut a, a_id, mut b, _) = start_two_player_game(&url).await;

    send(&mut a, quiz_request("Mars")).await;
    let quiz = recv_until(&mut a, "start-quiz").await;
    assert_eq!(quiz["data"]["planet"], "Mars");
    assert_eq!(quiz["data"]["quiz"]["answers"].as_array().expect("answers").len(), 2);
    // The correct answer never reaches the client.
    assert!(quiz["data"]["quiz"].get("correctAnswer").is_none());

    let locked = recv_until(&mut b, "planet-locked").await;
    assert_eq!(locked["data"], json!({"planet": "Mars", "isLocked": true}));

    // B's request while A holds the lock produces nothing for B.
    send(&mut b, quiz_request("Mars")).await;
    assert_silent(&mut b, "start-quiz", Duration::from_millis(300)).await;

    // A's lock still resolves normally.
    send(&mut a, answer_msg("Mars", &correct_answer("Mars"))).await;
    let update = recv_until(&mut b, "planet-update").await;
    assert_eq!(update["data"]["claimedBy"], a_id);
}

#[tokio::test]
async fn correct_answer_claims_planet_for_all() {
    let url = spawn_server(fast_settings()).await;
    let (mut a, a_id, mut b, _) = start_two_player_game(&url).await;

    claim(&mut a, "Mars").await;

    // B observes the lock, the release, the claim, then the new scores.
    let locked = recv_until(&mut b, "planet-locked").await;
    assert_eq!(locked["data"]["isLocked"], true);
    let unlocked = recv_until(&mut b, "planet-locked").await;
    assert_eq!(unlocked["data"]["isLocked"], false);

    let update = recv_until(&mut b, "planet-update").await;
    assert_eq!(update["data"]["planet"], "Mars");
    assert_eq!(update["data"]["claimedBy"], a_id);
    assert_eq!(update["data"]["points"], 15);
    assert!(update["data"]["playerName"].as_str().expect("name").starts_with("Explorer-"));
    assert!(update["data"]["playerColor"].as_str().expect("color").starts_with('#'));

    let scores = recv_until(&mut b, "score-update").await;
    assert_eq!(scores["data"][a_id.to_string().as_str()], 15);
}

#[tokio::test]
async fn wrong_answer_returns_fact_and_reopens() {
    let url = spawn_server(fast_settings()).await;
    let (mut a, _, mut b, _) = start_two_player_game(&url).await;

    send(&mut a, quiz_request("Venus")).await;
    recv_until(&mut a, "start-quiz").await;
    send(&mut a, answer_msg("Venus", "Yes")).await;

    let result = recv_until(&mut a, "quiz-result").await;
    assert_eq!(result["data"]["correct"], false);
    assert!(result["data"]["fact"].as_str().expect("fact").contains("Venus"));

    // The planet reopened; B can lock it now.
    send(&mut b, quiz_request("Venus")).await;
    let quiz = recv_until(&mut b, "start-quiz").await;
    assert_eq!(quiz["data"]["planet"], "Venus");
}

#[tokio::test]
async fn quiz_expiry_notifies_locker_and_reopens() {
    let url = spawn_server(fast_settings()).await;
    let (mut a, _, mut b, _) = start_two_player_game(&url).await;

    send(&mut a, quiz_request("Mars")).await;
    recv_until(&mut a, "start-quiz").await;

    // Let the quiz timer fire without answering.
    recv_until(&mut a, "quiz-timeout").await;
    let locked = recv_until(&mut b, "planet-locked").await;
    assert_eq!(locked["data"], json!({"planet": "Mars", "isLocked": true}));
    let unlocked = recv_until(&mut b, "planet-locked").await;
    assert_eq!(unlocked["data"], json!({"planet": "Mars", "isLocked": false}));

    // No claim was recorded; the planet can be locked again.
    send(&mut a, quiz_request("Mars")).await;
    recv_until(&mut a, "start-quiz").await;
}

#[tokio::test]
async fn answer_after_expiry_is_ignored() {
    let url = spawn_server(fast_settings()).await;
    let (mut a, _, _b, _) = start_two_player_game(&url).await;

    send(&mut a, quiz_request("Mars")).await;
    recv_until(&mut a, "start-quiz").await;
    recv_until(&mut a, "quiz-timeout").await;

    send(&mut a, answer_msg("Mars", &correct_answer("Mars"))).await;
    assert_silent(&mut a, "quiz-result", Duration::from_millis(300)).await;
}

#[tokio::test]
async fn disconnect_mid_quiz_unlocks_without_stale_timeout() {
    let url = spawn_server(fast_settings()).await;
    let (mut a, _, mut b, _) = start_two_player_game(&url).await;

    send(&mut a, quiz_request("Mars")).await;
    recv_until(&mut a, "start-quiz").await;
    let locked = recv_until(&mut b, "planet-locked").await;
    assert_eq!(locked["data"]["isLocked"], true);

    // The lock holder vanishes mid-quiz.
    drop(a);

    let unlocked = recv_until(&mut b, "planet-locked").await;
    assert_eq!(unlocked["data"], json!({"planet": "Mars", "isLocked": false}));
    // The aborted quiz timer must not unlock anything again later.
    assert_silent(&mut b, "planet-locked", Duration::from_millis(600)).await;

    // The planet is open for the survivor.
    send(&mut b, quiz_request("Mars")).await;
    recv_until(&mut b, "start-quiz").await;
}

#[tokio::test]
async fn full_cycle_declares_winner_and_resets() {
    let url = spawn_server(fast_settings()).await;
    let (mut a, a_id, mut b, b_id) = start_two_player_game(&url).await;

    let names = planet_names();

    // B claims Mars first; the claim broadcast carries B's display name.
    send(&mut b, quiz_request("Mars")).await;
    let quiz = recv_until(&mut b, "start-quiz").await;
    assert_eq!(quiz["data"]["planet"], "Mars");
    send(&mut b, answer_msg("Mars", &correct_answer("Mars"))).await;
    let update = recv_until(&mut b, "planet-update").await;
    let b_name = update["data"]["playerName"].as_str().expect("name").to_string();

    // A takes three planets, B ends up with five.
    for planet in &names[..3] {
        claim(&mut a, planet).await;
    }
    for planet in &names[4..] {
        claim(&mut b, planet).await;
    }

    let over = recv_until(&mut a, "game-over").await;
    assert_eq!(over["data"]["winners"], json!([b_name]));
    assert_eq!(over["data"]["scores"][a_id.to_string().as_str()], 8 + 12 + 10);
    assert_eq!(
        over["data"]["scores"][b_id.to_string().as_str()],
        15 + 20 + 18 + 16 + 17
    );

    // After the reset delay the next cycle begins from scratch.
    let reset = recv_until(&mut a, "game-reset").await;
    let state = &reset["data"];
    assert_eq!(state["status"], "waiting");
    for (_, planet) in state["planets"].as_object().expect("planets map") {
        assert_eq!(planet["claimedBy"], serde_json::Value::Null);
        assert_eq!(planet["isLocked"], false);
    }
    let players = state["players"].as_object().expect("players map");
    assert_eq!(players.len(), 2);
    for (_, player) in players {
        assert_eq!(player["isReady"], false);
    }
    for (_, score) in state["scores"].as_object().expect("scores map") {
        assert_eq!(*score, json!(0));
    }

    // The fresh cycle accepts a new ready-up round.
    send(&mut a, ready_msg()).await;
    send(&mut b, ready_msg()).await;
    recv_until(&mut a, "game-start").await;
}

#[tokio::test]
async fn flooding_invalid_json_closes_the_connection() {
    let url = spawn_server(fast_settings()).await;
    let (mut a, _, _) = join(&url).await;

    // Sends may start failing once the server gives up mid-flood.
    for _ in 0..12 {
        let _ = a.send(Message::text("not json".to_string())).await;
    }

    // The server gives up on the connection with a close frame.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        assert!(
            tokio::time::Instant::now() < deadline,
            "server never closed the connection"
        );
        match tokio::time::timeout(Duration::from_secs(5), a.next()).await {
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) => break,
            Ok(Some(Ok(_))) => {}
            Ok(Some(Err(_))) => break,
            Err(_) => panic!("server never closed the connection"),
        }
    }
}
