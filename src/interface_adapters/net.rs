use crate::interface_adapters::ids::next_connection_id;
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::use_cases::types::{GameEvent, Outbound, Target};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    EventsClosed,
    FramesClosed,
}

/// A serialized outbound message paired with its audience. Shared across all
/// connections so each event is JSON-encoded exactly once.
#[derive(Debug, Clone)]
pub struct Frame {
    pub target: Target,
    pub bytes: Utf8Bytes,
}

/// Serializes each session event once and broadcasts the shared bytes.
pub async fn outbound_serializer(
    mut outbound_rx: broadcast::Receiver<Outbound>,
    frame_tx: broadcast::Sender<Frame>,
) {
    loop {
        match outbound_rx.recv().await {
            Ok(out) => {
                let target = out.target;
                let msg = ServerMessage::from(out.event);
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize session event");
                        continue;
                    }
                };
                let _ = frame_tx.send(Frame {
                    target,
                    bytes: Utf8Bytes::from(txt),
                });
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "outbound serializer lagged; events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("outbound channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    // The connection id doubles as the player id for the session.
    let player_id = next_connection_id();
    let span = info_span!("conn", player_id);
    let _enter = span.enter();

    let mut ctx = match bootstrap_connection(&state, player_id).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "bootstrap failed".into(),
                })))
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    info!("client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

struct ConnCtx {
    pub player_id: u64,
    pub event_tx: mpsc::Sender<GameEvent>,
    pub frame_rx: broadcast::Receiver<Frame>,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_event_full_log: Instant,
    pub last_frame_lag_log: Instant,
    pub last_invalid_msg_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

async fn bootstrap_connection(state: &AppState, player_id: u64) -> Result<ConnCtx, NetError> {
    // Subscribe *before* announcing the join so the welcome frame cannot be
    // missed; the session emits it through the same broadcast pipeline.
    let frame_rx = state.frame_tx.subscribe();

    state
        .event_tx
        .send(GameEvent::Join { player_id })
        .await
        .map_err(|_| NetError::EventsClosed)?;

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id,
        event_tx: state.event_tx.clone(),
        frame_rx,

        msgs_in: 0,
        msgs_out: 0,
        bytes_in: 0,
        bytes_out: 0,

        invalid_json: 0,

        last_event_full_log: now,
        last_frame_lag_log: now,
        last_invalid_msg_log: now,

        close_frame: None,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_PLANET_NAME_LEN: usize = 32;
const MAX_ANSWER_LEN: usize = 128;

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// Maps a parsed client message to its session event, dropping payloads that
/// are too large to be a real planet name or answer.
fn to_game_event(player_id: u64, msg: ClientMessage) -> Option<GameEvent> {
    match msg {
        ClientMessage::PlayerReady => Some(GameEvent::Ready { player_id }),
        ClientMessage::RequestPlanetQuiz(payload) => {
            if payload.planet.len() > MAX_PLANET_NAME_LEN {
                return None;
            }
            Some(GameEvent::LockRequest {
                player_id,
                planet: payload.planet,
            })
        }
        ClientMessage::SubmitAnswer(payload) => {
            if payload.planet.len() > MAX_PLANET_NAME_LEN || payload.answer.len() > MAX_ANSWER_LEN {
                return None;
            }
            Some(GameEvent::SubmitAnswer {
                player_id,
                planet: payload.planet,
                answer: payload.answer,
            })
        }
    }
}

fn forward_game_event(
    player_id: u64,
    event_tx: &mpsc::Sender<GameEvent>,
    event: GameEvent,
    last_event_full_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    match event_tx.try_send(event) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_)) => {
            if should_log(last_event_full_log) {
                warn!(player_id, "event channel full; dropping client action");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_)) => Err(NetError::EventsClosed),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        event_tx,
        frame_rx,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        last_event_full_log,
        last_frame_lag_log,
        last_invalid_msg_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming message from the client.
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    incoming,
                    player_id,
                    event_tx,
                    msgs_in,
                    bytes_in,
                    invalid_json,
                    last_event_full_log,
                    last_invalid_msg_log,
                    close_frame,
                ) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing frame from the session.
            frame = frame_rx.recv() => {
                match frame {
                    Ok(frame) => {
                        if frame_is_for(player_id, &frame) {
                            match forward_frame(frame.bytes, socket, msgs_out, bytes_out).await {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        } else {
                            false
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Session messages are deltas, not resendable
                        // snapshots; a lagged client just misses them.
                        if should_log(last_frame_lag_log) {
                            warn!(player_id, missed = n, "outbound frames lagged");
                        }
                        false
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::FramesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(
        player_id,
        event_tx,
        *msgs_in,
        *msgs_out,
        *bytes_in,
        *bytes_out,
        *invalid_json,
    )
    .await
    {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

fn frame_is_for(player_id: u64, frame: &Frame) -> bool {
    match frame.target {
        Target::All => true,
        Target::One(id) => id == player_id,
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    player_id: u64,
    event_tx: &mpsc::Sender<GameEvent>,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    invalid_json: &mut u32,
    last_event_full_log: &mut Instant,
    last_invalid_msg_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(parsed) => match to_game_event(player_id, parsed) {
                        Some(event) => {
                            forward_game_event(player_id, event_tx, event, last_event_full_log)
                        }
                        None => {
                            // Oversized payloads are dropped, not fatal.
                            if should_log(last_invalid_msg_log) {
                                warn!(player_id, "oversized payload; dropping");
                            }
                            Ok(LoopControl::Continue)
                        }
                    },
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_msg_log) {
                            warn!(
                                player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_frame(
    bytes: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let bytes_len = bytes.len();
    match socket.send(Message::Text(bytes)).await.map_err(NetError::Ws) {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send frame");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(
    player_id: u64,
    event_tx: &mpsc::Sender<GameEvent>,
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_json: u32,
) -> Result<(), NetError> {
    // Leaving releases any quiz lock the player still held.
    event_tx
        .send(GameEvent::Leave { player_id })
        .await
        .map_err(|_| NetError::EventsClosed)?;

    debug!(
        player_id,
        msgs_in, msgs_out, bytes_in, bytes_out, invalid_json, "connection stats"
    );
    info!(player_id, "client disconnected");
    Ok(())
}
