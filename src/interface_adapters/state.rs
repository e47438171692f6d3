use crate::interface_adapters::net::Frame;
use crate::use_cases::types::GameEvent;
use tokio::sync::{broadcast, mpsc};

/// Channel handles shared with the router: everything a connection needs to
/// talk to the single game session.
#[derive(Clone)]
pub struct AppState {
    // Inbound events flowing from connections into the session task.
    pub event_tx: mpsc::Sender<GameEvent>,
    // Serialized outbound frames, shared across all connections.
    pub frame_tx: broadcast::Sender<Frame>,
}
