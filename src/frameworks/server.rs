// Framework bootstrap for the game server runtime.

use crate::frameworks::config;
use crate::interface_adapters::net::{Frame, outbound_serializer, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::game::{SessionSettings, session_task};
use crate::use_cases::types::{GameEvent, Outbound};

use axum::{Router, routing::get};
use std::io::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Wires the session task and serializer around the provided settings.
fn build_state(settings: SessionSettings) -> Arc<AppState> {
    // event_tx/rx: all client actions go to the single session task.
    let (event_tx, event_rx) = mpsc::channel::<GameEvent>(settings.event_channel_capacity);

    // outbound_tx/rx: typed session events out of the game loop.
    let (outbound_tx, _outbound_rx) =
        broadcast::channel::<Outbound>(settings.outbound_channel_capacity);

    // frame_tx/rx: serialized frames shared across all connections.
    let (frame_tx, _frame_rx) = broadcast::channel::<Frame>(settings.outbound_channel_capacity);

    tokio::spawn(outbound_serializer(outbound_tx.subscribe(), frame_tx.clone()));

    // The session task keeps an event sender so quiz and reset timers can
    // feed back into the same serialized queue.
    tokio::spawn(session_task(
        event_rx,
        outbound_tx,
        event_tx.clone(),
        settings,
    ));

    Arc::new(AppState { event_tx, frame_tx })
}

/// Serves the game on an already-bound listener; tests call this directly
/// with shortened timers.
pub async fn run(listener: tokio::net::TcpListener, settings: SessionSettings) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state(settings);

    let app = Router::new().route("/ws", get(ws_handler)).with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking.
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener, config::session_settings()).await
}
