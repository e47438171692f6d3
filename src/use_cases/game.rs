// The session task: the single owner of mutable game state. Drains the
// event queue one event at a time and interprets timer instructions, which
// is what gives the lock protocol its at-most-one-winner guarantee.

use crate::use_cases::session::GameSession;
use crate::use_cases::types::{GameEvent, Outbound, TimerOp};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::debug;

/// Timing and capacity knobs for a session; tests shrink the durations.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Capacity for inbound game events.
    pub event_channel_capacity: usize,
    /// Capacity for broadcast outbound events and serialized frames.
    pub outbound_channel_capacity: usize,
    /// How long a lock holder has to answer before the quiz expires.
    pub quiz_time_limit: Duration,
    /// How long the finished phase lingers before the next cycle begins.
    pub reset_delay: Duration,
}

pub async fn session_task(
    mut event_rx: mpsc::Receiver<GameEvent>,
    outbound_tx: broadcast::Sender<Outbound>,
    event_tx: mpsc::Sender<GameEvent>,
    settings: SessionSettings,
) {
    let mut session = GameSession::new();
    // At most one live timer per planet; a new lock can only start once the
    // planet is back to open, so insertion never races an older timer.
    let mut quiz_timers: HashMap<String, JoinHandle<()>> = HashMap::new();

    while let Some(event) = event_rx.recv().await {
        let reaction = session.apply(event);

        // Timer instructions run before emissions so a cancelled expiry is
        // dead by the time anyone observes the resolution.
        for op in &reaction.timers {
            match op {
                TimerOp::CancelQuiz { planet } => {
                    if let Some(timer) = quiz_timers.remove(planet) {
                        timer.abort();
                    }
                }
                TimerOp::StartQuiz { planet, attempt } => {
                    let timer = spawn_quiz_timer(
                        event_tx.clone(),
                        planet.clone(),
                        *attempt,
                        settings.quiz_time_limit,
                    );
                    if let Some(previous) = quiz_timers.insert(planet.clone(), timer) {
                        previous.abort();
                    }
                }
                TimerOp::ScheduleReset => {
                    spawn_reset_timer(event_tx.clone(), settings.reset_delay);
                }
            }
        }

        for out in reaction.outbound {
            // No receivers just means nobody is connected right now.
            let _ = outbound_tx.send(out);
        }
    }

    debug!("event channel closed; session task exiting");
}

fn spawn_quiz_timer(
    event_tx: mpsc::Sender<GameEvent>,
    planet: String,
    attempt: u64,
    deadline: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(deadline).await;
        let _ = event_tx.send(GameEvent::QuizExpired { planet, attempt }).await;
    })
}

fn spawn_reset_timer(event_tx: mpsc::Sender<GameEvent>, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = event_tx.send(GameEvent::ResetDue).await;
    });
}
