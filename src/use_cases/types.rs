// Use-case level events flowing between the network layer and the session.

use crate::domain::player::PlayerId;
use std::collections::HashMap;

/// Inbound stimuli applied to the game session, one at a time.
#[derive(Debug, Clone)]
pub enum GameEvent {
    Join {
        player_id: PlayerId,
    },
    Leave {
        player_id: PlayerId,
    },
    Ready {
        player_id: PlayerId,
    },
    LockRequest {
        player_id: PlayerId,
        planet: String,
    },
    SubmitAnswer {
        player_id: PlayerId,
        planet: String,
        answer: String,
    },
    /// Sent by a quiz timer once its deadline passes.
    QuizExpired {
        planet: String,
        attempt: u64,
    },
    /// Sent by the reset timer once the finished phase has lingered.
    ResetDue,
}

/// Top-level game phase over a full cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub name: String,
    pub color: String,
    pub is_ready: bool,
}

#[derive(Debug, Clone)]
pub struct PlanetSnapshot {
    pub name: &'static str,
    pub claimed_by: Option<PlayerId>,
    pub is_locked: bool,
    pub points: u32,
}

/// Snapshot of the whole session, sent on connect and on reset. Quiz content
/// never appears here; questions travel only through `QuizStarted`.
#[derive(Debug, Clone)]
pub struct GameSnapshot {
    pub phase: Phase,
    pub players: HashMap<PlayerId, PlayerSnapshot>,
    pub planets: Vec<PlanetSnapshot>,
    pub scores: HashMap<PlayerId, u32>,
}

/// Events produced by the session for delivery to clients.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Welcome {
        player_id: PlayerId,
        snapshot: GameSnapshot,
    },
    RosterUpdate {
        players: HashMap<PlayerId, PlayerSnapshot>,
    },
    GameStarted,
    GameOver {
        winners: Vec<String>,
        scores: HashMap<PlayerId, u32>,
    },
    GameReset {
        snapshot: GameSnapshot,
    },
    PlanetClaimed {
        planet: String,
        claimed_by: PlayerId,
        player_name: String,
        player_color: String,
        points: u32,
    },
    ScoreUpdate {
        scores: HashMap<PlayerId, u32>,
    },
    PlanetLockChanged {
        planet: String,
        is_locked: bool,
    },
    QuizStarted {
        planet: String,
        question: &'static str,
        answers: [&'static str; 2],
    },
    QuizResult {
        correct: bool,
        fact: Option<&'static str>,
    },
    QuizTimeout,
}

/// Audience for an outbound session event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    One(PlayerId),
}

/// A session event paired with its audience.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub target: Target,
    pub event: SessionEvent,
}

/// Timer instructions produced by a state transition. Cancellation must be
/// interpreted in the same reaction that produced it, before any later event
/// for the same planet can be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerOp {
    StartQuiz { planet: String, attempt: u64 },
    CancelQuiz { planet: String },
    ScheduleReset,
}

/// Result of applying one event: ordered emissions plus timer instructions.
#[derive(Debug, Default)]
pub struct Reaction {
    pub outbound: Vec<Outbound>,
    pub timers: Vec<TimerOp>,
}

impl Reaction {
    pub fn to_all(&mut self, event: SessionEvent) {
        self.outbound.push(Outbound {
            target: Target::All,
            event,
        });
    }

    pub fn to_one(&mut self, player: PlayerId, event: SessionEvent) {
        self.outbound.push(Outbound {
            target: Target::One(player),
            event,
        });
    }
}
