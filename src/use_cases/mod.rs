// Use cases layer: the session state machine and the task that drives it.

pub mod game;
pub mod session;
pub mod types;

pub use game::{SessionSettings, session_task};
pub use session::GameSession;
pub use types::{
    GameEvent, GameSnapshot, Outbound, Phase, PlanetSnapshot, PlayerSnapshot, Reaction,
    SessionEvent, Target, TimerOp,
};
