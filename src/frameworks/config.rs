use crate::use_cases::game::SessionSettings;
use std::{env, time::Duration};

// Runtime/server constants (not gameplay content).

pub fn http_port() -> u16 {
    env::var("PLANET_RUSH_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

/// How long a lock holder has to answer before the quiz expires.
pub fn quiz_time_limit() -> Duration {
    let millis = env::var("QUIZ_TIME_LIMIT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(15_000);
    Duration::from_millis(millis)
}

/// How long the finished phase lingers before the next cycle begins.
pub fn reset_delay() -> Duration {
    let millis = env::var("RESET_DELAY_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(10_000);
    Duration::from_millis(millis)
}

pub const EVENT_CHANNEL_CAPACITY: usize = 1024;
pub const OUTBOUND_BROADCAST_CAPACITY: usize = 256;

pub fn session_settings() -> SessionSettings {
    SessionSettings {
        event_channel_capacity: EVENT_CHANNEL_CAPACITY,
        outbound_channel_capacity: OUTBOUND_BROADCAST_CAPACITY,
        quiz_time_limit: quiz_time_limit(),
        reset_delay: reset_delay(),
    }
}
