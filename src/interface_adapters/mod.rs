// Interface adapters: wire protocol DTOs and WebSocket plumbing.

pub mod ids;
pub mod net;
pub mod protocol;
pub mod state;
