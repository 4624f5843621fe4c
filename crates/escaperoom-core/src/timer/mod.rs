mod display;
mod engine;

pub use display::{format_remaining, EXPIRED_DISPLAY};
pub use engine::{CountdownTimer, TimerState, TimerTick, DEFAULT_TICK_INTERVAL_MS};
