//! Countdown engine implementation.
//!
//! The countdown is a wall-clock-anchored state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()`
//! periodically and supplying the current time.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Expired | Cancelled)
//! ```
//!
//! The end timestamp is fixed at `start()`. Remaining time is always
//! `end - now`, so late or skipped ticks never skew the display.
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = CountdownTimer::new(Duration::minutes(40));
//! timer.start(Utc::now());
//! // In a loop:
//! timer.tick(Utc::now()); // Returns Some(TimerTick::Expired) exactly once
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::display::{format_remaining, EXPIRED_DISPLAY};

/// Tick cadence used by front ends, fine enough for a hundredths display.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Expired,
    Cancelled,
}

impl TimerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TimerState::Expired | TimerState::Cancelled)
    }
}

/// Result of a tick on a running countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerTick {
    /// Still running; text to show.
    Display(String),
    /// Crossed the deadline on this tick. Carries the terminal display.
    Expired(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountdownTimer {
    duration_ms: u64,
    state: TimerState,
    #[serde(default)]
    end_at: Option<DateTime<Utc>>,
}

impl CountdownTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration_ms: duration.num_milliseconds().max(0) as u64,
            state: TimerState::Idle,
            end_at: None,
        }
    }

    pub fn from_minutes(minutes: u64) -> Self {
        Self::new(Duration::milliseconds(
            minutes.saturating_mul(60_000).min(i64::MAX as u64) as i64,
        ))
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn end_at(&self) -> Option<DateTime<Utc>> {
        self.end_at
    }

    /// Milliseconds left at `now`.
    ///
    /// The full duration before start, zero once expired, and the frozen
    /// remainder is not tracked for a cancelled timer (reported as zero).
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> u64 {
        match (self.state, self.end_at) {
            (TimerState::Idle, _) => self.duration_ms,
            (TimerState::Running, Some(end)) => (end - now).num_milliseconds().max(0) as u64,
            _ => 0,
        }
    }

    /// Current display text without advancing the state machine.
    pub fn display(&self, now: DateTime<Utc>) -> String {
        match self.state {
            TimerState::Expired => EXPIRED_DISPLAY.to_string(),
            _ => format_remaining(self.remaining_ms(now)),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Anchor the countdown at `now`. Returns `false` if it was not idle.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.state != TimerState::Idle {
            return false;
        }
        let end = now
            .checked_add_signed(Duration::milliseconds(
                self.duration_ms.min(i64::MAX as u64) as i64,
            ))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.state = TimerState::Running;
        self.end_at = Some(end);
        tracing::debug!(%end, duration_ms = self.duration_ms, "countdown started");
        true
    }

    /// Call periodically. Returns `None` unless running.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<TimerTick> {
        if self.state != TimerState::Running {
            return None;
        }
        let end = self.end_at?;
        let remaining = (end - now).num_milliseconds();
        if remaining > 0 {
            return Some(TimerTick::Display(format_remaining(remaining as u64)));
        }
        self.state = TimerState::Expired;
        tracing::info!(overshoot_ms = -remaining, "countdown expired");
        Some(TimerTick::Expired(EXPIRED_DISPLAY.to_string()))
    }

    /// Stop a running countdown. Returns `false` if it was not running.
    pub fn cancel(&mut self) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.state = TimerState::Cancelled;
        tracing::debug!("countdown cancelled");
        true
    }
}
