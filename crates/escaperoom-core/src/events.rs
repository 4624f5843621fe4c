use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerState;

/// Derived outcome of a puzzle. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleOutcome {
    InProgress,
    Victory,
    TimedOut,
}

impl PuzzleOutcome {
    pub fn is_terminal(self) -> bool {
        self != PuzzleOutcome::InProgress
    }
}

/// Every state change in a session produces an Event.
/// Front ends may log or print them; the core does not consume them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    DigitEntered {
        filled: usize,
        at: DateTime<Utc>,
    },
    PinCleared {
        at: DateTime<Utc>,
    },
    PinRejected {
        at: DateTime<Utc>,
    },
    Unlocked {
        at: DateTime<Utc>,
    },
    TimerStarted {
        duration_ms: u64,
        ends_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    TimerExpired {
        at: DateTime<Utc>,
    },
    /// Countdown stopped because the puzzle was won.
    TimerCancelled {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    SectorRejected {
        index: usize,
        at: DateTime<Utc>,
    },
    SectorUnlocked {
        index: usize,
        solved_count: usize,
        at: DateTime<Utc>,
    },
    AllSectorsSolved {
        at: DateTime<Utc>,
    },
    /// The victory screen was shown after its presentation delay.
    VictoryPresented {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        outcome: PuzzleOutcome,
        unlocked: bool,
        timer_state: TimerState,
        remaining_ms: u64,
        display: String,
        solved: Vec<bool>,
        at: DateTime<Utc>,
    },
}
