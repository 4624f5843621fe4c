//! Access gate: the keypad that guards the puzzle.
//!
//! Digits accumulate up to [`CODE_WIDTH`]; `submit()` compares the entry with
//! the secret exactly. Unlocking is one-way. Failed attempts are unlimited
//! and carry no penalty beyond clearing the entry.

use serde::{Deserialize, Serialize};

/// Number of digits in an access code.
pub const CODE_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateOutcome {
    Success,
    Failure,
}

/// One key on the keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeypadKey {
    Digit(char),
    Clear,
    Enter,
}

impl KeypadKey {
    /// Map a typed character onto the keypad. `c` clears, `#` submits.
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '0'..='9' => Some(KeypadKey::Digit(ch)),
            'c' | 'C' => Some(KeypadKey::Clear),
            '#' => Some(KeypadKey::Enter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccessGate {
    secret: String,
    entered: String,
    unlocked: bool,
}

impl AccessGate {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            entered: String::with_capacity(CODE_WIDTH),
            unlocked: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// How many digits are currently entered.
    pub fn filled(&self) -> usize {
        self.entered.len()
    }

    pub fn entered(&self) -> &str {
        &self.entered
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Returns `true` if the digit was taken.
    pub fn append_digit(&mut self, digit: char) -> bool {
        if self.unlocked || !digit.is_ascii_digit() || self.entered.len() >= CODE_WIDTH {
            return false;
        }
        self.entered.push(digit);
        true
    }

    pub fn clear(&mut self) {
        if self.unlocked {
            return;
        }
        self.entered.clear();
    }

    pub fn submit(&mut self) -> GateOutcome {
        if self.unlocked {
            return GateOutcome::Success;
        }
        if self.entered == self.secret {
            self.unlocked = true;
            tracing::info!("access gate unlocked");
            GateOutcome::Success
        } else {
            tracing::debug!(filled = self.entered.len(), "access code rejected");
            self.entered.clear();
            GateOutcome::Failure
        }
    }
}
