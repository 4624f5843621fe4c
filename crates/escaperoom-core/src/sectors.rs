//! Sector tracker: the four independent text challenges.
//!
//! Sectors can be solved in any order. Each one flips to solved at most
//! once; the all-solved signal is edge-triggered and fires a single time no
//! matter how often completion is re-evaluated.

use serde::{Deserialize, Serialize};

/// Number of sectors in a puzzle.
pub const SECTOR_COUNT: usize = 4;

/// Status line shown on a solved sector.
pub const BYPASSED_STATUS: &str = "SYSTEM BYPASSED";

/// Cosmetic per-sector metadata. Not part of the matching logic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorMeta {
    pub label: String,
    pub placeholder: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sector {
    /// Stored uppercase.
    secret: String,
    solved: bool,
    current_input: String,
    meta: SectorMeta,
}

impl Sector {
    pub fn new(secret: &str, meta: SectorMeta) -> Self {
        Self {
            secret: normalize(secret),
            solved: false,
            current_input: String::new(),
            meta,
        }
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    pub fn current_input(&self) -> &str {
        &self.current_input
    }

    pub fn meta(&self) -> &SectorMeta {
        &self.meta
    }

    /// Status text for the sector panel.
    pub fn status(&self) -> &str {
        if self.solved {
            BYPASSED_STATUS
        } else {
            ""
        }
    }
}

/// What became of a submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorInput {
    /// Out of range, or the sector was already solved.
    Ignored,
    /// Did not match.
    Rejected { index: usize },
    /// Matched; the sector is now solved.
    Unlocked { index: usize, all_solved: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorTracker {
    sectors: Vec<Sector>,
    victory_signalled: bool,
}

impl SectorTracker {
    pub fn new(sectors: Vec<Sector>) -> Self {
        Self {
            sectors,
            victory_signalled: false,
        }
    }

    /// Build a tracker from bare answers with empty metadata.
    pub fn from_answers<S: AsRef<str>>(answers: &[S]) -> Self {
        Self::new(
            answers
                .iter()
                .map(|a| Sector::new(a.as_ref(), SectorMeta::default()))
                .collect(),
        )
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    pub fn sector(&self, index: usize) -> Option<&Sector> {
        self.sectors.get(index)
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn solved_flags(&self) -> Vec<bool> {
        self.sectors.iter().map(Sector::is_solved).collect()
    }

    pub fn solved_count(&self) -> usize {
        self.sectors.iter().filter(|s| s.solved).count()
    }

    pub fn all_solved(&self) -> bool {
        !self.sectors.is_empty() && self.sectors.iter().all(|s| s.solved)
    }

    pub fn victory_signalled(&self) -> bool {
        self.victory_signalled
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn submit_input(&mut self, index: usize, raw: &str) -> SectorInput {
        let Some(sector) = self.sectors.get_mut(index) else {
            tracing::debug!(index, "sector index out of range");
            return SectorInput::Ignored;
        };
        if sector.solved {
            return SectorInput::Ignored;
        }
        sector.current_input = raw.to_string();
        if normalize(raw) != sector.secret {
            return SectorInput::Rejected { index };
        }
        sector.solved = true;
        tracing::info!(index, "sector unlocked");
        SectorInput::Unlocked {
            index,
            all_solved: self.all_solved(),
        }
    }

    /// Returns `true` only on the first call that sees every sector solved.
    pub fn take_victory_signal(&mut self) -> bool {
        if self.victory_signalled || !self.all_solved() {
            return false;
        }
        self.victory_signalled = true;
        true
    }
}

fn normalize(text: &str) -> String {
    text.to_uppercase()
}
