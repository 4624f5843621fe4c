//! Presentation and audio capability.
//!
//! The core never draws or plays anything itself. It calls into a
//! [`Presenter`] on every visible transition; whatever sits behind it (a
//! terminal, a GUI, a test recorder) decides what that looks like. Sink
//! failures come back as [`PresentError`] and are logged, never propagated.

use serde::{Deserialize, Serialize};

use crate::error::PresentError;
use crate::sectors::Sector;

/// Sound cues. Fire-and-forget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cue {
    Click,
    Success,
    Fail,
    Unlock,
    AlarmStart,
    AlarmStop,
    /// Background loop, started on the first interaction.
    Ambient,
}

impl Cue {
    pub fn name(self) -> &'static str {
        match self {
            Cue::Click => "click",
            Cue::Success => "success",
            Cue::Fail => "fail",
            Cue::Unlock => "unlock",
            Cue::AlarmStart => "alarm-start",
            Cue::AlarmStop => "alarm-stop",
            Cue::Ambient => "ambient",
        }
    }
}

impl std::fmt::Display for Cue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub type PresentResult = Result<(), PresentError>;

pub trait Presenter {
    fn render_pin_progress(&mut self, filled: usize) -> PresentResult;
    fn render_unlock_transition(&mut self) -> PresentResult;
    fn render_timer_text(&mut self, text: &str) -> PresentResult;
    fn render_timer_critical(&mut self) -> PresentResult;
    fn render_sector_unlocked(&mut self, index: usize, sector: &Sector) -> PresentResult;
    fn render_victory(&mut self, final_code: &str) -> PresentResult;
    fn render_timeout(&mut self) -> PresentResult;
    fn play_cue(&mut self, cue: Cue) -> PresentResult;

    /// Playback level for a looping cue, `0.0..=1.0`. Sent before the cue
    /// first plays; sinks without volume control ignore it.
    fn set_cue_volume(&mut self, _cue: Cue, _volume: f64) -> PresentResult {
        Ok(())
    }
}

/// Presenter that discards everything. For headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn render_pin_progress(&mut self, _filled: usize) -> PresentResult {
        Ok(())
    }
    fn render_unlock_transition(&mut self) -> PresentResult {
        Ok(())
    }
    fn render_timer_text(&mut self, _text: &str) -> PresentResult {
        Ok(())
    }
    fn render_timer_critical(&mut self) -> PresentResult {
        Ok(())
    }
    fn render_sector_unlocked(&mut self, _index: usize, _sector: &Sector) -> PresentResult {
        Ok(())
    }
    fn render_victory(&mut self, _final_code: &str) -> PresentResult {
        Ok(())
    }
    fn render_timeout(&mut self) -> PresentResult {
        Ok(())
    }
    fn play_cue(&mut self, _cue: Cue) -> PresentResult {
        Ok(())
    }
}
