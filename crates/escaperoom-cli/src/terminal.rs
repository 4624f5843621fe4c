//! Plain terminal presenter.
//!
//! The countdown is redrawn in place with a carriage return; everything else
//! starts on a fresh line. Audio cues map to the terminal bell where that
//! makes sense and are otherwise only logged.

use std::io::Write;

use escaperoom_core::{Cue, PresentError, PresentResult, Presenter, Sector, SectorMeta, CODE_WIDTH};

pub struct TerminalPresenter<W: Write> {
    out: W,
    sectors: Vec<SectorMeta>,
    /// The cursor sits on a partially drawn line (timer or PIN dots).
    mid_line: bool,
    ambient_volume: f64,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W, sectors: Vec<SectorMeta>) -> Self {
        Self {
            out,
            sectors,
            mid_line: false,
            ambient_volume: 1.0,
        }
    }

    fn redraw(&mut self, text: &str) -> PresentResult {
        write!(self.out, "\r{text}").map_err(unavailable)?;
        self.mid_line = true;
        self.out.flush().map_err(unavailable)
    }

    fn line(&mut self, text: &str) -> PresentResult {
        if self.mid_line {
            writeln!(self.out).map_err(unavailable)?;
            self.mid_line = false;
        }
        writeln!(self.out, "{text}").map_err(unavailable)?;
        self.out.flush().map_err(unavailable)
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn render_pin_progress(&mut self, filled: usize) -> PresentResult {
        let dots: Vec<&str> = (0..CODE_WIDTH)
            .map(|i| if i < filled { "*" } else { "_" })
            .collect();
        self.redraw(&format!("ACCESS CODE  {}", dots.join(" ")))
    }

    fn render_unlock_transition(&mut self) -> PresentResult {
        self.line(">> ACCESS GRANTED")?;
        let panels: Vec<String> = self
            .sectors
            .iter()
            .enumerate()
            .map(|(i, meta)| {
                let title = if meta.label.is_empty() {
                    format!("SECTOR {}", i + 1)
                } else {
                    meta.label.clone()
                };
                format!("  [{}] {title:<12} {}", i + 1, meta.placeholder)
            })
            .collect();
        for panel in panels {
            self.line(&panel)?;
        }
        self.line("Enter answers as '<sector> <answer>'.")
    }

    fn render_timer_text(&mut self, text: &str) -> PresentResult {
        self.redraw(&format!("T-MINUS {text}"))
    }

    fn render_timer_critical(&mut self) -> PresentResult {
        self.line("!! TIME CRITICAL !!")
    }

    fn render_sector_unlocked(&mut self, index: usize, sector: &Sector) -> PresentResult {
        let icon = &sector.meta().icon;
        self.line(&format!("SECTOR {} [{icon}] {}", index + 1, sector.status()))
    }

    fn render_victory(&mut self, final_code: &str) -> PresentResult {
        self.line("*** ALL SECTORS BYPASSED ***")?;
        self.line(&format!("FINAL CODE: {final_code}"))
    }

    fn render_timeout(&mut self) -> PresentResult {
        self.line("*** TIME EXPIRED - LOCKDOWN ENGAGED ***")
    }

    fn play_cue(&mut self, cue: Cue) -> PresentResult {
        match cue {
            Cue::Ambient => tracing::debug!(%cue, volume = self.ambient_volume, "cue"),
            _ => tracing::debug!(%cue, "cue"),
        }
        match cue {
            Cue::Fail | Cue::AlarmStart => {
                write!(self.out, "\x07").map_err(|e| PresentError::PlaybackRejected(e.to_string()))?;
                self.out
                    .flush()
                    .map_err(|e| PresentError::PlaybackRejected(e.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn set_cue_volume(&mut self, cue: Cue, volume: f64) -> PresentResult {
        if cue == Cue::Ambient {
            self.ambient_volume = volume.clamp(0.0, 1.0);
        }
        Ok(())
    }
}

fn unavailable(err: std::io::Error) -> PresentError {
    PresentError::Unavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use escaperoom_core::Config;

    fn presenter() -> TerminalPresenter<Vec<u8>> {
        let metas = Config::default()
            .sector_tracker()
            .sectors()
            .iter()
            .map(|s| s.meta().clone())
            .collect();
        TerminalPresenter::new(Vec::new(), metas)
    }

    fn output(p: &TerminalPresenter<Vec<u8>>) -> String {
        String::from_utf8_lossy(&p.out).to_string()
    }

    #[test]
    fn pin_progress_shows_filled_slots() {
        let mut p = presenter();
        p.render_pin_progress(2).unwrap();
        assert_eq!(output(&p), "\rACCESS CODE  * * _ _");
    }

    #[test]
    fn lines_break_after_timer_redraw() {
        let mut p = presenter();
        p.render_timer_text("00:00:00").unwrap();
        p.render_timeout().unwrap();
        assert_eq!(
            output(&p),
            "\rT-MINUS 00:00:00\n*** TIME EXPIRED - LOCKDOWN ENGAGED ***\n"
        );
    }

    #[test]
    fn unlock_lists_sector_panels() {
        let mut p = presenter();
        p.render_unlock_transition().unwrap();
        let out = output(&p);
        assert!(out.contains("[1] SECTOR 1"));
        assert!(out.contains("[4] SECTOR 4"));
        assert!(out.contains("OVERRIDE"));
    }

    #[test]
    fn alarm_rings_the_bell() {
        let mut p = presenter();
        p.play_cue(Cue::Click).unwrap();
        p.play_cue(Cue::AlarmStart).unwrap();
        assert_eq!(output(&p), "\x07");
    }

    #[test]
    fn ambient_volume_is_kept_for_playback() {
        let mut p = presenter();
        p.set_cue_volume(Cue::Ambient, 0.3).unwrap();
        p.set_cue_volume(Cue::Click, 0.9).unwrap();
        p.play_cue(Cue::Ambient).unwrap();
        assert_eq!(p.ambient_volume, 0.3);
        assert_eq!(output(&p), "");
    }
}
