//! Puzzle session: the single-threaded dispatcher tying the gate, the
//! countdown and the sector tracker together.
//!
//! Every external trigger is a [`Command`]. `dispatch` runs it to completion,
//! calls the presenter for anything visible and returns the events produced.
//! Cross-component reactions (unlock starts the countdown, the last sector
//! cancels it) happen synchronously inside the same dispatch, so a tick can
//! never observe a won puzzle with a live countdown.

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::config::Config;
use crate::error::ValidationError;
use crate::events::{Event, PuzzleOutcome};
use crate::gate::{AccessGate, GateOutcome, KeypadKey};
use crate::presenter::{Cue, PresentResult, Presenter};
use crate::sectors::{SectorInput, SectorTracker};
use crate::timer::{CountdownTimer, TimerState, TimerTick};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Key(KeypadKey),
    SectorInput { index: usize, text: String },
    Tick,
    Snapshot,
    Teardown,
}

pub struct PuzzleSession<P: Presenter, C: Clock> {
    gate: AccessGate,
    timer: CountdownTimer,
    sectors: SectorTracker,
    final_code: String,
    victory_delay: Duration,
    audio_enabled: bool,
    ambient_volume: f64,
    // Presentation sequencing only.
    victory_due: Option<DateTime<Utc>>,
    victory_presented: bool,
    ambient_started: bool,
    torn_down: bool,
    presenter: P,
    clock: C,
}

impl<P: Presenter, C: Clock> PuzzleSession<P, C> {
    /// Build a session from a validated configuration.
    pub fn from_config(config: &Config, presenter: P, clock: C) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            gate: AccessGate::new(config.access_code.clone()),
            timer: CountdownTimer::from_minutes(config.duration_minutes),
            sectors: config.sector_tracker(),
            final_code: config.final_code.clone(),
            victory_delay: Duration::milliseconds(
                config.timing.victory_delay_ms.min(i64::MAX as u64) as i64,
            ),
            audio_enabled: config.audio.enabled,
            ambient_volume: config.audio.ambient_volume,
            victory_due: None,
            victory_presented: false,
            ambient_started: false,
            torn_down: false,
            presenter,
            clock,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn timer(&self) -> &CountdownTimer {
        &self.timer
    }

    pub fn sectors(&self) -> &SectorTracker {
        &self.sectors
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn outcome(&self) -> PuzzleOutcome {
        if self.sectors.all_solved() {
            PuzzleOutcome::Victory
        } else if self.timer.state() == TimerState::Expired {
            PuzzleOutcome::TimedOut
        } else {
            PuzzleOutcome::InProgress
        }
    }

    /// Whether the front end should keep its periodic tick alive.
    pub fn needs_tick(&self) -> bool {
        !self.torn_down && (self.timer.is_running() || self.victory_pending())
    }

    /// A victory has been declared but its screen has not been shown yet.
    pub fn victory_pending(&self) -> bool {
        self.victory_due.is_some() && !self.victory_presented
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn snapshot(&self) -> Event {
        let now = self.clock.now();
        Event::StateSnapshot {
            outcome: self.outcome(),
            unlocked: self.gate.is_unlocked(),
            timer_state: self.timer.state(),
            remaining_ms: self.timer.remaining_ms(now),
            display: self.timer.display(now),
            solved: self.sectors.solved_flags(),
            at: now,
        }
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    pub fn dispatch(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        if self.torn_down {
            return events;
        }
        let now = self.clock.now();
        match command {
            Command::Key(key) => self.on_key(key, now, &mut events),
            Command::SectorInput { index, text } => {
                self.on_sector_input(index, &text, now, &mut events)
            }
            Command::Tick => self.on_tick(now, &mut events),
            Command::Snapshot => events.push(self.snapshot()),
            Command::Teardown => {
                tracing::debug!(outcome = ?self.outcome(), "session torn down");
                self.torn_down = true;
            }
        }
        events
    }

    fn on_key(&mut self, key: KeypadKey, now: DateTime<Utc>, events: &mut Vec<Event>) {
        if self.gate.is_unlocked() {
            return;
        }
        self.start_ambient();
        self.cue(Cue::Click);
        match key {
            KeypadKey::Digit(d) => {
                if self.gate.append_digit(d) {
                    events.push(Event::DigitEntered {
                        filled: self.gate.filled(),
                        at: now,
                    });
                }
            }
            KeypadKey::Clear => {
                self.gate.clear();
                events.push(Event::PinCleared { at: now });
            }
            KeypadKey::Enter => match self.gate.submit() {
                GateOutcome::Success => {
                    self.cue(Cue::Success);
                    self.on_unlocked(now, events);
                    return;
                }
                GateOutcome::Failure => {
                    self.cue(Cue::Fail);
                    events.push(Event::PinRejected { at: now });
                }
            },
        }
        let result = self.presenter.render_pin_progress(self.gate.filled());
        absorb(result, "render_pin_progress");
    }

    fn on_unlocked(&mut self, now: DateTime<Utc>, events: &mut Vec<Event>) {
        absorb(
            self.presenter.render_unlock_transition(),
            "render_unlock_transition",
        );
        events.push(Event::Unlocked { at: now });
        if self.timer.start(now) {
            events.push(Event::TimerStarted {
                duration_ms: self.timer.duration_ms(),
                ends_at: self.timer.end_at().unwrap_or(now),
                at: now,
            });
            self.advance_timer(now, events);
        }
    }

    fn on_sector_input(
        &mut self,
        index: usize,
        text: &str,
        now: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) {
        if !self.gate.is_unlocked() || self.outcome().is_terminal() {
            return;
        }
        self.start_ambient();
        match self.sectors.submit_input(index, text) {
            SectorInput::Ignored => {}
            SectorInput::Rejected { index } => {
                events.push(Event::SectorRejected { index, at: now });
            }
            SectorInput::Unlocked { index, .. } => {
                self.cue(Cue::Unlock);
                if let Some(sector) = self.sectors.sector(index) {
                    absorb(
                        self.presenter.render_sector_unlocked(index, sector),
                        "render_sector_unlocked",
                    );
                }
                events.push(Event::SectorUnlocked {
                    index,
                    solved_count: self.sectors.solved_count(),
                    at: now,
                });
                if self.sectors.take_victory_signal() {
                    self.on_all_solved(now, events);
                }
            }
        }
    }

    fn on_all_solved(&mut self, now: DateTime<Utc>, events: &mut Vec<Event>) {
        let remaining_ms = self.timer.remaining_ms(now);
        if self.timer.cancel() {
            events.push(Event::TimerCancelled {
                remaining_ms,
                at: now,
            });
        }
        self.cue(Cue::AlarmStop);
        events.push(Event::AllSectorsSolved { at: now });
        tracing::info!(remaining_ms, "all sectors solved");
        self.victory_due = Some(
            now.checked_add_signed(self.victory_delay)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        );
        self.present_victory_if_due(now, events);
    }

    fn on_tick(&mut self, now: DateTime<Utc>, events: &mut Vec<Event>) {
        self.present_victory_if_due(now, events);
        self.advance_timer(now, events);
    }

    fn advance_timer(&mut self, now: DateTime<Utc>, events: &mut Vec<Event>) {
        match self.timer.tick(now) {
            None => {}
            Some(TimerTick::Display(text)) => {
                absorb(self.presenter.render_timer_text(&text), "render_timer_text");
            }
            Some(TimerTick::Expired(text)) => {
                absorb(self.presenter.render_timer_text(&text), "render_timer_text");
                absorb(
                    self.presenter.render_timer_critical(),
                    "render_timer_critical",
                );
                self.cue(Cue::AlarmStart);
                absorb(self.presenter.render_timeout(), "render_timeout");
                events.push(Event::TimerExpired { at: now });
            }
        }
    }

    fn present_victory_if_due(&mut self, now: DateTime<Utc>, events: &mut Vec<Event>) {
        let Some(due) = self.victory_due else {
            return;
        };
        if self.victory_presented || now < due {
            return;
        }
        self.victory_presented = true;
        absorb(
            self.presenter.render_victory(&self.final_code),
            "render_victory",
        );
        events.push(Event::VictoryPresented { at: now });
    }

    fn start_ambient(&mut self) {
        if self.ambient_started {
            return;
        }
        self.ambient_started = true;
        if self.audio_enabled {
            absorb(
                self.presenter.set_cue_volume(Cue::Ambient, self.ambient_volume),
                "set_cue_volume",
            );
        }
        self.cue(Cue::Ambient);
    }

    fn cue(&mut self, cue: Cue) {
        if !self.audio_enabled {
            return;
        }
        if let Err(err) = self.presenter.play_cue(cue) {
            tracing::warn!(%cue, error = %err, "audio cue failed");
        }
    }
}

fn absorb(result: PresentResult, sink: &'static str) {
    if let Err(err) = result {
        tracing::warn!(sink, error = %err, "presentation sink failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::presenter::recording::{Call, RecordingPresenter};

    type Session = PuzzleSession<RecordingPresenter, ManualClock>;

    fn session_with(config: Config) -> Session {
        PuzzleSession::from_config(&config, RecordingPresenter::default(), ManualClock::default())
            .unwrap()
    }

    fn session() -> Session {
        session_with(Config::default())
    }

    fn type_code(s: &mut Session, code: &str) -> Vec<Event> {
        let mut events = Vec::new();
        for ch in code.chars() {
            events.extend(s.dispatch(Command::Key(KeypadKey::Digit(ch))));
        }
        events.extend(s.dispatch(Command::Key(KeypadKey::Enter)));
        events
    }

    fn answer(s: &mut Session, index: usize, text: &str) -> Vec<Event> {
        s.dispatch(Command::SectorInput {
            index,
            text: text.into(),
        })
    }

    fn solve_all(s: &mut Session) -> Vec<Event> {
        let mut events = Vec::new();
        for (i, text) in ["1225", "fusion", "tesla", "2397"].iter().enumerate() {
            let index = [3, 1, 0, 2][i];
            events.extend(answer(s, index, text));
        }
        events
    }

    fn count<F: Fn(&Event) -> bool>(events: &[Event], pred: F) -> usize {
        events.iter().filter(|e| pred(e)).count()
    }

    #[test]
    fn wrong_code_keeps_gate_locked() {
        let mut s = session();
        let events = type_code(&mut s, "1234");
        assert!(!s.gate().is_unlocked());
        assert_eq!(s.gate().filled(), 0);
        assert_eq!(s.timer().state(), TimerState::Idle);
        assert!(events.iter().any(|e| matches!(e, Event::PinRejected { .. })));
        assert!(s.presenter().cues().contains(&Cue::Fail));
        assert_eq!(s.presenter().calls.last(), Some(&Call::PinProgress(0)));
    }

    #[test]
    fn unlock_starts_countdown_once() {
        let mut s = session();
        let events = type_code(&mut s, "4345");
        assert!(s.gate().is_unlocked());
        assert_eq!(s.timer().state(), TimerState::Running);
        assert_eq!(count(&events, |e| matches!(e, Event::TimerStarted { .. })), 1);
        assert_eq!(s.presenter().last_timer_text(), Some("40:00:00"));

        s.clock().advance_ms(10_000);
        let again = s.dispatch(Command::Key(KeypadKey::Enter));
        assert!(again.is_empty());
        assert_eq!(
            s.timer().end_at(),
            Some(DateTime::<Utc>::UNIX_EPOCH + Duration::minutes(40))
        );
    }

    #[test]
    fn sector_input_ignored_while_locked() {
        let mut s = session();
        assert!(answer(&mut s, 0, "tesla").is_empty());
        assert!(!s.sectors().sector(0).unwrap().is_solved());
    }

    #[test]
    fn first_interaction_starts_ambient_once() {
        let mut s = session();
        type_code(&mut s, "43");
        type_code(&mut s, "4345");
        let ambient = s
            .presenter()
            .cues()
            .iter()
            .filter(|c| **c == Cue::Ambient)
            .count();
        assert_eq!(ambient, 1);
        assert_eq!(s.presenter().cues()[0], Cue::Ambient);
    }

    #[test]
    fn victory_scenario() {
        let mut s = session();
        type_code(&mut s, "4345");

        let events = answer(&mut s, 0, "tesla");
        assert!(s.sectors().sector(0).unwrap().is_solved());
        assert!(s.presenter().cues().contains(&Cue::Unlock));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::SectorUnlocked { index: 0, solved_count: 1, .. })));
        assert_eq!(s.outcome(), PuzzleOutcome::InProgress);

        s.clock().advance_ms(5 * 60 * 1000);
        s.dispatch(Command::Tick);

        let mut events = answer(&mut s, 1, "Fusion");
        events.extend(answer(&mut s, 3, "1225"));
        events.extend(answer(&mut s, 2, "2397"));
        // Re-submitting after victory changes nothing.
        events.extend(answer(&mut s, 2, "2397"));

        assert_eq!(s.outcome(), PuzzleOutcome::Victory);
        assert_eq!(s.timer().state(), TimerState::Cancelled);
        assert_eq!(count(&events, |e| matches!(e, Event::AllSectorsSolved { .. })), 1);
        assert_eq!(count(&events, |e| matches!(e, Event::TimerCancelled { .. })), 1);
        assert!(s.presenter().cues().contains(&Cue::AlarmStop));
        assert!(s.victory_pending());
        assert!(s.needs_tick());
    }

    #[test]
    fn victory_screen_waits_for_delay() {
        let mut s = session();
        type_code(&mut s, "4345");
        solve_all(&mut s);
        assert_eq!(s.presenter().count(&Call::Victory("TINY TOOLBOX".into())), 0);

        s.clock().advance_ms(999);
        assert!(s.dispatch(Command::Tick).is_empty());

        s.clock().advance_ms(1);
        let events = s.dispatch(Command::Tick);
        assert_eq!(count(&events, |e| matches!(e, Event::VictoryPresented { .. })), 1);
        assert!(!s.needs_tick());

        s.clock().advance_ms(5_000);
        assert!(s.dispatch(Command::Tick).is_empty());
        assert_eq!(s.presenter().count(&Call::Victory("TINY TOOLBOX".into())), 1);
    }

    #[test]
    fn zero_delay_presents_victory_immediately() {
        let mut cfg = Config::default();
        cfg.timing.victory_delay_ms = 0;
        let mut s = session_with(cfg);
        type_code(&mut s, "4345");
        let events = solve_all(&mut s);
        assert_eq!(count(&events, |e| matches!(e, Event::VictoryPresented { .. })), 1);
        assert!(!s.victory_pending());
    }

    #[test]
    fn no_expiry_after_victory() {
        let mut cfg = Config::default();
        cfg.duration_minutes = 1;
        let mut s = session_with(cfg);
        type_code(&mut s, "4345");
        s.clock().advance_ms(59_000);
        solve_all(&mut s);

        s.clock().advance_ms(10 * 60 * 1000);
        let events = s.dispatch(Command::Tick);
        assert_eq!(count(&events, |e| matches!(e, Event::TimerExpired { .. })), 0);
        assert!(!s.presenter().cues().contains(&Cue::AlarmStart));
        assert_eq!(s.presenter().count(&Call::Timeout), 0);
        assert_eq!(s.outcome(), PuzzleOutcome::Victory);
    }

    #[test]
    fn late_solve_beats_unticked_deadline() {
        let mut cfg = Config::default();
        cfg.duration_minutes = 1;
        let mut s = session_with(cfg);
        type_code(&mut s, "4345");
        answer(&mut s, 0, "tesla");
        answer(&mut s, 1, "fusion");
        answer(&mut s, 2, "2397");

        // The deadline passes with no tick in between.
        s.clock().advance_ms(61_000);
        let events = answer(&mut s, 3, "1225");
        assert_eq!(count(&events, |e| matches!(e, Event::AllSectorsSolved { .. })), 1);
        assert_eq!(count(&events, |e| matches!(e, Event::TimerCancelled { .. })), 1);
        assert_eq!(s.timer().state(), TimerState::Cancelled);

        let events = s.dispatch(Command::Tick);
        assert_eq!(count(&events, |e| matches!(e, Event::TimerExpired { .. })), 0);
        assert_eq!(s.presenter().count(&Call::Timeout), 0);
        assert!(!s.presenter().cues().contains(&Cue::AlarmStart));
        assert_eq!(s.outcome(), PuzzleOutcome::Victory);
    }

    #[test]
    fn timeout_scenario() {
        let mut cfg = Config::default();
        cfg.duration_minutes = 1;
        let mut s = session_with(cfg);
        type_code(&mut s, "4345");

        let mut expired = 0;
        for _ in 0..2_000 {
            s.clock().advance_ms(31);
            let events = s.dispatch(Command::Tick);
            expired += count(&events, |e| matches!(e, Event::TimerExpired { .. }));
        }
        assert_eq!(expired, 1);
        assert_eq!(s.timer().state(), TimerState::Expired);
        assert_eq!(s.outcome(), PuzzleOutcome::TimedOut);
        assert_eq!(s.presenter().last_timer_text(), Some("00:00:00"));
        assert_eq!(s.presenter().count(&Call::TimerCritical), 1);
        assert_eq!(s.presenter().count(&Call::Timeout), 1);
        assert_eq!(
            s.presenter().cues().iter().filter(|c| **c == Cue::AlarmStart).count(),
            1
        );
        assert!(!s.needs_tick());

        // The puzzle is over; late answers are ignored.
        assert!(answer(&mut s, 0, "tesla").is_empty());
        assert_eq!(s.outcome(), PuzzleOutcome::TimedOut);
    }

    #[test]
    fn audio_failures_do_not_block_transitions() {
        let mut s = session();
        s.presenter_mut().fail_audio = true;
        type_code(&mut s, "4345");
        assert!(s.gate().is_unlocked());
        solve_all(&mut s);
        assert_eq!(s.outcome(), PuzzleOutcome::Victory);
        assert_eq!(s.timer().state(), TimerState::Cancelled);
    }

    #[test]
    fn render_failures_do_not_block_transitions() {
        let mut s = session();
        s.presenter_mut().fail_render = true;
        type_code(&mut s, "4345");
        assert!(s.gate().is_unlocked());
        assert_eq!(s.timer().state(), TimerState::Running);
        assert_eq!(s.presenter().count(&Call::UnlockTransition), 1);

        let events = answer(&mut s, 0, "tesla");
        assert!(s.sectors().sector(0).unwrap().is_solved());
        assert_eq!(count(&events, |e| matches!(e, Event::SectorUnlocked { .. })), 1);

        answer(&mut s, 1, "fusion");
        answer(&mut s, 2, "2397");
        answer(&mut s, 3, "1225");
        s.clock().advance_ms(1_000);
        let events = s.dispatch(Command::Tick);
        assert_eq!(count(&events, |e| matches!(e, Event::VictoryPresented { .. })), 1);
        assert_eq!(s.outcome(), PuzzleOutcome::Victory);

        let mut cfg = Config::default();
        cfg.duration_minutes = 1;
        let mut s = session_with(cfg);
        s.presenter_mut().fail_render = true;
        type_code(&mut s, "4345");
        s.clock().advance_ms(60_000);
        let events = s.dispatch(Command::Tick);
        assert_eq!(count(&events, |e| matches!(e, Event::TimerExpired { .. })), 1);
        assert_eq!(s.presenter().count(&Call::TimerCritical), 1);
        assert_eq!(s.presenter().count(&Call::Timeout), 1);
        assert!(s.presenter().cues().contains(&Cue::AlarmStart));
        assert_eq!(s.outcome(), PuzzleOutcome::TimedOut);
    }

    #[test]
    fn ambient_volume_sent_before_first_cue() {
        let mut cfg = Config::default();
        cfg.audio.ambient_volume = 0.3;
        let mut s = session_with(cfg);
        type_code(&mut s, "4");
        type_code(&mut s, "4345");
        assert_eq!(s.presenter().calls[0], Call::Volume(Cue::Ambient, 30));
        assert_eq!(s.presenter().calls[1], Call::Cue(Cue::Ambient));
        assert_eq!(s.presenter().count(&Call::Volume(Cue::Ambient, 30)), 1);
    }

    #[test]
    fn muted_audio_plays_no_cues() {
        let mut cfg = Config::default();
        cfg.audio.enabled = false;
        let mut s = session_with(cfg);
        type_code(&mut s, "4345");
        solve_all(&mut s);
        assert!(s.presenter().cues().is_empty());
        assert!(!s.presenter().calls.iter().any(|c| matches!(c, Call::Volume(..))));
    }

    #[test]
    fn teardown_stops_ticking() {
        let mut s = session();
        type_code(&mut s, "4345");
        assert!(s.needs_tick());
        s.dispatch(Command::Teardown);
        assert!(!s.needs_tick());
        s.clock().advance_ms(41 * 60 * 1000);
        assert!(s.dispatch(Command::Tick).is_empty());
    }

    #[test]
    fn snapshot_reports_progress() {
        let mut s = session();
        type_code(&mut s, "4345");
        answer(&mut s, 2, "2397");
        s.clock().advance_ms(60_000);
        match s.dispatch(Command::Snapshot).pop() {
            Some(Event::StateSnapshot {
                outcome,
                unlocked,
                timer_state,
                remaining_ms,
                display,
                solved,
                ..
            }) => {
                assert_eq!(outcome, PuzzleOutcome::InProgress);
                assert!(unlocked);
                assert_eq!(timer_state, TimerState::Running);
                assert_eq!(remaining_ms, 39 * 60 * 1000);
                assert_eq!(display, "39:00:00");
                assert_eq!(solved, vec![false, false, true, false]);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = Config::default();
        cfg.access_code = "12".into();
        let result = PuzzleSession::from_config(
            &cfg,
            RecordingPresenter::default(),
            ManualClock::default(),
        );
        assert!(result.is_err());
    }
}
