//! # Escape Room Core Library
//!
//! This library provides the core logic for a timed escape-room puzzle
//! controller. A participant opens the access gate with a four-digit code,
//! then has to crack four text sectors before the countdown runs out.
//!
//! All rendering and audio is left to the caller through the [`Presenter`]
//! trait, so the same core drives the terminal front end and the tests.
//!
//! ## Architecture
//!
//! - **Access Gate**: keypad entry and one-way unlock
//! - **Countdown Timer**: a wall-clock-anchored state machine that requires
//!   the caller to periodically invoke `tick()`
//! - **Sector Tracker**: four independent answers with an edge-triggered
//!   all-solved signal
//! - **Session**: the single-threaded dispatcher that sequences the three
//!
//! ## Key Components
//!
//! - [`PuzzleSession`]: command dispatcher owning the components
//! - [`CountdownTimer`]: countdown state machine
//! - [`Config`]: puzzle configuration
//! - [`Presenter`]: rendering/audio capability

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod gate;
pub mod presenter;
pub mod sectors;
pub mod session;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{ConfigError, CoreError, PresentError, ValidationError};
pub use events::{Event, PuzzleOutcome};
pub use gate::{AccessGate, GateOutcome, KeypadKey, CODE_WIDTH};
pub use presenter::{Cue, NullPresenter, PresentResult, Presenter};
pub use sectors::{Sector, SectorInput, SectorMeta, SectorTracker, SECTOR_COUNT};
pub use session::{Command, PuzzleSession};
pub use timer::{format_remaining, CountdownTimer, TimerState, TimerTick};
