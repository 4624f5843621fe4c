use std::io::BufRead;
use std::path::Path;
use std::time::Duration;

use clap::Args;
use escaperoom_core::{
    Clock, Command, Event, KeypadKey, NullPresenter, Presenter, PuzzleSession, SystemClock,
};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::load_config;
use crate::terminal::TerminalPresenter;

const INPUT_CHANNEL_CAPACITY: usize = 64;

#[derive(Args)]
pub struct PlayArgs {
    /// Override the countdown length
    #[arg(long)]
    duration_minutes: Option<u64>,
    /// Print events as JSON lines instead of drawing the puzzle
    #[arg(long)]
    json: bool,
}

/// One line of player input, interpreted for the current phase.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Commands(Vec<Command>),
    Quit,
    Invalid(String),
}

fn parse_line(line: &str, unlocked: bool) -> Input {
    let trimmed = line.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "quit" | "exit" => return Input::Quit,
        "status" => return Input::Commands(vec![Command::Snapshot]),
        _ => {}
    }

    if !unlocked {
        if trimmed.is_empty() {
            return Input::Commands(vec![Command::Key(KeypadKey::Enter)]);
        }
        let mut keys = Vec::new();
        for ch in trimmed.chars().filter(|c| !c.is_whitespace()) {
            match KeypadKey::from_char(ch) {
                Some(key) => keys.push(Command::Key(key)),
                None => return Input::Invalid(format!("not a keypad key: '{ch}'")),
            }
        }
        return Input::Commands(keys);
    }

    let Some((sector, text)) = trimmed.split_once(' ') else {
        return Input::Invalid("expected '<sector> <answer>'".into());
    };
    match sector.parse::<usize>() {
        Ok(n) if n >= 1 => Input::Commands(vec![Command::SectorInput {
            index: n - 1,
            text: text.trim_start().to_string(),
        }]),
        _ => Input::Invalid(format!("not a sector number: '{sector}'")),
    }
}

pub fn run(args: PlayArgs, explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(explicit)?;
    if let Some(minutes) = args.duration_minutes {
        config.duration_minutes = minutes;
    }
    let tick = Duration::from_millis(config.timing.tick_interval_ms.max(1));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    if args.json {
        let mut session = PuzzleSession::from_config(&config, NullPresenter, SystemClock)?;
        runtime.block_on(drive(&mut session, tick, true))
    } else {
        let metas = config
            .sector_tracker()
            .sectors()
            .iter()
            .map(|s| s.meta().clone())
            .collect();
        let presenter = TerminalPresenter::new(std::io::stdout(), metas);
        let mut session = PuzzleSession::from_config(&config, presenter, SystemClock)?;
        println!("Type the access code and press enter ('c' clears, 'quit' leaves).");
        runtime.block_on(drive(&mut session, tick, false))
    }
}

/// Read stdin on a plain thread; tokio's stdin would hold up runtime
/// shutdown while a read is pending.
fn spawn_input_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn drive<P: Presenter, C: Clock>(
    session: &mut PuzzleSession<P, C>,
    tick: Duration,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = spawn_input_reader();
    let mut input_open = true;
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        // After EOF only a pending victory screen keeps the session alive.
        if !input_open && !session.victory_pending() {
            break;
        }
        tokio::select! {
            line = input.recv(), if input_open => match line {
                Some(line) => match parse_line(&line, session.gate().is_unlocked()) {
                    Input::Quit => break,
                    Input::Invalid(reason) => {
                        tracing::debug!(%reason, "ignored input");
                        if !json {
                            eprintln!("?? {reason}");
                        }
                    }
                    Input::Commands(commands) => {
                        for command in commands {
                            let events = session.dispatch(command);
                            emit(&events, json)?;
                        }
                    }
                },
                None => input_open = false,
            },
            _ = ticker.tick(), if session.needs_tick() => {
                let events = session.dispatch(Command::Tick);
                emit(&events, json)?;
            },
            else => break,
        }
        if session.outcome().is_terminal() && !session.needs_tick() {
            break;
        }
    }

    let outcome = session.outcome();
    session.dispatch(Command::Teardown);
    tracing::info!(?outcome, "session finished");
    Ok(())
}

fn emit(events: &[Event], json: bool) -> Result<(), serde_json::Error> {
    for event in events {
        if json {
            println!("{}", serde_json::to_string(event)?);
        } else if let Event::StateSnapshot { .. } = event {
            println!("\n{}", serde_json::to_string_pretty(event)?);
        }
    }
    Ok(())
}
