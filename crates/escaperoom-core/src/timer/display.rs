//! Countdown display projection.

/// What the display shows once the countdown has run out.
pub const EXPIRED_DISPLAY: &str = "00:00:00";

/// Format remaining milliseconds as `MM:SS:hh`.
///
/// Each unit is floor-truncated, never rounded, so the display reaches
/// `00:00:00` no earlier than the real deadline. Minutes are not capped and
/// widen past two digits for long countdowns.
pub fn format_remaining(remaining_ms: u64) -> String {
    let minutes = remaining_ms / 60_000;
    let seconds = (remaining_ms % 60_000) / 1_000;
    let hundredths = (remaining_ms % 1_000) / 10;
    format!("{minutes:02}:{seconds:02}:{hundredths:02}")
}
