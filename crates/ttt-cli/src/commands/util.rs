//! Shared formatting for CLI commands.

use chrono::DateTime;
use ttt_core::Millis;

/// Formats a duration compactly: `1h 5m`, `2h`, `3m 20s`, `12m`, `42s`.
///
/// Seconds are only shown under ten minutes. Zero, negative and NaN
/// durations format as `0s`.
pub fn format_time(secs: f64) -> String {
    if secs.is_nan() || secs <= 0.0 {
        return "0s".to_string();
    }
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "positive and floored; durations are far below u64::MAX"
    )]
    let total = secs.floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    match (hours, minutes, seconds) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) if s > 0 && m < 10 => format!("{m}m {s}s"),
        (0, m, _) => format!("{m}m"),
        (h, 0, _) => format!("{h}h"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}

/// Shortens `text` to at most `max` characters, ending with an ellipsis when
/// cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Formats an epoch-millisecond timestamp as UTC.
pub fn format_timestamp(ms: Millis) -> String {
    DateTime::from_timestamp_millis(ms).map_or_else(
        || ms.to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}
