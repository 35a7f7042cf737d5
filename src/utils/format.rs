use chrono::{DateTime, FixedOffset};

/// Countdown as "HH:MM:SS"; hours are not wrapped at 24.
pub fn format_countdown(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Format an unlock instant in its own offset, e.g. "Sat 01 Feb 07:00"
pub fn format_unlock(t: DateTime<FixedOffset>) -> String {
    t.format("%a %d %b %H:%M").to_string()
}

/// Ratio in 0.0..=1.0 shown as a whole percentage
pub fn format_percent(ratio: f64) -> String {
    format!("{:.0}%", (ratio * 100.0).clamp(0.0, 100.0))
}

/// Create a simple ASCII progress bar
pub fn progress_bar(filled: u32, total: u32, width: usize) -> String {
    if total == 0 {
        return "░".repeat(width);
    }
    let ratio = (filled as f64 / total as f64).min(1.0);
    let filled_count = (ratio * width as f64).round() as usize;
    let empty_count = width.saturating_sub(filled_count);
    format!("{}{}", "█".repeat(filled_count), "░".repeat(empty_count))
}
