use voice_memo_core::MIN_LEVEL_DB;

use std::time::Duration;

const METER_WIDTH: usize = 20;
/// Levels at or below this read as an empty meter.
const METER_FLOOR_DB: f32 = -60.0;

/// `m:ss`, or `h:mm:ss` from one hour on.
pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total / 60) % 60, total % 60);

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Fixed-width bar for a level in dB.
pub(crate) fn level_bar(level_db: f32) -> String {
    let clamped = level_db.clamp(METER_FLOOR_DB.max(MIN_LEVEL_DB), 0.0);
    let fraction = (clamped - METER_FLOOR_DB) / -METER_FLOOR_DB;
    let filled = ((fraction * METER_WIDTH as f32).round() as usize).min(METER_WIDTH);

    format!("[{}{}]", "#".repeat(filled), " ".repeat(METER_WIDTH - filled))
}

/// Human-readable byte count in binary units.
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
