use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};

/// Ceiling for any configured delay or timeout (one day).
pub const MAX_SECS: f64 = 86_400.0;

/// Seconds from config to a `Duration`; negative or non-finite values become zero.
pub fn secs_to_duration(secs: f64) -> Duration {
    if !secs.is_finite() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(secs.min(MAX_SECS))
}

/// `2026-10-16T14-03-22`: ISO-like, without characters that are awkward in file names.
pub fn file_stamp(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%dT%H-%M-%S").to_string()
}

/// Timestamp used at the start of every log line.
pub fn log_stamp(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
}

pub fn system_time_ms(t: SystemTime) -> Option<i64> {
    t.duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_millis()).ok())
}

pub fn round_secs(d: Duration) -> f64 {
    (d.as_secs_f64() * 1000.0).round() / 1000.0
}
