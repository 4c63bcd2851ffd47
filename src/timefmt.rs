//! Display-time helpers.
//!
//! Record timestamps are shifted by the day's raw and DST offsets and the
//! result is read back as if it were UTC. That yields the wall clock at the
//! recorded place without depending on the browser's own timezone.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

const MS_PER_SECOND: i64 = 1_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HourFormat {
    #[default]
    TwelveHour,
    TwentyFourHour,
}

impl HourFormat {
    pub fn from_24_hour_flag(use_24_hour: bool) -> Self {
        if use_24_hour {
            HourFormat::TwentyFourHour
        } else {
            HourFormat::TwelveHour
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

/// Wall-clock components for `timestamp_ms` at a place with the given offsets.
pub fn wall_clock(timestamp_ms: i64, raw_offset_seconds: i64, dst_offset_seconds: i64) -> WallClock {
    let shifted_ms = timestamp_ms
        .saturating_add(dst_offset_seconds.saturating_mul(MS_PER_SECOND))
        .saturating_add(raw_offset_seconds.saturating_mul(MS_PER_SECOND));
    // Outside chrono's range reads as the epoch
    let shifted = DateTime::<Utc>::from_timestamp_millis(shifted_ms).unwrap_or_default();

    WallClock {
        hour: shifted.hour(),
        minute: shifted.minute(),
        second: shifted.second(),
    }
}

pub fn format_clock(clock: WallClock, format: HourFormat) -> String {
    match format {
        HourFormat::TwentyFourHour => format!(
            "{:02}:{:02}:{:02}",
            clock.hour, clock.minute, clock.second
        ),
        HourFormat::TwelveHour => {
            let meridiem = if clock.hour > 11 { "PM" } else { "AM" };
            let hour = match clock.hour % 12 {
                0 => 12,
                h => h,
            };
            format!(
                "{}:{:02}:{:02} {}",
                hour, clock.minute, clock.second, meridiem
            )
        }
    }
}

/// How long ago a fix was taken, in minutes up to an hour and in hours past that.
pub fn describe_age(now_ms: i64, then_ms: i64) -> String {
    let minutes = (now_ms - then_ms) as f64 / 60_000.0;
    if minutes > 60.0 {
        format!("{} hours ago", (minutes / 60.0).round() as i64)
    } else {
        format!("{} minutes ago", minutes.round() as i64)
    }
}
