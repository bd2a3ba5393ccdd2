// Poetry Engine — Season and time of day
// Meteorological seasons by month (flipped south of the equator) and coarse
// time-of-day buckets, both evaluated in the configured timezone.

use chrono::{Datelike, Timelike, Utc};
use chrono_tz::Tz;
use log::warn;

/// Season for a 1-based `month` at latitude `lat`.
pub fn season_for(month: u32, lat: f64) -> &'static str {
    let northern = match month {
        3..=5 => "spring",
        6..=8 => "summer",
        9..=11 => "autumn",
        _ => "winter",
    };
    if lat >= 0.0 {
        return northern;
    }
    match northern {
        "spring" => "autumn",
        "summer" => "winter",
        "autumn" => "spring",
        _ => "summer",
    }
}

/// Bucket for a 0–23 `hour`.
pub fn time_of_day_for(hour: u32) -> &'static str {
    match hour {
        5..=7 => "early morning",
        8..=11 => "morning",
        12..=13 => "midday",
        14..=16 => "afternoon",
        17..=19 => "evening",
        20..=22 => "night",
        _ => "late night",
    }
}

fn parse_tz(timezone: &str) -> Tz {
    timezone.parse::<Tz>().unwrap_or_else(|_| {
        warn!("[season] Unknown timezone '{}', using UTC", timezone);
        Tz::UTC
    })
}

/// (season, time of day) right now at the configured location.
pub fn current_moment(lat: f64, timezone: &str) -> (&'static str, &'static str) {
    let local = Utc::now().with_timezone(&parse_tz(timezone));
    (season_for(local.month(), lat), time_of_day_for(local.hour()))
}
