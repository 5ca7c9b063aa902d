//! Recurring-schedule vocabulary and next-run calculation.
//!
//! Everything here is pure: `next_run` takes the current instant as a
//! parameter so the calendar arithmetic is fully testable.

use chrono::{Datelike, Duration, NaiveTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Frequency
// ---------------------------------------------------------------------------

/// How often a schedule fires. Wire tokens match the admin UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "1h")]
    Hourly,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "12h")]
    TwelveHours,
    #[serde(rename = "24h")]
    Daily,
    #[serde(rename = "7d")]
    Weekly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "1h",
            Self::SixHours => "6h",
            Self::TwelveHours => "12h",
            Self::Daily => "24h",
            Self::Weekly => "7d",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "1h" => Some(Self::Hourly),
            "6h" => Some(Self::SixHours),
            "12h" => Some(Self::TwelveHours),
            "24h" => Some(Self::Daily),
            "7d" => Some(Self::Weekly),
            _ => None,
        }
    }

    pub fn interval(&self) -> Duration {
        match self {
            Self::Hourly => Duration::hours(1),
            Self::SixHours => Duration::hours(6),
            Self::TwelveHours => Duration::hours(12),
            Self::Daily => Duration::hours(24),
            Self::Weekly => Duration::days(7),
        }
    }

    /// Whether the active-day set applies to this frequency.
    pub fn honors_days(&self) -> bool {
        matches!(self, Self::Daily | Self::Weekly)
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Weekday
// ---------------------------------------------------------------------------

/// Active-day token for daily/weekly schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "monday" => Some(Self::Monday),
            "tuesday" => Some(Self::Tuesday),
            "wednesday" => Some(Self::Wednesday),
            "thursday" => Some(Self::Thursday),
            "friday" => Some(Self::Friday),
            "saturday" => Some(Self::Saturday),
            "sunday" => Some(Self::Sunday),
            _ => None,
        }
    }

    fn to_chrono(self) -> chrono::Weekday {
        match self {
            Self::Monday => chrono::Weekday::Mon,
            Self::Tuesday => chrono::Weekday::Tue,
            Self::Wednesday => chrono::Weekday::Wed,
            Self::Thursday => chrono::Weekday::Thu,
            Self::Friday => chrono::Weekday::Fri,
            Self::Saturday => chrono::Weekday::Sat,
            Self::Sunday => chrono::Weekday::Sun,
        }
    }
}

// ---------------------------------------------------------------------------
// StartTime
// ---------------------------------------------------------------------------

/// Default anchor when a schedule has no explicit start time.
pub const DEFAULT_START_TIME: &str = "02:00";

/// A validated `HH:MM` (24h) time-of-day anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartTime {
    hour: u32,
    minute: u32,
}

fn start_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("valid pattern"))
}

impl StartTime {
    /// Parse and validate an `HH:MM` string (`00:00` - `23:59`).
    pub fn parse(raw: &str) -> Result<Self, String> {
        if !start_time_pattern().is_match(raw) {
            return Err(format!(
                "invalid start time '{raw}': expected HH:MM between 00:00 and 23:59"
            ));
        }
        // The pattern guarantees the shape, so these parses cannot fail.
        let hour: u32 = raw[0..2].parse().map_err(|_| "unreachable".to_string())?;
        let minute: u32 = raw[3..5].parse().map_err(|_| "unreachable".to_string())?;
        Ok(Self { hour, minute })
    }

    fn as_naive(&self) -> NaiveTime {
        // Hour and minute ranges are guaranteed by `parse`.
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).expect("validated HH:MM")
    }
}

impl std::fmt::Display for StartTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

// ---------------------------------------------------------------------------
// Next-run calculation
// ---------------------------------------------------------------------------

/// Minimum lead before the next fire. Guards against immediate-refire loops
/// when the computed instant lands at or before `now`.
pub const MIN_LEAD_SECS: i64 = 30;

fn day_allowed(at: Timestamp, days: &[Weekday]) -> bool {
    days.is_empty() || days.iter().any(|d| d.to_chrono() == at.weekday())
}

/// Compute the next fire instant strictly after `now`.
///
/// - If today's anchor time is still ahead (and today is an allowed day for
///   daily/weekly schedules), that instant is next.
/// - `1h`/`6h`: otherwise simply `now + interval`.
/// - `12h`: the anchor or anchor+12h, whichever comes next.
/// - `24h`/`7d`: the next allowed calendar day at the anchor time.
///
/// The result is clamped to at least `now + MIN_LEAD_SECS`.
pub fn next_run(
    now: Timestamp,
    frequency: Frequency,
    start_time: StartTime,
    days: &[Weekday],
) -> Timestamp {
    let anchor_today = Utc
        .from_utc_datetime(&now.date_naive().and_time(start_time.as_naive()));

    let days = if frequency.honors_days() { days } else { &[] };

    let candidate = if anchor_today > now && day_allowed(anchor_today, days) {
        anchor_today
    } else {
        match frequency {
            Frequency::Hourly | Frequency::SixHours => now + frequency.interval(),
            Frequency::TwelveHours => {
                let half_day = anchor_today + Duration::hours(12);
                if half_day > now {
                    half_day
                } else {
                    anchor_today + Duration::hours(24)
                }
            }
            Frequency::Daily => next_allowed_day(anchor_today, days),
            Frequency::Weekly => {
                if days.is_empty() {
                    anchor_today + Duration::days(7)
                } else {
                    next_allowed_day(anchor_today, days)
                }
            }
        }
    };

    let min = now + Duration::seconds(MIN_LEAD_SECS);
    if candidate < min {
        min
    } else {
        candidate
    }
}

/// First day strictly after `anchor_today` (at the same time) whose weekday
/// is in the allowed set. With an empty set every day is allowed.
fn next_allowed_day(anchor_today: Timestamp, days: &[Weekday]) -> Timestamp {
    for offset in 1..=7 {
        let candidate = anchor_today + Duration::days(offset);
        if day_allowed(candidate, days) {
            return candidate;
        }
    }
    // Unreachable: a 7-day window always contains every weekday.
    anchor_today + Duration::days(7)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
