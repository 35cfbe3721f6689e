//! On-duty schedule: when interventions are permitted to apply.
//!
//! The evaluator is a pure function of the schedule and a wall-clock
//! instant, so the engine can be tested at any simulated time. Windows where
//! `start > end` wrap past midnight (22:00-06:00 covers late evening and
//! early morning); activity is decided by *today's* day flag even when the
//! wrapped window technically opened yesterday.

use std::time::Duration;

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

/// End-of-day sentinel: an unparsable end time means "until midnight".
const MINUTES_PER_DAY: u32 = 24 * 60;

/// Per-weekday enablement flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayFlags {
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
}

impl Default for DayFlags {
    fn default() -> Self {
        Self::all()
    }
}

impl DayFlags {
    pub fn all() -> Self {
        Self {
            monday: true,
            tuesday: true,
            wednesday: true,
            thursday: true,
            friday: true,
            saturday: true,
            sunday: true,
        }
    }

    pub fn none() -> Self {
        Self {
            monday: false,
            tuesday: false,
            wednesday: false,
            thursday: false,
            friday: false,
            saturday: false,
            sunday: false,
        }
    }

    pub fn contains(&self, day: Weekday) -> bool {
        match day {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    /// Set a flag by its lowercase English name. Returns false for an
    /// unrecognized name.
    pub fn set_named(&mut self, day: &str, value: bool) -> bool {
        match day.to_ascii_lowercase().as_str() {
            "monday" => self.monday = value,
            "tuesday" => self.tuesday = value,
            "wednesday" => self.wednesday = value,
            "thursday" => self.thursday = value,
            "friday" => self.friday = value,
            "saturday" => self.saturday = value,
            "sunday" => self.sunday = value,
            _ => return false,
        }
        true
    }
}

/// The on-duty schedule plus the per-feature knobs grouped with it in the
/// settings payload.
///
/// The four string knobs carry validated enum values (see the associated
/// constants); anything else silently falls back to the documented default
/// at the point of use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnDutySchedule {
    pub enabled: bool,
    #[serde(alias = "AlwaysOn")]
    pub always_on: bool,
    /// `HH:MM`, 24-hour.
    pub start_time: String,
    /// `HH:MM`, 24-hour.
    pub end_time: String,
    pub days: DayFlags,
    /// One of [`OnDutySchedule::AUTO_LOGOUT_DELAYS`].
    pub auto_logout_delay: String,
    /// One of [`OnDutySchedule::FEED_BYPASS_METHODS`].
    pub feed_bypass_method: String,
    /// One of [`OnDutySchedule::MINDFUL_TIMER_DELAYS`].
    pub mindful_timer_delay: String,
    /// One of [`OnDutySchedule::GRAYSCALE_OPACITY_VALUES`], in percent.
    pub grayscale_opacity: String,
}

impl Default for OnDutySchedule {
    fn default() -> Self {
        Self {
            enabled: true,
            always_on: true,
            start_time: "08:00".to_string(),
            end_time: "17:00".to_string(),
            days: DayFlags::all(),
            auto_logout_delay: "15s".to_string(),
            feed_bypass_method: "button".to_string(),
            mindful_timer_delay: "15s".to_string(),
            grayscale_opacity: "100".to_string(),
        }
    }
}

impl OnDutySchedule {
    pub const AUTO_LOGOUT_DELAYS: [&'static str; 5] = ["0s", "15s", "5m", "1h", "24h"];
    pub const FEED_BYPASS_METHODS: [&'static str; 3] = ["none", "button", "typing"];
    pub const MINDFUL_TIMER_DELAYS: [&'static str; 3] = ["3s", "15s", "30s"];
    pub const GRAYSCALE_OPACITY_VALUES: [&'static str; 4] = ["100", "75", "50", "25"];

    /// Is the policy active at `now` (local wall clock)?
    pub fn is_active_at(&self, now: NaiveDateTime) -> bool {
        if !self.enabled {
            return false;
        }
        if self.always_on {
            return true;
        }
        if !self.days.contains(now.weekday()) {
            return false;
        }
        let now_minutes = now.hour() * 60 + now.minute();
        let start = parse_minutes(&self.start_time).unwrap_or(0);
        let end = parse_minutes(&self.end_time).unwrap_or(MINUTES_PER_DAY);
        if start <= end {
            start <= now_minutes && now_minutes < end
        } else {
            // Overnight window.
            now_minutes >= start || now_minutes < end
        }
    }

    /// Mindful pause length. Unknown values fall back to 15 seconds.
    pub fn mindful_delay(&self) -> Duration {
        match self.mindful_timer_delay.as_str() {
            "3s" => Duration::from_secs(3),
            "30s" => Duration::from_secs(30),
            _ => Duration::from_secs(15),
        }
    }

    /// Grayscale opacity as a fraction, rounded to two decimals. Unknown
    /// values fall back to full strength.
    pub fn grayscale_fraction(&self) -> f64 {
        let pct: f64 = match self.grayscale_opacity.trim().trim_end_matches('%') {
            "25" => 25.0,
            "50" => 50.0,
            "75" => 75.0,
            _ => 100.0,
        };
        (pct / 100.0 * 100.0).round() / 100.0
    }
}

/// Sanitize a user-entered time string to zero-padded `HH:MM`, or `None` if
/// it is not a valid 24-hour time. Hours above 23 are clamped.
pub fn sanitize_time_str(value: &str) -> Option<String> {
    let minutes = parse_minutes(value)?;
    Some(format!("{:02}:{:02}", minutes / 60, minutes % 60))
}

/// Parse `H:MM`/`HH:MM` into minutes since midnight, clamped to `[0, 1439]`.
fn parse_minutes(value: &str) -> Option<u32> {
    let (hh, mm) = value.trim().split_once(':')?;
    if hh.is_empty() || hh.len() > 2 || mm.len() != 2 {
        return None;
    }
    if !hh.bytes().all(|b| b.is_ascii_digit()) || !mm.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: u32 = hh.parse().ok()?;
    let minutes: u32 = mm.parse().ok()?;
    if minutes > 59 {
        return None;
    }
    Some(hours.min(23) * 60 + minutes)
}
