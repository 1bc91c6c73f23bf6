use std::{
    cell::Cell,
    fmt,
    str::FromStr,
    time::{Duration, Instant},
};

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{
    alarm::{DayOfWeek, Meridiem},
    ClockError, Result,
};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Source of the current time.
///
/// Calendar readings come from [`WallClock::now`]; elapsed-time engines use
/// [`WallClock::monotonic_ms`], which never goes backwards.
pub trait WallClock {
    fn now(&self) -> DateTime<Utc>;

    fn monotonic_ms(&self) -> u64;
}

/// The host's real clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic_ms(&self) -> u64 {
        saturating_millis(self.origin.elapsed())
    }
}

fn saturating_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Clock that only moves when told to. Used to drive the engines
/// deterministically from tests or scripted sessions.
#[derive(Debug, Clone)]
pub struct ManualClock {
    start: DateTime<Utc>,
    elapsed_ms: Cell<u64>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            elapsed_ms: Cell::new(0),
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        self.elapsed_ms.set(self.elapsed_ms.get() + ms);
    }
}

impl WallClock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.start + chrono::Duration::milliseconds(self.elapsed_ms.get() as i64)
    }

    fn monotonic_ms(&self) -> u64 {
        self.elapsed_ms.get()
    }
}

/// Which timezone the clock face shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeZoneSetting {
    #[default]
    Local,
    Utc,
    Named(Tz),
}

impl TimeZoneSetting {
    /// Caption shown under the clock face.
    pub fn label(&self) -> String {
        match self {
            TimeZoneSetting::Local => "Local Time".to_string(),
            TimeZoneSetting::Utc => "UTC".to_string(),
            TimeZoneSetting::Named(tz) => tz.name().replace('_', " "),
        }
    }
}

impl FromStr for TimeZoneSetting {
    type Err = ClockError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            name if name.eq_ignore_ascii_case("local") => Ok(TimeZoneSetting::Local),
            name if name.eq_ignore_ascii_case("utc") => Ok(TimeZoneSetting::Utc),
            name => name
                .parse::<Tz>()
                .map(TimeZoneSetting::Named)
                .map_err(|_| ClockError::InvalidTimezone(name.to_string())),
        }
    }
}

impl fmt::Display for TimeZoneSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeZoneSetting::Local => f.write_str("local"),
            TimeZoneSetting::Utc => f.write_str("UTC"),
            TimeZoneSetting::Named(tz) => f.write_str(tz.name()),
        }
    }
}

/// Rotation of each analog hand in degrees, clockwise from twelve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandAngles {
    pub hour: f64,
    pub minute: f64,
    pub second: f64,
}

/// A moment broken into the fields the clock face and alarms work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarTime {
    /// 0-23.
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub day_of_week: DayOfWeek,
    /// 1-12.
    pub month: u32,
    pub day_of_month: u32,
}

impl CalendarTime {
    pub fn at(now: DateTime<Utc>, zone: &TimeZoneSetting) -> Self {
        match zone {
            TimeZoneSetting::Local => Self::from_datetime(&now.with_timezone(&Local)),
            TimeZoneSetting::Utc => Self::from_datetime(&now),
            TimeZoneSetting::Named(tz) => Self::from_datetime(&now.with_timezone(tz)),
        }
    }

    pub fn from_datetime<T: TimeZone>(time: &DateTime<T>) -> Self {
        let weekday = time.weekday().num_days_from_sunday();
        Self {
            hour: time.hour(),
            minute: time.minute(),
            second: time.second(),
            day_of_week: DayOfWeek::from_index(weekday).unwrap_or(DayOfWeek::Sunday),
            month: time.month(),
            day_of_month: time.day(),
        }
    }

    /// Hour on a 12-hour dial: midnight and noon both read 12.
    pub fn hour12(&self) -> u32 {
        match self.hour % 12 {
            0 => 12,
            hour => hour,
        }
    }

    pub fn meridiem(&self) -> Meridiem {
        Meridiem::of_hour24(self.hour)
    }

    /// Digital readout, e.g. `9:05 PM`.
    pub fn digital_label(&self) -> String {
        format!("{}:{:02} {}", self.hour12(), self.minute, self.meridiem())
    }

    /// Date line, e.g. `Sunday, Jan 5`.
    pub fn date_label(&self) -> String {
        let month = MONTHS
            .get(self.month.saturating_sub(1) as usize)
            .copied()
            .unwrap_or("???");
        format!("{}, {} {}", self.day_of_week.name(), month, self.day_of_month)
    }

    pub fn hand_angles(&self) -> HandAngles {
        let dial_hours = (self.hour12() % 12) as f64 + self.minute as f64 / 60.0;
        HandAngles {
            hour: scale(dial_hours, 12.0),
            minute: scale(self.minute as f64, 60.0),
            second: scale(self.second as f64, 60.0),
        }
    }
}

/// Maps `value` in `[0, full_turn)` onto `[0, 360)` degrees.
fn scale(value: f64, full_turn: f64) -> f64 {
    value * 360.0 / full_turn
}
