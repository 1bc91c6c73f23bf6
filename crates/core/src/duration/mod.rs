use serde::{Deserialize, Serialize};

pub const MS_PER_SECOND: u64 = 1_000;
pub const MS_PER_MINUTE: u64 = 60_000;
pub const MS_PER_HOUR: u64 = 3_600_000;

/// A millisecond count split into clock components.
///
/// Hours are unbounded above; the other fields are always below their
/// natural modulus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationParts {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub millis: u64,
}

impl DurationParts {
    pub fn from_millis(ms: u64) -> Self {
        decompose(ms)
    }

    /// Reassembles the components into the original millisecond count.
    pub fn total_millis(&self) -> u64 {
        self.hours * MS_PER_HOUR
            + self.minutes * MS_PER_MINUTE
            + self.seconds * MS_PER_SECOND
            + self.millis
    }

    pub fn hms(&self) -> String {
        format_hms(self.hours, self.minutes, self.seconds)
    }
}

pub fn decompose(ms: u64) -> DurationParts {
    DurationParts {
        hours: ms / MS_PER_HOUR,
        minutes: (ms % MS_PER_HOUR) / MS_PER_MINUTE,
        seconds: (ms % MS_PER_MINUTE) / MS_PER_SECOND,
        millis: ms % MS_PER_SECOND,
    }
}

/// Converts whole hours, minutes and seconds into milliseconds, returning
/// `None` on overflow.
pub fn compose(hours: u64, minutes: u64, seconds: u64) -> Option<u64> {
    hours
        .checked_mul(MS_PER_HOUR)?
        .checked_add(minutes.checked_mul(MS_PER_MINUTE)?)?
        .checked_add(seconds.checked_mul(MS_PER_SECOND)?)
}

/// Formats as `HH:MM:SS`, each field padded to at least two digits.
pub fn format_hms(hours: u64, minutes: u64, seconds: u64) -> String {
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

pub fn format_hm(hours: u64, minutes: u64) -> String {
    format!("{hours:02}:{minutes:02}")
}

/// Formats as `HH:MM:SS.mmm`, the layout used by the stopwatch display.
pub fn format_precise(ms: u64) -> String {
    let parts = decompose(ms);
    format!("{}.{:03}", parts.hms(), parts.millis)
}
