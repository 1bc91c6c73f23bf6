/// Result alias that carries the custom [`ClockError`] type.
pub type Result<T> = std::result::Result<T, ClockError>;

/// Common error type for the core crate.
///
/// Every variant is a caller-correctable problem. Engines that reject an
/// operation leave their previous state untouched.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Timer configured with a negative field or a total of zero.
    #[error("invalid timer duration {hours}h {minutes}m {seconds}s: total must be positive")]
    InvalidDuration {
        hours: i64,
        minutes: i64,
        seconds: i64,
    },
    /// Alarm hour outside 1-12 or minute outside 0-59.
    #[error("invalid alarm time {hour}:{minute:02}: hour must be 1-12 and minute 0-59")]
    InvalidTime { hour: u32, minute: u32 },
    /// Timezone name that is neither `local`, `UTC`, nor a known IANA zone.
    #[error("unknown timezone `{0}`")]
    InvalidTimezone(String),
    /// Clock tick too slow to see every minute, or zero.
    #[error("clock tick interval {0} ms must be between 1 and 60000")]
    InvalidTickInterval(u64),
    /// Free-form message, mostly used for malformed user input.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration file could not be decoded.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClockError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for ClockError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for ClockError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
