//! Core library for the Theme Clock application.
//!
//! The crate holds the time-keeping logic behind the clock widget: a
//! stopwatch, a countdown timer, recurring alarms and the clock face reading
//! for a chosen timezone. Rendering, sound playback and the periodic driver
//! are collaborators supplied by the host; [`ClockContext`] is the single
//! owner of engine state and exposes a small command interface to any UI.

pub mod alarm;
pub mod audio;
pub mod clock;
pub mod config;
pub mod context;
pub mod duration;
pub mod error;
pub mod scheduler;
pub mod stopwatch;
pub mod timer;

pub use alarm::{Alarm, AlarmId, AlarmRegistry, DayOfWeek, Meridiem};
pub use audio::{AudioOutput, RecordingOutput, SoundId};
pub use clock::{CalendarTime, HandAngles, ManualClock, SystemClock, TimeZoneSetting, WallClock};
pub use config::{AppConfig, ClockConfig, SoundConfig, StopwatchConfig};
pub use context::{ClockContext, ClockEvent, ClockReading, Command};
pub use duration::{decompose, format_hms, format_precise, DurationParts};
pub use error::{ClockError, Result};
pub use scheduler::{DriverHandle, DriverSlot, PeriodicDriver, TickScheduler};
pub use stopwatch::{Lap, Stopwatch};
pub use timer::{Timer, TimerEvent, TimerPhase};
