use serde::{Deserialize, Serialize};

use crate::{
    duration::{compose, decompose, DurationParts, MS_PER_SECOND},
    ClockError, Result,
};

/// Milliseconds removed from the countdown by each [`Timer::tick`].
pub const TICK_MS: u64 = MS_PER_SECOND;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerPhase {
    #[default]
    Configuring,
    Running,
    Paused,
    Completed,
}

/// Edge-triggered signal returned by [`Timer::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Finished,
}

/// Countdown timer advanced one second per tick.
#[derive(Debug, Default, Clone)]
pub struct Timer {
    phase: TimerPhase,
    total_ms: u64,
    remaining_ms: u64,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ms
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn remaining_parts(&self) -> DurationParts {
        decompose(self.remaining_ms)
    }

    /// Remaining time as `HH:MM:SS`.
    pub fn display(&self) -> String {
        self.remaining_parts().hms()
    }

    /// Sets a new countdown length and returns to the configuring phase,
    /// discarding any countdown in progress.
    ///
    /// Fails with [`ClockError::InvalidDuration`] when a field is negative or
    /// the total is not positive. The timer is left untouched on failure.
    pub fn configure(&mut self, hours: i64, minutes: i64, seconds: i64) -> Result<()> {
        let invalid = || ClockError::InvalidDuration {
            hours,
            minutes,
            seconds,
        };

        if hours < 0 || minutes < 0 || seconds < 0 {
            return Err(invalid());
        }

        let total =
            compose(hours as u64, minutes as u64, seconds as u64).ok_or_else(invalid)?;

        if total == 0 {
            return Err(invalid());
        }

        self.phase = TimerPhase::Configuring;
        self.total_ms = total;
        self.remaining_ms = total;
        tracing::debug!(total_ms = total, "timer configured");
        Ok(())
    }

    /// Begins the countdown. Only valid from the configuring phase with a
    /// positive duration; returns whether the timer started.
    pub fn start(&mut self) -> bool {
        if self.phase != TimerPhase::Configuring || self.total_ms == 0 {
            return false;
        }

        self.phase = TimerPhase::Running;
        true
    }

    /// Advances the countdown by one second. The finish signal is raised
    /// exactly once, on the tick that reaches zero.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if self.phase != TimerPhase::Running {
            return None;
        }

        self.remaining_ms = self.remaining_ms.saturating_sub(TICK_MS);
        if self.remaining_ms == 0 {
            self.phase = TimerPhase::Completed;
            tracing::debug!(total_ms = self.total_ms, "timer completed");
            return Some(TimerEvent::Finished);
        }

        None
    }

    pub fn pause(&mut self) -> bool {
        if self.phase != TimerPhase::Running {
            return false;
        }
        self.phase = TimerPhase::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.phase != TimerPhase::Paused {
            return false;
        }
        self.phase = TimerPhase::Running;
        true
    }

    /// Pauses a running timer or resumes a paused one.
    pub fn toggle_pause(&mut self) -> bool {
        match self.phase {
            TimerPhase::Running => self.pause(),
            TimerPhase::Paused => self.resume(),
            _ => false,
        }
    }

    pub fn stop(&mut self) {
        self.phase = TimerPhase::Configuring;
        self.total_ms = 0;
        self.remaining_ms = 0;
    }

    /// Fraction of the countdown already elapsed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.total_ms == 0 {
            return 0.0;
        }
        (self.total_ms - self.remaining_ms) as f64 / self.total_ms as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_timer(h: i64, m: i64, s: i64) -> Timer {
        let mut timer = Timer::new();
        timer.configure(h, m, s).unwrap();
        assert!(timer.start());
        timer
    }

    #[test]
    fn finishes_exactly_once_on_last_tick() {
        let mut timer = running_timer(0, 0, 5);

        for _ in 0..4 {
            assert_eq!(timer.tick(), None);
        }
        assert_eq!(timer.tick(), Some(TimerEvent::Finished));
        assert_eq!(timer.remaining_ms(), 0);
        assert_eq!(timer.phase(), TimerPhase::Completed);

        for _ in 0..3 {
            assert_eq!(timer.tick(), None);
        }
        assert_eq!(timer.remaining_ms(), 0);
    }

    #[test]
    fn rejects_zero_and_negative_durations() {
        let mut timer = Timer::new();
        assert!(matches!(
            timer.configure(0, 0, 0),
            Err(ClockError::InvalidDuration { .. })
        ));
        assert!(matches!(
            timer.configure(0, -1, 30),
            Err(ClockError::InvalidDuration { .. })
        ));
        assert!(matches!(
            timer.configure(i64::MAX, 0, 0),
            Err(ClockError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn failed_configure_keeps_previous_countdown() {
        let mut timer = running_timer(0, 1, 0);
        timer.tick();

        assert!(timer.configure(0, 0, 0).is_err());
        assert_eq!(timer.phase(), TimerPhase::Running);
        assert_eq!(timer.remaining_ms(), 59_000);
    }

    #[test]
    fn paused_timer_ignores_ticks() {
        let mut timer = running_timer(0, 0, 10);
        timer.tick();
        assert!(timer.toggle_pause());
        assert_eq!(timer.phase(), TimerPhase::Paused);

        assert_eq!(timer.tick(), None);
        assert_eq!(timer.remaining_ms(), 9_000);

        assert!(timer.toggle_pause());
        timer.tick();
        assert_eq!(timer.remaining_ms(), 8_000);
    }

    #[test]
    fn start_requires_configuring_phase() {
        let mut timer = Timer::new();
        assert!(!timer.start());

        let mut timer = running_timer(0, 0, 3);
        assert!(!timer.start());
    }

    #[test]
    fn stop_returns_to_configuring() {
        let mut timer = running_timer(1, 0, 0);
        timer.tick();
        timer.stop();

        assert_eq!(timer.phase(), TimerPhase::Configuring);
        assert_eq!(timer.total_ms(), 0);
        assert_eq!(timer.remaining_ms(), 0);
        assert!(!timer.start());
    }

    #[test]
    fn reports_progress_and_display() {
        let timer = Timer::new();
        assert_eq!(timer.progress(), 0.0);

        let mut timer = running_timer(0, 0, 4);
        timer.tick();
        assert!((timer.progress() - 0.25).abs() < f64::EPSILON);
        assert_eq!(timer.display(), "00:00:03");

        timer = running_timer(1, 2, 3);
        assert_eq!(timer.display(), "01:02:03");
    }
}
