use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    alarm::{Alarm, AlarmId, AlarmRegistry, DayOfWeek, Meridiem},
    audio::{AudioOutput, SoundId},
    clock::{CalendarTime, HandAngles, TimeZoneSetting, WallClock},
    scheduler::{DriverHandle, DriverSlot, PeriodicDriver, TickScheduler},
    stopwatch::{Lap, Stopwatch},
    timer::{Timer, TimerEvent, TimerPhase, TICK_MS},
    AppConfig, ClockError, Result,
};

/// Longest clock tick that still visits every wall-clock minute, which alarm
/// matching depends on.
pub const MAX_CLOCK_TICK_MS: u64 = 60_000;

/// Everything a user interface can ask the clock to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StopwatchStart,
    StopwatchPause,
    StopwatchReset,
    StopwatchLap,
    /// Configure the countdown and start it straight away.
    TimerStart {
        hours: i64,
        minutes: i64,
        seconds: i64,
    },
    /// Pause a running countdown or resume a paused one.
    TimerPause,
    TimerStop,
    AlarmAdd {
        hour: u32,
        minute: u32,
        meridiem: Meridiem,
        days: Vec<DayOfWeek>,
    },
    AlarmRemove(AlarmId),
    AlarmSetActive {
        id: AlarmId,
        active: bool,
    },
    DismissAlarm,
    SetTimezone(TimeZoneSetting),
    SetSound(bool),
}

/// What the clock face should show for the current second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockReading {
    pub calendar: CalendarTime,
    pub digital: String,
    pub date: String,
    pub timezone: String,
    pub hands: HandAngles,
}

impl ClockReading {
    pub fn new(calendar: CalendarTime, zone: &TimeZoneSetting) -> Self {
        Self {
            digital: calendar.digital_label(),
            date: calendar.date_label(),
            timezone: zone.label(),
            hands: calendar.hand_angles(),
            calendar,
        }
    }
}

/// Output of commands and driver ticks, consumed by the display and audio
/// collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum ClockEvent {
    Clock(ClockReading),
    Stopwatch { elapsed_ms: u64, running: bool },
    LapRecorded(Lap),
    Timer {
        remaining_ms: u64,
        total_ms: u64,
        phase: TimerPhase,
        progress: f64,
    },
    TimerFinished,
    AlarmAdded(Alarm),
    AlarmRemoved(AlarmId),
    AlarmUpdated(Alarm),
    AlarmTriggered(Alarm),
    AlarmDismissed,
    Settings {
        timezone: String,
        sound_enabled: bool,
    },
}

/// Identifies the wall-clock minute an alarm was last checked in.
type MinuteKey = (u32, u32, u32, u32);

/// Single owner of all clock state.
///
/// Commands mutate it through [`ClockContext::apply`]; periodic drivers reach
/// it through [`ClockContext::on_driver`]. Each engine owns at most one driver
/// slot, and starting or resuming an engine always replaces that slot.
#[derive(Debug)]
pub struct ClockContext<D: PeriodicDriver = TickScheduler> {
    stopwatch: Stopwatch,
    timer: Timer,
    alarms: AlarmRegistry,
    timezone: TimeZoneSetting,
    sound_enabled: bool,
    tick_sound: bool,
    stopwatch_refresh_ms: u64,
    driver: D,
    clock_slot: DriverSlot,
    stopwatch_slot: DriverSlot,
    timer_slot: DriverSlot,
    alarm_minute: Option<MinuteKey>,
    fired_this_minute: HashSet<AlarmId>,
    alarm_ringing: bool,
}

impl ClockContext<TickScheduler> {
    pub fn new(config: &AppConfig, clock: &impl WallClock) -> Result<Self> {
        Self::with_driver(config, TickScheduler::new(), clock)
    }

    /// When the host loop should next call [`ClockContext::advance`].
    pub fn next_deadline(&self) -> Option<u64> {
        self.driver.next_deadline()
    }

    /// Runs every driver that has come due.
    pub fn advance(&mut self, clock: &impl WallClock) -> Vec<ClockEvent> {
        let due = self.driver.due(clock.monotonic_ms());
        let mut events = Vec::new();
        for handle in due {
            events.extend(self.on_driver(handle, clock));
        }
        events
    }
}

impl<D: PeriodicDriver> ClockContext<D> {
    pub fn with_driver(config: &AppConfig, mut driver: D, clock: &impl WallClock) -> Result<Self> {
        let timezone = config.clock.timezone.parse()?;
        let tick_interval_ms = config.clock.tick_interval_ms;
        if !(1..=MAX_CLOCK_TICK_MS).contains(&tick_interval_ms) {
            return Err(ClockError::InvalidTickInterval(tick_interval_ms));
        }
        let mut clock_slot = DriverSlot::new();
        clock_slot.replace(&mut driver, tick_interval_ms, clock.monotonic_ms());

        Ok(Self {
            stopwatch: Stopwatch::new(),
            timer: Timer::new(),
            alarms: AlarmRegistry::new(),
            timezone,
            sound_enabled: config.sound.enabled,
            tick_sound: config.sound.tick,
            stopwatch_refresh_ms: config.stopwatch.refresh_interval_ms,
            driver,
            clock_slot,
            stopwatch_slot: DriverSlot::new(),
            timer_slot: DriverSlot::new(),
            alarm_minute: None,
            fired_this_minute: HashSet::new(),
            alarm_ringing: false,
        })
    }

    pub fn stopwatch(&self) -> &Stopwatch {
        &self.stopwatch
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn alarms(&self) -> &AlarmRegistry {
        &self.alarms
    }

    pub fn timezone(&self) -> TimeZoneSetting {
        self.timezone
    }

    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled
    }

    pub fn is_alarm_ringing(&self) -> bool {
        self.alarm_ringing
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Current clock face reading, independent of the clock driver.
    pub fn reading(&self, clock: &impl WallClock) -> ClockReading {
        ClockReading::new(CalendarTime::at(clock.now(), &self.timezone), &self.timezone)
    }

    /// Applies a user command. Rejected commands leave every engine as it was.
    pub fn apply(&mut self, command: Command, clock: &impl WallClock) -> Result<Vec<ClockEvent>> {
        let now = clock.monotonic_ms();
        let events = match command {
            Command::StopwatchStart => {
                if self.stopwatch.start(now) {
                    self.stopwatch_slot
                        .replace(&mut self.driver, self.stopwatch_refresh_ms, now);
                }
                vec![self.stopwatch_event(now)]
            }
            Command::StopwatchPause => {
                if self.stopwatch.pause(now) {
                    self.stopwatch_slot.clear(&mut self.driver);
                }
                vec![self.stopwatch_event(now)]
            }
            Command::StopwatchReset => {
                self.stopwatch.reset();
                self.stopwatch_slot.clear(&mut self.driver);
                vec![self.stopwatch_event(now)]
            }
            Command::StopwatchLap => self
                .stopwatch
                .lap(now)
                .map(ClockEvent::LapRecorded)
                .into_iter()
                .collect(),
            Command::TimerStart {
                hours,
                minutes,
                seconds,
            } => {
                self.timer.configure(hours, minutes, seconds)?;
                self.timer.start();
                self.timer_slot.replace(&mut self.driver, TICK_MS, now);
                vec![self.timer_event()]
            }
            Command::TimerPause => {
                if !self.timer.toggle_pause() {
                    return Ok(Vec::new());
                }
                if self.timer.phase() == TimerPhase::Running {
                    self.timer_slot.replace(&mut self.driver, TICK_MS, now);
                } else {
                    self.timer_slot.clear(&mut self.driver);
                }
                vec![self.timer_event()]
            }
            Command::TimerStop => {
                self.timer.stop();
                self.timer_slot.clear(&mut self.driver);
                vec![self.timer_event()]
            }
            Command::AlarmAdd {
                hour,
                minute,
                meridiem,
                days,
            } => {
                let alarm = self.alarms.add(hour, minute, meridiem, days)?;
                vec![ClockEvent::AlarmAdded(alarm)]
            }
            Command::AlarmRemove(id) => {
                self.alarms
                    .remove(id)
                    .map(|alarm| ClockEvent::AlarmRemoved(alarm.id))
                    .into_iter()
                    .collect()
            }
            Command::AlarmSetActive { id, active } => {
                if !self.alarms.set_active(id, active) {
                    return Ok(Vec::new());
                }
                self.alarms
                    .get(id)
                    .cloned()
                    .map(ClockEvent::AlarmUpdated)
                    .into_iter()
                    .collect()
            }
            Command::DismissAlarm => {
                if !self.alarm_ringing {
                    return Ok(Vec::new());
                }
                self.alarm_ringing = false;
                vec![ClockEvent::AlarmDismissed]
            }
            Command::SetTimezone(zone) => {
                self.timezone = zone;
                vec![self.settings_event()]
            }
            Command::SetSound(enabled) => {
                self.sound_enabled = enabled;
                vec![self.settings_event()]
            }
        };

        Ok(events)
    }

    /// Runs the work belonging to `handle`. Handles that no engine owns any
    /// more are ignored.
    pub fn on_driver(&mut self, handle: DriverHandle, clock: &impl WallClock) -> Vec<ClockEvent> {
        if self.clock_slot.owns(handle) {
            self.clock_tick(clock)
        } else if self.timer_slot.owns(handle) {
            self.timer_tick()
        } else if self.stopwatch_slot.owns(handle) {
            vec![self.stopwatch_event(clock.monotonic_ms())]
        } else {
            Vec::new()
        }
    }

    /// Forwards sound requests for `events` to the audio collaborator. Playback
    /// is skipped while sound is disabled; stopping is always allowed.
    pub fn play_sounds(&self, events: &[ClockEvent], audio: &mut impl AudioOutput) {
        for event in events {
            match event {
                ClockEvent::AlarmDismissed => audio.stop(SoundId::Alarm),
                ClockEvent::AlarmTriggered(_) | ClockEvent::TimerFinished if self.sound_enabled => {
                    audio.play(SoundId::Alarm)
                }
                ClockEvent::Clock(_) if self.sound_enabled && self.tick_sound => {
                    audio.play(SoundId::Tick)
                }
                _ => {}
            }
        }
    }

    fn clock_tick(&mut self, clock: &impl WallClock) -> Vec<ClockEvent> {
        let reading = self.reading(clock);
        let calendar = reading.calendar;
        let mut events = vec![ClockEvent::Clock(reading)];

        let key = (
            calendar.month,
            calendar.day_of_month,
            calendar.hour,
            calendar.minute,
        );
        if self.alarm_minute != Some(key) {
            self.alarm_minute = Some(key);
            self.fired_this_minute.clear();
        }

        for alarm in self
            .alarms
            .check_all(calendar.hour, calendar.minute, calendar.day_of_week)
        {
            if self.fired_this_minute.insert(alarm.id) {
                tracing::info!(id = alarm.id, time = %alarm.time_label(), "alarm triggered");
                self.alarm_ringing = true;
                events.push(ClockEvent::AlarmTriggered(alarm));
            }
        }

        events
    }

    fn timer_tick(&mut self) -> Vec<ClockEvent> {
        match self.timer.tick() {
            Some(TimerEvent::Finished) => {
                tracing::info!(total_ms = self.timer.total_ms(), "timer finished");
                let events = vec![self.timer_event(), ClockEvent::TimerFinished];
                self.timer.stop();
                self.timer_slot.clear(&mut self.driver);
                events
            }
            None => vec![self.timer_event()],
        }
    }

    fn stopwatch_event(&self, now: u64) -> ClockEvent {
        ClockEvent::Stopwatch {
            elapsed_ms: self.stopwatch.poll(now),
            running: self.stopwatch.is_running(),
        }
    }

    fn timer_event(&self) -> ClockEvent {
        ClockEvent::Timer {
            remaining_ms: self.timer.remaining_ms(),
            total_ms: self.timer.total_ms(),
            phase: self.timer.phase(),
            progress: self.timer.progress(),
        }
    }

    fn settings_event(&self) -> ClockEvent {
        ClockEvent::Settings {
            timezone: self.timezone.label(),
            sound_enabled: self.sound_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{audio::RecordingOutput, clock::ManualClock};

    // 2024-01-01 was a Monday.
    fn clock_at(hour: u32, minute: u32, second: u32) -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, second).unwrap())
    }

    fn utc_context(clock: &ManualClock) -> ClockContext {
        let mut config = AppConfig::default();
        config.clock.timezone = "UTC".to_string();
        ClockContext::new(&config, clock).unwrap()
    }

    fn step(context: &mut ClockContext, clock: &ManualClock, ms: u64) -> Vec<ClockEvent> {
        clock.advance_ms(ms);
        context.advance(clock)
    }

    fn count_triggers(events: &[ClockEvent]) -> usize {
        events
            .iter()
            .filter(|event| matches!(event, ClockEvent::AlarmTriggered(_)))
            .count()
    }

    fn add_alarm(hour: u32, minute: u32, meridiem: Meridiem, days: Vec<DayOfWeek>) -> Command {
        Command::AlarmAdd {
            hour,
            minute,
            meridiem,
            days,
        }
    }

    #[test]
    fn emits_clock_reading_every_second() {
        let clock = clock_at(21, 5, 0);
        let mut context = utc_context(&clock);

        assert!(step(&mut context, &clock, 500).is_empty());
        let events = step(&mut context, &clock, 500);
        match events.as_slice() {
            [ClockEvent::Clock(reading)] => {
                assert_eq!(reading.digital, "9:05 PM");
                assert_eq!(reading.date, "Monday, Jan 1");
                assert_eq!(reading.timezone, "UTC");
            }
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[test]
    fn alarm_fires_once_per_matching_minute() {
        let clock = clock_at(6, 59, 58);
        let mut context = utc_context(&clock);
        context
            .apply(add_alarm(7, 0, Meridiem::Am, vec![]), &clock)
            .unwrap();
        context
            .apply(add_alarm(7, 0, Meridiem::Am, vec![DayOfWeek::Tuesday]), &clock)
            .unwrap();

        let mut triggers = 0;
        for _ in 0..120 {
            triggers += count_triggers(&step(&mut context, &clock, 1_000));
        }

        assert_eq!(triggers, 1);
        assert!(context.is_alarm_ringing());
    }

    #[test]
    fn alarm_added_mid_minute_still_fires() {
        let clock = clock_at(7, 0, 10);
        let mut context = utc_context(&clock);
        step(&mut context, &clock, 1_000);

        context
            .apply(add_alarm(7, 0, Meridiem::Am, vec![DayOfWeek::Monday]), &clock)
            .unwrap();
        let events = step(&mut context, &clock, 1_000);
        assert_eq!(count_triggers(&events), 1);
    }

    #[test]
    fn inactive_alarms_stay_silent() {
        let clock = clock_at(6, 59, 59);
        let mut context = utc_context(&clock);
        let events = context
            .apply(add_alarm(7, 0, Meridiem::Am, vec![]), &clock)
            .unwrap();
        let id = match &events[0] {
            ClockEvent::AlarmAdded(alarm) => alarm.id,
            other => panic!("unexpected event {other:?}"),
        };
        context
            .apply(Command::AlarmSetActive { id, active: false }, &clock)
            .unwrap();

        assert_eq!(count_triggers(&step(&mut context, &clock, 1_000)), 0);
    }

    #[test]
    fn timer_finishes_once_and_releases_its_driver() {
        let clock = clock_at(12, 0, 0);
        let mut context = utc_context(&clock);
        context
            .apply(
                Command::TimerStart {
                    hours: 0,
                    minutes: 0,
                    seconds: 3,
                },
                &clock,
            )
            .unwrap();
        assert_eq!(context.driver().active_count(), 2);

        let mut finished = 0;
        for _ in 0..6 {
            finished += step(&mut context, &clock, 1_000)
                .iter()
                .filter(|event| matches!(event, ClockEvent::TimerFinished))
                .count();
        }

        assert_eq!(finished, 1);
        assert_eq!(context.timer().phase(), TimerPhase::Configuring);
        assert_eq!(context.driver().active_count(), 1);
    }

    #[test]
    fn pause_and_resume_never_stack_timer_drivers() {
        let clock = clock_at(12, 0, 0);
        let mut context = utc_context(&clock);
        context
            .apply(
                Command::TimerStart {
                    hours: 0,
                    minutes: 1,
                    seconds: 0,
                },
                &clock,
            )
            .unwrap();

        for _ in 0..5 {
            context.apply(Command::TimerPause, &clock).unwrap();
            context.apply(Command::TimerPause, &clock).unwrap();
            assert_eq!(context.driver().active_count(), 2);
        }

        context.apply(Command::TimerPause, &clock).unwrap();
        assert_eq!(context.driver().active_count(), 1);
        step(&mut context, &clock, 5_000);
        assert_eq!(context.timer().remaining_ms(), 60_000);
    }

    #[test]
    fn restarting_timer_replaces_the_running_countdown() {
        let clock = clock_at(12, 0, 0);
        let mut context = utc_context(&clock);
        let start = |seconds| Command::TimerStart {
            hours: 0,
            minutes: 0,
            seconds,
        };

        context.apply(start(30), &clock).unwrap();
        step(&mut context, &clock, 1_000);
        context.apply(start(10), &clock).unwrap();
        step(&mut context, &clock, 1_000);

        assert_eq!(context.driver().active_count(), 2);
        assert_eq!(context.timer().remaining_ms(), 9_000);
    }

    #[test]
    fn stopwatch_refreshes_only_while_running() {
        let clock = clock_at(12, 0, 0);
        let mut context = utc_context(&clock);

        context.apply(Command::StopwatchStart, &clock).unwrap();
        let events = step(&mut context, &clock, 10);
        assert_eq!(
            events,
            vec![ClockEvent::Stopwatch {
                elapsed_ms: 10,
                running: true,
            }]
        );

        clock.advance_ms(240);
        let lap = context.apply(Command::StopwatchLap, &clock).unwrap();
        assert_eq!(
            lap,
            vec![ClockEvent::LapRecorded(Lap {
                index: 1,
                elapsed_ms: 250,
            })]
        );

        context.apply(Command::StopwatchPause, &clock).unwrap();
        assert_eq!(context.driver().active_count(), 1);
        assert!(context.apply(Command::StopwatchLap, &clock).unwrap().is_empty());

        context.apply(Command::StopwatchReset, &clock).unwrap();
        assert_eq!(context.stopwatch().poll(clock.monotonic_ms()), 0);
    }

    #[test]
    fn rejected_commands_leave_state_unchanged() {
        let clock = clock_at(12, 0, 0);
        let mut context = utc_context(&clock);

        let err = context
            .apply(
                Command::TimerStart {
                    hours: 0,
                    minutes: 0,
                    seconds: 0,
                },
                &clock,
            )
            .unwrap_err();
        assert!(matches!(err, ClockError::InvalidDuration { .. }));
        assert_eq!(context.driver().active_count(), 1);

        let err = context
            .apply(add_alarm(13, 0, Meridiem::Pm, vec![]), &clock)
            .unwrap_err();
        assert!(matches!(err, ClockError::InvalidTime { .. }));
        assert!(context.alarms().is_empty());

        assert!(context.apply(Command::AlarmRemove(42), &clock).unwrap().is_empty());
    }

    #[test]
    fn sounds_respect_the_sound_setting() {
        let clock = clock_at(6, 59, 59);
        let mut context = utc_context(&clock);
        context
            .apply(add_alarm(7, 0, Meridiem::Am, vec![]), &clock)
            .unwrap();

        let events = step(&mut context, &clock, 1_000);
        let mut audio = RecordingOutput::new();
        context.play_sounds(&events, &mut audio);
        assert_eq!(audio.played(), &[SoundId::Alarm]);

        context.apply(Command::SetSound(false), &clock).unwrap();
        let mut muted = RecordingOutput::new();
        context.play_sounds(&events, &mut muted);
        assert!(muted.played().is_empty());

        let dismissed = context.apply(Command::DismissAlarm, &clock).unwrap();
        assert_eq!(dismissed, vec![ClockEvent::AlarmDismissed]);
        assert!(!context.is_alarm_ringing());
    }

    #[test]
    fn timezone_changes_move_the_reading() {
        let clock = clock_at(12, 0, 0);
        let mut context = utc_context(&clock);

        let zone: TimeZoneSetting = "Asia/Tokyo".parse().unwrap();
        let events = context.apply(Command::SetTimezone(zone), &clock).unwrap();
        assert_eq!(
            events,
            vec![ClockEvent::Settings {
                timezone: "Asia/Tokyo".to_string(),
                sound_enabled: true,
            }]
        );
        assert_eq!(context.reading(&clock).digital, "9:00 PM");
    }

    #[test]
    fn unknown_configured_timezone_is_rejected() {
        let clock = clock_at(12, 0, 0);
        let mut config = AppConfig::default();
        config.clock.timezone = "Nowhere/Special".to_string();

        let err = ClockContext::new(&config, &clock).unwrap_err();
        assert!(matches!(err, ClockError::InvalidTimezone(_)));
    }
    #[test]
    fn clock_tick_interval_must_visit_every_minute() {
        let clock = clock_at(6, 59, 30);
        for interval in [0, MAX_CLOCK_TICK_MS + 1, 90_000] {
            let mut config = AppConfig::default();
            config.clock.timezone = "UTC".to_string();
            config.clock.tick_interval_ms = interval;

            let err = ClockContext::new(&config, &clock).unwrap_err();
            assert!(matches!(err, ClockError::InvalidTickInterval(ms) if ms == interval));
        }

        let mut config = AppConfig::default();
        config.clock.timezone = "UTC".to_string();
        config.clock.tick_interval_ms = MAX_CLOCK_TICK_MS;
        let mut context = ClockContext::new(&config, &clock).unwrap();
        context
            .apply(add_alarm(7, 0, Meridiem::Am, vec![]), &clock)
            .unwrap();

        let mut triggers = 0;
        for _ in 0..300 {
            triggers += count_triggers(&step(&mut context, &clock, 1_000));
        }
        assert_eq!(triggers, 1);
    }

    #[test]
    fn alarm_day_follows_the_selected_timezone() {
        // 2024-01-01 02:00 UTC is still Sunday 21:00 in New York.
        let clock = clock_at(1, 59, 59);
        let mut config = AppConfig::default();
        config.clock.timezone = "America/New_York".to_string();
        let mut context = ClockContext::new(&config, &clock).unwrap();

        context
            .apply(add_alarm(9, 0, Meridiem::Pm, vec![DayOfWeek::Sunday]), &clock)
            .unwrap();
        context
            .apply(add_alarm(9, 0, Meridiem::Pm, vec![DayOfWeek::Monday]), &clock)
            .unwrap();

        let fired: Vec<DayOfWeek> = step(&mut context, &clock, 1_000)
            .into_iter()
            .filter_map(|event| match event {
                ClockEvent::AlarmTriggered(alarm) => alarm.days.iter().next().copied(),
                _ => None,
            })
            .collect();
        assert_eq!(fired, vec![DayOfWeek::Sunday]);
    }

    #[test]
    fn removed_alarm_never_fires() {
        let clock = clock_at(6, 59, 59);
        let mut context = utc_context(&clock);
        let events = context
            .apply(add_alarm(7, 0, Meridiem::Am, vec![]), &clock)
            .unwrap();
        let id = match &events[0] {
            ClockEvent::AlarmAdded(alarm) => alarm.id,
            other => panic!("unexpected event {other:?}"),
        };

        let removed = context.apply(Command::AlarmRemove(id), &clock).unwrap();
        assert_eq!(removed, vec![ClockEvent::AlarmRemoved(id)]);
        assert_eq!(count_triggers(&step(&mut context, &clock, 1_000)), 0);
    }
}
