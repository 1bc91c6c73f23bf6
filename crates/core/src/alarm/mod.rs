use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{ClockError, Result};

pub type AlarmId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    /// Meridiem of a 24-hour clock hour.
    pub fn of_hour24(hour24: u32) -> Self {
        if hour24 >= 12 {
            Meridiem::Pm
        } else {
            Meridiem::Am
        }
    }
}

impl fmt::Display for Meridiem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Meridiem::Am => f.write_str("AM"),
            Meridiem::Pm => f.write_str("PM"),
        }
    }
}

impl FromStr for Meridiem {
    type Err = ClockError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "AM" => Ok(Meridiem::Am),
            "PM" => Ok(Meridiem::Pm),
            _ => Err(ClockError::msg(format!("expected AM or PM, got `{s}`"))),
        }
    }
}

/// Day of the week numbered from Sunday = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Sunday = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
}

const WEEK: [DayOfWeek; 7] = [
    DayOfWeek::Sunday,
    DayOfWeek::Monday,
    DayOfWeek::Tuesday,
    DayOfWeek::Wednesday,
    DayOfWeek::Thursday,
    DayOfWeek::Friday,
    DayOfWeek::Saturday,
];

impl DayOfWeek {
    pub fn from_index(index: u32) -> Option<Self> {
        WEEK.get(index as usize).copied()
    }

    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            DayOfWeek::Sunday => "Sunday",
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
        }
    }

    pub fn short_name(self) -> &'static str {
        &self.name()[..3]
    }
}

impl FromStr for DayOfWeek {
    type Err = ClockError;

    /// Accepts an index (`0`-`6`) or an English name, full or abbreviated.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Ok(index) = trimmed.parse::<u32>() {
            return Self::from_index(index)
                .ok_or_else(|| ClockError::msg(format!("day index {index} is outside 0-6")));
        }

        let lower = trimmed.to_ascii_lowercase();
        WEEK.iter()
            .copied()
            .find(|day| {
                let name = day.name().to_ascii_lowercase();
                lower.len() >= 3 && name.starts_with(&lower)
            })
            .ok_or_else(|| ClockError::msg(format!("unknown day `{s}`")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: AlarmId,
    /// Hour on a 12-hour dial, 1-12.
    pub hour: u32,
    pub minute: u32,
    pub meridiem: Meridiem,
    /// Days the alarm repeats on. Empty means it fires on any day.
    pub days: BTreeSet<DayOfWeek>,
    pub active: bool,
}

impl Alarm {
    /// Converts the 12-hour dial time into a 0-23 hour.
    pub fn hour24(&self) -> u32 {
        match (self.meridiem, self.hour) {
            (Meridiem::Pm, hour) if hour != 12 => hour + 12,
            (Meridiem::Am, 12) => 0,
            (_, hour) => hour,
        }
    }

    pub fn matches(&self, hour24: u32, minute: u32, day: DayOfWeek) -> bool {
        self.hour24() == hour24
            && self.minute == minute
            && (self.days.is_empty() || self.days.contains(&day))
    }

    pub fn is_one_shot(&self) -> bool {
        self.days.is_empty()
    }

    /// Time as shown in the alarm list, e.g. `7:05 PM`.
    pub fn time_label(&self) -> String {
        format!("{}:{:02} {}", self.hour, self.minute, self.meridiem)
    }

    /// `Once` for day-less alarms, otherwise e.g. `Mon, Wed`.
    pub fn days_label(&self) -> String {
        if self.days.is_empty() {
            return "Once".to_string();
        }

        self.days
            .iter()
            .map(|day| day.short_name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Owns every alarm for the lifetime of the process.
#[derive(Debug)]
pub struct AlarmRegistry {
    alarms: Vec<Alarm>,
    next_id: AlarmId,
}

impl Default for AlarmRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmRegistry {
    pub fn new() -> Self {
        Self {
            alarms: Vec::new(),
            next_id: 1,
        }
    }

    pub fn add(
        &mut self,
        hour: u32,
        minute: u32,
        meridiem: Meridiem,
        days: impl IntoIterator<Item = DayOfWeek>,
    ) -> Result<Alarm> {
        if !(1..=12).contains(&hour) || minute > 59 {
            return Err(ClockError::InvalidTime { hour, minute });
        }

        let alarm = Alarm {
            id: self.next_id,
            hour,
            minute,
            meridiem,
            days: days.into_iter().collect(),
            active: true,
        };
        self.next_id += 1;

        tracing::debug!(id = alarm.id, time = %alarm.time_label(), days = %alarm.days_label(), "alarm added");
        self.alarms.push(alarm.clone());
        Ok(alarm)
    }

    /// Removes the alarm with `id`, returning it if it existed.
    pub fn remove(&mut self, id: AlarmId) -> Option<Alarm> {
        let position = self.alarms.iter().position(|alarm| alarm.id == id)?;
        Some(self.alarms.remove(position))
    }

    pub fn get(&self, id: AlarmId) -> Option<&Alarm> {
        self.alarms.iter().find(|alarm| alarm.id == id)
    }

    /// Enables or disables an alarm without removing it. Returns `false` for
    /// unknown ids.
    pub fn set_active(&mut self, id: AlarmId, active: bool) -> bool {
        match self.alarms.iter_mut().find(|alarm| alarm.id == id) {
            Some(alarm) => {
                alarm.active = active;
                true
            }
            None => false,
        }
    }

    pub fn list(&self) -> &[Alarm] {
        &self.alarms
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    /// Every active alarm that matches the given moment, in insertion order.
    pub fn check_all(&self, hour24: u32, minute: u32, day: DayOfWeek) -> Vec<Alarm> {
        self.alarms
            .iter()
            .filter(|alarm| alarm.active && alarm.matches(hour24, minute, day))
            .cloned()
            .collect()
    }
}
