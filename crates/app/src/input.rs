use theme_clock_core::{ClockError, Command, DayOfWeek, Meridiem, Result};

/// One line typed into the interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Status,
    Laps,
    Alarms,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  sw start | sw pause | sw reset | sw lap
  timer <hours> <minutes> <seconds> | timer pause | timer stop
  alarm add <h:mm> <am|pm> [days, e.g. mon,wed]
  alarm rm <id> | alarm on <id> | alarm off <id> | alarm list
  dismiss | tz <local|UTC|Area/City> | sound on|off
  status | laps | help | quit";

pub fn parse(line: &str) -> Result<Input> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let input = match words.as_slice() {
        ["sw", "start"] => Input::Command(Command::StopwatchStart),
        ["sw", "pause"] => Input::Command(Command::StopwatchPause),
        ["sw", "reset"] => Input::Command(Command::StopwatchReset),
        ["sw", "lap"] => Input::Command(Command::StopwatchLap),
        ["timer", "pause"] => Input::Command(Command::TimerPause),
        ["timer", "stop"] => Input::Command(Command::TimerStop),
        ["timer", hours, minutes, seconds] => Input::Command(Command::TimerStart {
            hours: number(hours)?,
            minutes: number(minutes)?,
            seconds: number(seconds)?,
        }),
        ["alarm", "add", time, meridiem, days @ ..] => {
            let (hour, minute) = clock_time(time)?;
            Input::Command(Command::AlarmAdd {
                hour,
                minute,
                meridiem: meridiem.parse::<Meridiem>()?,
                days: day_list(&days.join(","))?,
            })
        }
        ["alarm", "rm", id] => Input::Command(Command::AlarmRemove(number(id)?)),
        ["alarm", "on", id] => Input::Command(Command::AlarmSetActive {
            id: number(id)?,
            active: true,
        }),
        ["alarm", "off", id] => Input::Command(Command::AlarmSetActive {
            id: number(id)?,
            active: false,
        }),
        ["alarm", "list"] => Input::Alarms,
        ["dismiss"] => Input::Command(Command::DismissAlarm),
        ["tz", zone] => Input::Command(Command::SetTimezone(zone.parse()?)),
        ["sound", "on"] => Input::Command(Command::SetSound(true)),
        ["sound", "off"] => Input::Command(Command::SetSound(false)),
        ["status"] => Input::Status,
        ["laps"] => Input::Laps,
        ["help"] => Input::Help,
        ["quit"] | ["exit"] => Input::Quit,
        _ => return Err(ClockError::msg(format!("unrecognised command `{}`", line.trim()))),
    };
    Ok(input)
}

fn number<T: std::str::FromStr>(word: &str) -> Result<T> {
    word.parse()
        .map_err(|_| ClockError::msg(format!("`{word}` is not a valid number")))
}

/// Splits `h:mm` into its parts. Range checks are left to the alarm registry.
fn clock_time(word: &str) -> Result<(u32, u32)> {
    let (hour, minute) = word
        .split_once(':')
        .ok_or_else(|| ClockError::msg(format!("expected h:mm, got `{word}`")))?;
    Ok((number(hour)?, number(minute)?))
}

fn day_list(raw: &str) -> Result<Vec<DayOfWeek>> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}
