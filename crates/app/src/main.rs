mod input;

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::Duration,
};

use clap::{Parser, Subcommand};
use theme_clock_core::{
    decompose, duration::format_precise, AppConfig, AudioOutput, ClockContext, ClockEvent,
    Command, SoundId, SystemClock, WallClock,
};
use tracing_subscriber::EnvFilter;

use crate::input::Input;

fn main() -> theme_clock_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Run => run_session(&config),
        Commands::Clock { ticks } => run_clock(&config, ticks),
        Commands::Countdown {
            hours,
            minutes,
            seconds,
        } => run_countdown(&config, hours, minutes, seconds),
    }
}

fn load_config(cli: &Cli) -> theme_clock_core::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(timezone) = &cli.timezone {
        config.clock.timezone = timezone.clone();
    }
    if cli.mute {
        config.sound.enabled = false;
    }
    Ok(config)
}

fn run_session(config: &AppConfig) -> theme_clock_core::Result<()> {
    let clock = SystemClock::new();
    let mut context = ClockContext::new(config, &clock)?;
    let mut bell = TerminalBell;
    tracing::info!(timezone = %context.timezone(), "starting interactive session");

    let (sender, lines) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if sender.send(line).is_err() {
                break;
            }
        }
    });

    println!("{}", input::HELP);
    loop {
        let wait = context
            .next_deadline()
            .map(|deadline| deadline.saturating_sub(clock.monotonic_ms()))
            .unwrap_or(1_000);

        match lines.recv_timeout(Duration::from_millis(wait)) {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) => match input::parse(&line) {
                Ok(Input::Quit) => break,
                Ok(Input::Help) => println!("{}", input::HELP),
                Ok(Input::Status) => print_status(&context, &clock),
                Ok(Input::Laps) => print_laps(&context),
                Ok(Input::Alarms) => print_alarms(&context),
                Ok(Input::Command(command)) => match context.apply(command, &clock) {
                    Ok(events) => {
                        report(&events, Verbosity::Ticks);
                        context.play_sounds(&events, &mut bell);
                    }
                    Err(err) => tracing::warn!(%err, "command rejected"),
                },
                Err(err) => tracing::warn!(%err, "could not parse input"),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let events = context.advance(&clock);
        report(&events, Verbosity::Changes);
        context.play_sounds(&events, &mut bell);
    }

    tracing::info!("session ended");
    Ok(())
}

fn run_clock(config: &AppConfig, ticks: Option<u64>) -> theme_clock_core::Result<()> {
    let clock = SystemClock::new();
    let mut context = ClockContext::new(config, &clock)?;
    let mut bell = TerminalBell;
    tracing::info!(timezone = %context.timezone(), ?ticks, "showing clock");

    let mut shown = 0;
    while ticks.map_or(true, |limit| shown < limit) {
        sleep_until_due(&context, &clock);
        let events = context.advance(&clock);
        shown += events
            .iter()
            .filter(|event| matches!(event, ClockEvent::Clock(_)))
            .count() as u64;
        report(&events, Verbosity::Ticks);
        context.play_sounds(&events, &mut bell);
    }
    Ok(())
}

fn run_countdown(
    config: &AppConfig,
    hours: i64,
    minutes: i64,
    seconds: i64,
) -> theme_clock_core::Result<()> {
    let clock = SystemClock::new();
    let mut context = ClockContext::new(config, &clock)?;
    let mut bell = TerminalBell;

    let started = context.apply(
        Command::TimerStart {
            hours,
            minutes,
            seconds,
        },
        &clock,
    )?;
    tracing::info!(total_ms = context.timer().total_ms(), "countdown started");
    report(&started, Verbosity::Ticks);

    loop {
        sleep_until_due(&context, &clock);
        let events = context.advance(&clock);
        let timer_events: Vec<ClockEvent> = events
            .into_iter()
            .filter(|event| matches!(event, ClockEvent::Timer { .. } | ClockEvent::TimerFinished))
            .collect();
        report(&timer_events, Verbosity::Ticks);
        context.play_sounds(&timer_events, &mut bell);

        if timer_events.contains(&ClockEvent::TimerFinished) {
            return Ok(());
        }
    }
}

fn sleep_until_due(context: &ClockContext, clock: &SystemClock) {
    if let Some(deadline) = context.next_deadline() {
        let wait = deadline.saturating_sub(clock.monotonic_ms());
        thread::sleep(Duration::from_millis(wait));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    /// Skip periodic clock, stopwatch and timer refreshes.
    Changes,
    Ticks,
}

fn report(events: &[ClockEvent], verbosity: Verbosity) {
    for event in events {
        if let Some(line) = describe(event, verbosity) {
            println!("{line}");
        }
    }
}

fn describe(event: &ClockEvent, verbosity: Verbosity) -> Option<String> {
    let ticks = verbosity == Verbosity::Ticks;
    match event {
        ClockEvent::Clock(reading) if ticks => Some(format!(
            "{} | {} | {}",
            reading.digital, reading.date, reading.timezone
        )),
        ClockEvent::Stopwatch { elapsed_ms, .. } if ticks => {
            Some(format!("stopwatch {}", format_precise(*elapsed_ms)))
        }
        ClockEvent::Timer {
            remaining_ms,
            phase,
            progress,
            ..
        } if ticks => Some(format!(
            "timer {} {:?} ({:.0}%)",
            decompose(*remaining_ms).hms(),
            phase,
            progress * 100.0
        )),
        ClockEvent::LapRecorded(lap) => Some(lap.label()),
        ClockEvent::TimerFinished => Some("Timer finished!".to_string()),
        ClockEvent::AlarmAdded(alarm) => Some(format!(
            "alarm #{} set for {} ({})",
            alarm.id,
            alarm.time_label(),
            alarm.days_label()
        )),
        ClockEvent::AlarmRemoved(id) => Some(format!("alarm #{id} deleted")),
        ClockEvent::AlarmUpdated(alarm) => Some(format!(
            "alarm #{} {}",
            alarm.id,
            if alarm.active { "enabled" } else { "disabled" }
        )),
        ClockEvent::AlarmTriggered(alarm) => Some(format!(
            "ALARM {} -- type `dismiss` to silence",
            alarm.time_label()
        )),
        ClockEvent::AlarmDismissed => Some("alarm dismissed".to_string()),
        ClockEvent::Settings {
            timezone,
            sound_enabled,
        } => Some(format!(
            "timezone {timezone}, sound {}",
            if *sound_enabled { "on" } else { "off" }
        )),
        _ => None,
    }
}

fn print_status(context: &ClockContext, clock: &SystemClock) {
    let reading = context.reading(clock);
    println!("{} | {} | {}", reading.digital, reading.date, reading.timezone);
    println!(
        "stopwatch {} ({})",
        format_precise(context.stopwatch().poll(clock.monotonic_ms())),
        if context.stopwatch().is_running() { "running" } else { "stopped" }
    );
    println!(
        "timer {} {:?}",
        context.timer().display(),
        context.timer().phase()
    );
}

fn print_laps(context: &ClockContext) {
    if context.stopwatch().laps().is_empty() {
        println!("no laps recorded");
    }
    for lap in context.stopwatch().laps() {
        println!("{}", lap.label());
    }
}

fn print_alarms(context: &ClockContext) {
    if context.alarms().is_empty() {
        println!("no alarms set");
    }
    for alarm in context.alarms().list() {
        println!(
            "#{:<3} {:>8}  {:<24} {}",
            alarm.id,
            alarm.time_label(),
            alarm.days_label(),
            if alarm.active { "on" } else { "off" }
        );
    }
}

/// Plays sounds through the terminal bell.
struct TerminalBell;

impl AudioOutput for TerminalBell {
    fn play(&mut self, sound: SoundId) {
        if sound == SoundId::Alarm {
            let mut stdout = io::stdout();
            if let Err(err) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
                tracing::debug!(%err, "terminal bell unavailable");
            }
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Clock, stopwatch, timer and alarms", long_about = None)]
struct Cli {
    /// JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Timezone to display: `local`, `UTC` or an IANA name such as `Europe/Paris`.
    #[arg(short, long, global = true)]
    timezone: Option<String>,
    /// Disable alarm and timer sounds.
    #[arg(long, global = true)]
    mute: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive session with stopwatch, timer and alarms.
    Run,
    /// Print the clock once per second.
    Clock {
        /// Stop after this many readings.
        #[arg(short = 'n', long)]
        ticks: Option<u64>,
    },
    /// Count down from the given duration and ring when done.
    Countdown {
        #[arg(long, default_value_t = 0)]
        hours: i64,
        #[arg(long, default_value_t = 0)]
        minutes: i64,
        #[arg(long, default_value_t = 0)]
        seconds: i64,
    },
}
