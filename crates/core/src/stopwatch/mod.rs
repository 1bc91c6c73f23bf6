use serde::{Deserialize, Serialize};

use crate::duration::format_precise;

/// Snapshot of the elapsed time taken while the stopwatch was running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lap {
    /// 1-based position in the lap list.
    pub index: usize,
    pub elapsed_ms: u64,
}

impl Lap {
    pub fn label(&self) -> String {
        format!("Lap {}: {}", self.index, format_precise(self.elapsed_ms))
    }
}

/// Elapsed-time tracker driven by wall-clock snapshots.
///
/// While running, elapsed time is derived as `now - anchor`, where the anchor
/// is shifted back by whatever had accumulated before the last start. Pause
/// and resume cycles therefore never add up rounding drift.
#[derive(Debug, Default, Clone)]
pub struct Stopwatch {
    running: bool,
    accumulated_ms: u64,
    anchor_ms: Option<u64>,
    laps: Vec<Lap>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }

    /// Starts or resumes timing. Returns `false` if already running.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.running {
            return false;
        }

        self.anchor_ms = Some(now_ms.saturating_sub(self.accumulated_ms));
        self.running = true;
        tracing::debug!(accumulated_ms = self.accumulated_ms, "stopwatch started");
        true
    }

    /// Current elapsed milliseconds without mutating any state.
    pub fn poll(&self, now_ms: u64) -> u64 {
        match (self.running, self.anchor_ms) {
            (true, Some(anchor)) => now_ms.saturating_sub(anchor),
            _ => self.accumulated_ms,
        }
    }

    /// Freezes the elapsed time. Returns `false` if not running.
    pub fn pause(&mut self, now_ms: u64) -> bool {
        if !self.running {
            return false;
        }

        self.accumulated_ms = self.poll(now_ms);
        self.running = false;
        tracing::debug!(accumulated_ms = self.accumulated_ms, "stopwatch paused");
        true
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.accumulated_ms = 0;
        self.anchor_ms = None;
        self.laps.clear();
    }

    /// Records the current elapsed time as a lap. Ignored while stopped.
    pub fn lap(&mut self, now_ms: u64) -> Option<Lap> {
        if !self.running {
            return None;
        }

        let lap = Lap {
            index: self.laps.len() + 1,
            elapsed_ms: self.poll(now_ms),
        };
        self.laps.push(lap);
        Some(lap)
    }
}
