/// Identifies one scheduled periodic callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverHandle(u64);

/// Capability that invokes work at a fixed interval.
pub trait PeriodicDriver {
    fn schedule(&mut self, interval_ms: u64, now_ms: u64) -> DriverHandle;

    /// Returns `false` if the handle was not scheduled.
    fn cancel(&mut self, handle: DriverHandle) -> bool;
}

#[derive(Debug, Clone)]
struct Entry {
    handle: DriverHandle,
    interval_ms: u64,
    next_due_ms: u64,
}

/// Poll-driven periodic driver.
///
/// The host loop sleeps until [`TickScheduler::next_deadline`] and then asks
/// which handles are [`due`](TickScheduler::due). Intervals missed while the
/// host was delayed are skipped rather than replayed.
#[derive(Debug, Default)]
pub struct TickScheduler {
    entries: Vec<Entry>,
    next_handle: u64,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_scheduled(&self, handle: DriverHandle) -> bool {
        self.entries.iter().any(|entry| entry.handle == handle)
    }

    /// Earliest time at which some handle becomes due.
    pub fn next_deadline(&self) -> Option<u64> {
        self.entries.iter().map(|entry| entry.next_due_ms).min()
    }

    /// Handles whose deadline has passed, in scheduling order. Each is
    /// reported once per call and then rescheduled after `now_ms`.
    pub fn due(&mut self, now_ms: u64) -> Vec<DriverHandle> {
        let mut fired = Vec::new();
        for entry in &mut self.entries {
            if entry.next_due_ms > now_ms {
                continue;
            }

            let behind = now_ms - entry.next_due_ms;
            let skipped = behind / entry.interval_ms;
            entry.next_due_ms += (skipped + 1) * entry.interval_ms;
            fired.push(entry.handle);
        }
        fired
    }
}

impl PeriodicDriver for TickScheduler {
    fn schedule(&mut self, interval_ms: u64, now_ms: u64) -> DriverHandle {
        let interval_ms = interval_ms.max(1);
        self.next_handle += 1;
        let handle = DriverHandle(self.next_handle);
        self.entries.push(Entry {
            handle,
            interval_ms,
            next_due_ms: now_ms + interval_ms,
        });
        tracing::trace!(?handle, interval_ms, "driver scheduled");
        handle
    }

    fn cancel(&mut self, handle: DriverHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.handle != handle);
        before != self.entries.len()
    }
}

/// Holds the single periodic driver belonging to one engine.
///
/// Scheduling through the slot always cancels the previous handle first, so
/// an engine can never end up with two overlapping tickers.
#[derive(Debug, Default)]
pub struct DriverSlot {
    handle: Option<DriverHandle>,
}

impl DriverSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Option<DriverHandle> {
        self.handle
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    pub fn owns(&self, handle: DriverHandle) -> bool {
        self.handle == Some(handle)
    }

    pub fn replace<D: PeriodicDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        interval_ms: u64,
        now_ms: u64,
    ) -> DriverHandle {
        self.clear(driver);
        let handle = driver.schedule(interval_ms, now_ms);
        self.handle = Some(handle);
        handle
    }

    pub fn clear<D: PeriodicDriver + ?Sized>(&mut self, driver: &mut D) {
        if let Some(handle) = self.handle.take() {
            driver.cancel(handle);
        }
    }
}
