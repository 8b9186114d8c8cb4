use crate::board::TaskBoard;
use crate::notify::Notifier;
use crate::reminder::ScanOutcome;
use crate::storage::KeyValueStore;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

pub const SCAN_INTERVAL: Duration = Duration::from_secs(60);

/// Source of time for the polling loop.
pub trait Clock {
    fn now(&self) -> OffsetDateTime;

    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Runs one scan immediately and then one per interval. The board is reloaded
/// before every pass, so tasks added by other processes are scanned too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderLoop {
    pub interval: Duration,
    /// Stop after this many passes; `None` runs until the process exits.
    pub max_passes: Option<u64>,
}

impl Default for ReminderLoop {
    fn default() -> Self {
        Self {
            interval: SCAN_INTERVAL,
            max_passes: None,
        }
    }
}

impl ReminderLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_passes: None,
        }
    }

    pub fn with_max_passes(mut self, passes: u64) -> Self {
        self.max_passes = Some(passes);
        self
    }

    /// Whether a pass is owed, given when the last one ran.
    pub fn pass_due(&self, last_pass: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
        match last_pass {
            None => true,
            Some(last) => now - last >= self.interval,
        }
    }

    pub fn run<S, C, F>(
        &self,
        board: &mut TaskBoard<S>,
        notifier: &dyn Notifier,
        clock: &C,
        mut on_pass: F,
    ) -> u64
    where
        S: KeyValueStore,
        C: Clock,
        F: FnMut(&ScanOutcome),
    {
        info!(interval = ?self.interval, "reminder loop started");
        let mut passes = 0;

        loop {
            if let Err(err) = board.reload() {
                warn!(error = %err, "could not reload tasks; scanning the last known list");
            }
            let outcome = board.scan_reminders(notifier, clock.now());
            passes += 1;
            debug!(pass = passes, fired = outcome.fired.len(), "reminder pass");
            on_pass(&outcome);

            if self.max_passes.is_some_and(|max| passes >= max) {
                break;
            }
            clock.sleep(self.interval);
        }

        info!(passes, "reminder loop stopped");
        passes
    }
}
