// ABOUTME: Rate-limited progress reporting for long-running row loops
// ABOUTME: Emits at most one status message per wall-clock second

use std::time::{Duration, Instant};

/// Throttled status reporter.
///
/// Export and import loop over every row of every table; logging each row would
/// drown the console. `update` logs the supplied message at most once per
/// second and silently drops the rest. Progress output never affects result
/// content.
pub struct Progress {
    interval: Duration,
    last: Option<Instant>,
}

impl Progress {
    pub fn new() -> Self {
        Self::with_interval(Duration::from_secs(1))
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Log the message if the throttle interval has elapsed.
    ///
    /// The message is built lazily so the formatting cost is only paid when a
    /// message is actually emitted. Returns whether the message was logged.
    pub fn update<F: FnOnce() -> String>(&mut self, message: F) -> bool {
        let due = self
            .last
            .map_or(true, |last| last.elapsed() >= self.interval);
        if due {
            tracing::info!("{}", message());
            self.last = Some(Instant::now());
        }
        due
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}
