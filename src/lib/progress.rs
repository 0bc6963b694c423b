//! Periodic progress logging, safe to share between worker threads.

use std::sync::atomic::{AtomicU64, Ordering};

use log::info;

use crate::logging::format_count;

/// Counts finished tigs and logs every time the count crosses a multiple of the interval.
///
/// ```
/// use utgcns_lib::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new("Processed").with_interval(100);
/// for _ in 0..250 {
///     tracker.record(1, 1_000); // logs at 100 and 200
/// }
/// tracker.log_final(); // "Processed 250 tigs (complete)"
/// ```
pub struct ProgressTracker {
    interval: u64,
    message: String,
    tigs: AtomicU64,
    bases: AtomicU64,
}

impl ProgressTracker {
    /// A tracker logging every 1,000 tigs.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            interval: 1_000,
            message: message.into(),
            tigs: AtomicU64::new(0),
            bases: AtomicU64::new(0),
        }
    }

    /// Sets the interval; zero is treated as one.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Adds `tigs` finished tigs holding `bases` consensus bases, logging each interval crossed.
    ///
    /// Returns true if the new count sits exactly on an interval.
    pub fn record(&self, tigs: u64, bases: u64) -> bool {
        // Tigs are counted before their bases so a snapshot never holds bases of uncounted tigs.
        let prev = self.tigs.fetch_add(tigs, Ordering::Relaxed);
        let bases = self.bases.fetch_add(bases, Ordering::Release) + bases;
        let count = prev + tigs;
        if tigs == 0 {
            return count > 0 && count.is_multiple_of(self.interval);
        }

        for milestone in (prev / self.interval + 1)..=(count / self.interval) {
            info!(
                "{} {} tigs ({} consensus bases)",
                self.message,
                format_count(milestone * self.interval),
                format_count(bases)
            );
        }
        count.is_multiple_of(self.interval)
    }

    /// Logs the final count unless the last [`record`](Self::record) already did.
    pub fn log_final(&self) {
        let (count, bases) = self.snapshot();
        if count == 0 || !count.is_multiple_of(self.interval) {
            info!(
                "{} {} tigs ({} consensus bases) (complete)",
                self.message,
                format_count(count),
                format_count(bases)
            );
        }
    }

    /// The tig and base counts, read so that every counted base belongs to a counted tig.
    #[must_use]
    pub fn snapshot(&self) -> (u64, u64) {
        let bases = self.bases.load(Ordering::Acquire);
        (self.tigs.load(Ordering::Relaxed), bases)
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.tigs.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn bases(&self) -> u64 {
        self.bases.load(Ordering::Relaxed)
    }
}
