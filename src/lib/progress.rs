//! Progress tracking utilities
//!
//! This module provides a thread-safe progress tracker for logging progress at
//! regular intervals. The tracker maintains an internal count and logs when
//! interval boundaries are crossed.

use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe progress tracker for logging progress at regular intervals.
///
/// Maintains an internal count and logs progress messages when the count
/// crosses interval boundaries. Safe to use from multiple threads.
///
/// # Example
/// ```
/// use fgkmer_lib::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new("Processed CBCs").with_interval(100);
///
/// for _ in 0..250 {
///     tracker.log_if_needed(1); // Logs at 100, 200
/// }
/// tracker.log_final(); // Logs "Processed CBCs 250 (complete)"
/// ```
pub struct ProgressTracker {
    /// The logging interval - progress is logged when count crosses multiples of this.
    interval: u64,
    /// Message prefix for log output.
    message: String,
    /// Internal count of items processed (thread-safe).
    count: AtomicU64,
}

impl ProgressTracker {
    /// Create a new progress tracker with the specified message.
    ///
    /// The tracker starts with a count of 0 and a default interval of 10,000.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { interval: 10_000, message: message.into(), count: AtomicU64::new(0) }
    }

    /// Set the logging interval.
    ///
    /// Progress will be logged each time the count crosses a multiple of this
    /// interval.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Current count.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Add to the count and log if an interval boundary was crossed.
    ///
    /// This method is thread-safe. It atomically adds `additional` to the
    /// internal count and logs progress for each interval boundary crossed.
    pub fn log_if_needed(&self, additional: u64) {
        if additional == 0 {
            return;
        }

        let prev = self.count.fetch_add(additional, Ordering::Relaxed);
        let new_count = prev + additional;

        let prev_intervals = prev / self.interval;
        let new_intervals = new_count / self.interval;
        for i in (prev_intervals + 1)..=new_intervals {
            info!("{} {}", self.message, i * self.interval);
        }
    }

    /// Log the final count if it did not land exactly on an interval.
    pub fn log_final(&self) {
        let count = self.count.load(Ordering::Relaxed);
        if count % self.interval != 0 {
            info!("{} {count} (complete)", self.message);
        }
    }
}
