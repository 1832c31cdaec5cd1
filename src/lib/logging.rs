//! Logging utilities for formatted output.
//!
//! Small helpers for human-readable durations and operation timing; the
//! actual log sink is whatever the binary configures (`env_logger` in the
//! shipped CLI).

use std::time::{Duration, Instant};

/// Formats a duration in human-readable form.
///
/// # Examples
///
/// ```
/// use spyrun_lib::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(45)), "45s");
/// assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
/// assert_eq!(format_duration(Duration::from_secs(5400)), "1h 30m");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let mins = secs / 60;
        let remaining_secs = secs % 60;
        if remaining_secs == 0 { format!("{mins}m") } else { format!("{mins}m {remaining_secs}s") }
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins == 0 { format!("{hours}h") } else { format!("{hours}h {mins}m") }
    }
}

/// Operation timing helper.
///
/// Logs the start of an operation on construction and its duration when
/// [`OperationTimer::log_done`] is called.
///
/// # Examples
///
/// ```no_run
/// use spyrun_lib::logging::OperationTimer;
///
/// let timer = OperationTimer::new("spike sorting");
///
/// // ... do work ...
///
/// timer.log_done();
/// ```
pub struct OperationTimer {
    operation: String,
    start_time: Instant,
}

impl OperationTimer {
    /// Creates a new operation timer and logs the start.
    #[must_use]
    pub fn new(operation: &str) -> Self {
        log::info!("{operation} ...");
        Self { operation: operation.to_string(), start_time: Instant::now() }
    }

    /// Logs the completion with the elapsed wall-clock time.
    pub fn log_done(&self) {
        log::info!("{} completed in {}", self.operation, format_duration(self.start_time.elapsed()));
    }
}
