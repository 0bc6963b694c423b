//! Formatting helpers and summaries for log output.

use std::time::{Duration, Instant};

use log::{info, warn};

use crate::metrics::BatchSummary;

/// Formats a count with comma thousands separators.
///
/// ```
/// use utgcns_lib::logging::format_count;
///
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// assert_eq!(format_count(12), "12");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats a fraction as a percentage with `decimals` places.
///
/// ```
/// use utgcns_lib::logging::format_percent;
///
/// assert_eq!(format_percent(0.9543, 2), "95.43%");
/// ```
#[must_use]
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}%", value * 100.0, decimals = decimals)
}

/// Formats a duration as `45s`, `2m 15s` or `1h 30m`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        0..60 => format!("{secs}s"),
        60..3600 => match (secs / 60, secs % 60) {
            (m, 0) => format!("{m}m"),
            (m, s) => format!("{m}m {s}s"),
        },
        _ => match (secs / 3600, (secs % 3600) / 60) {
            (h, 0) => format!("{h}h"),
            (h, m) => format!("{h}h {m}m"),
        },
    }
}

/// Formats `count` units over `duration` per second, or per minute when slower than one a
/// second.
///
/// ```
/// use utgcns_lib::logging::format_rate;
/// use std::time::Duration;
///
/// assert_eq!(format_rate(1000, Duration::from_secs(1), "tigs"), "1,000 tigs/s");
/// assert_eq!(format_rate(30, Duration::from_secs(60), "tigs"), "30.0 tigs/min");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_rate(count: u64, duration: Duration, unit: &str) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        return format!("{} {unit}/s", format_count(count));
    }
    let rate = count as f64 / secs;
    if rate >= 1.0 {
        format!("{} {unit}/s", format_count(rate as u64))
    } else {
        format!("{:.1} {unit}/min", rate * 60.0)
    }
}

/// Logs the totals of a `consensus` run.
#[allow(clippy::cast_precision_loss)]
pub fn log_batch_summary(summary: &BatchSummary) {
    info!("Consensus summary:");
    info!("  Tigs: {}", format_count(summary.tigs));
    info!("  With consensus: {}", format_count(summary.consensus));
    if summary.skipped > 0 {
        info!("  Skipped: {}", format_count(summary.skipped));
    }
    if summary.failed > 0 {
        warn!("  Failed: {}", format_count(summary.failed));
    }

    let reads = summary.placed_reads + summary.failed_reads;
    info!("  Reads placed: {}", format_count(summary.placed_reads));
    if reads > 0 {
        let rate = summary.placed_reads as f64 / reads as f64;
        info!("  Placement rate: {}", format_percent(rate, 2));
    }
    if summary.failed_reads > 0 {
        info!("  Reads not placed: {}", format_count(summary.failed_reads));
    }
    if summary.stashed_reads > 0 {
        info!("  Contained reads stashed: {}", format_count(summary.stashed_reads));
    }
    info!("  Consensus bases: {}", format_count(summary.ungapped_bases));
}

/// Logs the start of an operation and, later, how long it took.
///
/// ```no_run
/// use utgcns_lib::logging::OperationTimer;
///
/// let timer = OperationTimer::new("Computing consensus", "tigs");
/// // ... do work ...
/// timer.log_completion(250);
/// ```
pub struct OperationTimer {
    operation: String,
    unit: &'static str,
    start_time: Instant,
}

impl OperationTimer {
    #[must_use]
    pub fn new(operation: &str, unit: &'static str) -> Self {
        info!("{operation} ...");
        Self { operation: operation.to_string(), unit, start_time: Instant::now() }
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Logs the count, duration and rate.
    pub fn log_completion(&self, count: u64) {
        let duration = self.elapsed();
        info!(
            "{} completed: {} {} in {} ({})",
            self.operation,
            format_count(count),
            self.unit,
            format_duration(duration),
            format_rate(count, duration, self.unit)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0")]
    #[case(999, "999")]
    #[case(1_000, "1,000")]
    #[case(123_456, "123,456")]
    #[case(1_234_567, "1,234,567")]
    fn test_format_count(#[case] n: u64, #[case] expected: &str) {
        assert_eq!(format_count(n), expected);
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.5, 1), "50.0%");
        assert_eq!(format_percent(1.0, 0), "100%");
        assert_eq!(format_percent(0.0, 2), "0.00%");
    }

    #[rstest]
    #[case(0, "0s")]
    #[case(45, "45s")]
    #[case(60, "1m")]
    #[case(135, "2m 15s")]
    #[case(3600, "1h")]
    #[case(5400, "1h 30m")]
    fn test_format_duration(#[case] secs: u64, #[case] expected: &str) {
        assert_eq!(format_duration(Duration::from_secs(secs)), expected);
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(60, Duration::from_secs(60), "reads"), "1 reads/s");
        assert_eq!(format_rate(30, Duration::from_secs(60), "tigs"), "30.0 tigs/min");
        assert_eq!(format_rate(5, Duration::from_nanos(1), "tigs"), "5 tigs/s");
    }

    #[test]
    fn test_operation_timer_and_summary() {
        let timer = OperationTimer::new("Test", "tigs");
        timer.log_completion(10);
        log_batch_summary(&BatchSummary::default());
        log_batch_summary(&BatchSummary {
            tigs: 3,
            consensus: 1,
            failed: 1,
            skipped: 1,
            placed_reads: 9,
            failed_reads: 1,
            ..BatchSummary::default()
        });
    }
}
