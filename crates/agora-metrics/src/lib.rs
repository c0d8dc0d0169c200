//! Latency tracking and metrics with HdrHistogram.
//!
//! Records how long the exchange spends processing each event, in
//! nanoseconds, and summarizes the distribution to the log.

use hdrhistogram::Histogram;
use tracing::info;

pub use hdrhistogram::CreationError;

/// High-precision latency histogram.
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

impl LatencyHistogram {
    /// Create a new histogram with 3 significant digits.
    pub fn new() -> Result<Self, CreationError> {
        Self::with_precision(3)
    }

    /// Create with custom precision (1-5 significant digits).
    pub fn with_precision(sigfig: u8) -> Result<Self, CreationError> {
        Ok(Self {
            histogram: Histogram::new(sigfig)?,
        })
    }

    /// Record a latency value in nanoseconds.
    #[inline(always)]
    pub fn record(&mut self, nanos: u64) {
        // Auto-resizing histogram, only fails on u64 overflow.
        let _ = self.histogram.record(nanos);
    }

    /// Get value at percentile (0.0 - 100.0).
    pub fn value_at_percentile(&self, percentile: f64) -> u64 {
        self.histogram.value_at_quantile(percentile / 100.0)
    }

    /// Get P50 (median) latency.
    pub fn p50(&self) -> u64 {
        self.value_at_percentile(50.0)
    }

    /// Get P90 latency.
    pub fn p90(&self) -> u64 {
        self.value_at_percentile(90.0)
    }

    /// Get P99 latency.
    pub fn p99(&self) -> u64 {
        self.value_at_percentile(99.0)
    }

    /// Get maximum latency.
    pub fn max(&self) -> u64 {
        self.histogram.max()
    }

    /// Get total count of recorded values.
    pub fn count(&self) -> u64 {
        self.histogram.len()
    }

    /// Log a one-line summary of the distribution.
    pub fn log_summary(&self, label: &str) {
        if self.count() == 0 {
            info!(target: "agora::metrics", "{}: no samples", label);
            return;
        }

        info!(
            target: "agora::metrics",
            count = self.count(),
            "{}: P50 {}, P90 {}, P99 {}, max {}",
            label,
            Self::format_latency(self.p50()),
            Self::format_latency(self.p90()),
            Self::format_latency(self.p99()),
            Self::format_latency(self.max()),
        );
    }

    /// Format latency with appropriate units.
    pub fn format_latency(nanos: u64) -> String {
        if nanos < 1_000 {
            format!("{} ns", nanos)
        } else if nanos < 1_000_000 {
            format!("{:.2} μs", nanos as f64 / 1_000.0)
        } else if nanos < 1_000_000_000 {
            format!("{:.2} ms", nanos as f64 / 1_000_000.0)
        } else {
            format!("{:.2} s", nanos as f64 / 1_000_000_000.0)
        }
    }
}

/// Low-overhead timer backed by the TSC where available.
pub struct EventTimer {
    clock: quanta::Clock,
}

impl EventTimer {
    /// Create a new timer.
    pub fn new() -> Self {
        Self {
            clock: quanta::Clock::new(),
        }
    }

    /// Get current raw timestamp.
    #[inline(always)]
    pub fn now(&self) -> u64 {
        self.clock.raw()
    }

    /// Convert a pair of raw timestamps to elapsed nanoseconds.
    #[inline(always)]
    pub fn delta_as_nanos(&self, start: u64, end: u64) -> u64 {
        self.clock.delta_as_nanos(start, end)
    }

    /// Nanoseconds elapsed since `start`.
    #[inline(always)]
    pub fn elapsed_nanos(&self, start: u64) -> u64 {
        self.delta_as_nanos(start, self.now())
    }
}

impl Default for EventTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_basic() {
        let mut h = LatencyHistogram::new().unwrap();

        for i in 1..=100 {
            h.record(i * 100);
        }

        assert_eq!(h.count(), 100);
        assert!(h.p50() >= 4900 && h.p50() <= 5100);
        // HdrHistogram may round max value slightly
        assert!(h.max() >= 10000 && h.max() <= 10100);
    }

    #[test]
    fn test_invalid_precision() {
        assert!(LatencyHistogram::with_precision(9).is_err());
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(LatencyHistogram::format_latency(500), "500 ns");
        assert_eq!(LatencyHistogram::format_latency(5000), "5.00 μs");
        assert_eq!(LatencyHistogram::format_latency(5_000_000), "5.00 ms");
    }

    #[test]
    fn test_timer_monotonic() {
        let timer = EventTimer::new();
        let start = timer.now();
        let end = timer.now();
        assert!(timer.delta_as_nanos(start, end) < 1_000_000_000);
        let _ = timer.elapsed_nanos(start);
    }
}
