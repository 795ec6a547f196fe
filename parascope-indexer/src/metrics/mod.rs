//! Sliding-window metrics buckets for instrumented surfaces.
//!
//! Each instrumented surface (the chain reader and the store) owns one
//! [`SurfaceMetrics`] with four window buckets: 24 h, 1 h, 5 min, 1 min.
//! Every recorded operation feeds all four; a bucket resets itself once its
//! window has elapsed since the bucket started.
//!
//! Recording is lock-guarded per bucket; [`SurfaceMetrics::get_stats`]
//! returns a value copy, never a live view.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use parascope_indexer::metrics::SurfaceMetrics;
//!
//! let metrics = SurfaceMetrics::new("reader");
//! metrics.record(Duration::from_millis(12), 100, false);
//!
//! let stats = metrics.get_stats();
//! assert_eq!(stats[0].count, 100);
//! ```

use std::time::{Duration, Instant};

use parking_lot::Mutex;

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// The four bucket windows, largest first (matches reporting order).
pub const WINDOWS: [Duration; 4] = [
    Duration::from_secs(24 * 60 * 60),
    Duration::from_secs(60 * 60),
    Duration::from_secs(5 * 60),
    Duration::from_secs(60),
];

// ═══════════════════════════════════════════════════════════════════════════════
// BUCKET STATS
// ═══════════════════════════════════════════════════════════════════════════════

/// Value-copy snapshot of one window bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketStats {
    /// The bucket's window duration.
    pub window: Duration,
    /// Elements recorded in the current window.
    pub count: u64,
    /// Failed operations recorded in the current window.
    pub failures: u64,
    /// Mean per-operation latency.
    pub avg_latency: Duration,
    /// Fastest operation seen.
    pub min_latency: Duration,
    /// Slowest operation seen.
    pub max_latency: Duration,
    /// Elements per second: count / elapsed, with elapsed capped at the
    /// window duration.
    pub rate: f64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUCKET
// ═══════════════════════════════════════════════════════════════════════════════

/// One window's accumulator. Resets itself when the window elapses.
#[derive(Debug)]
struct Bucket {
    window: Duration,
    started_at: Instant,
    count: u64,
    failures: u64,
    operations: u64,
    total_latency: Duration,
    min_latency: Option<Duration>,
    max_latency: Duration,
}

impl Bucket {
    fn new(window: Duration) -> Self {
        Self {
            window,
            started_at: Instant::now(),
            count: 0,
            failures: 0,
            operations: 0,
            total_latency: Duration::ZERO,
            min_latency: None,
            max_latency: Duration::ZERO,
        }
    }

    /// Reset the accumulator if the window has elapsed since `started_at`.
    fn roll(&mut self) {
        if self.started_at.elapsed() >= self.window {
            *self = Self::new(self.window);
        }
    }

    fn record(&mut self, latency: Duration, elements: u64, error: bool) {
        self.roll();

        self.count += elements;
        self.operations += 1;
        if error {
            self.failures += 1;
        }
        self.total_latency += latency;
        self.min_latency = Some(self.min_latency.map_or(latency, |m| m.min(latency)));
        self.max_latency = self.max_latency.max(latency);
    }

    fn stats(&mut self) -> BucketStats {
        self.roll();

        let avg_latency = if self.operations == 0 {
            Duration::ZERO
        } else {
            self.total_latency / u32::try_from(self.operations).unwrap_or(u32::MAX)
        };

        let elapsed = self.started_at.elapsed().min(self.window);
        let rate = if elapsed.is_zero() {
            0.0
        } else {
            // Precision loss is acceptable for a rate readout.
            #[allow(clippy::cast_precision_loss)]
            let rate = self.count as f64 / elapsed.as_secs_f64();
            rate
        };

        BucketStats {
            window: self.window,
            count: self.count,
            failures: self.failures,
            avg_latency,
            min_latency: self.min_latency.unwrap_or(Duration::ZERO),
            max_latency: self.max_latency,
            rate,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SURFACE METRICS
// ═══════════════════════════════════════════════════════════════════════════════

/// Sliding-window counters for one instrumented surface.
#[derive(Debug)]
pub struct SurfaceMetrics {
    name: &'static str,
    buckets: [Mutex<Bucket>; 4],
}

impl SurfaceMetrics {
    /// Create metrics for a named surface (e.g. `"reader"`, `"store"`).
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            buckets: WINDOWS.map(|w| Mutex::new(Bucket::new(w))),
        }
    }

    /// The surface name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Record one operation: its latency, how many elements it moved, and
    /// whether it failed.
    pub fn record(&self, latency: Duration, elements: u64, error: bool) {
        for bucket in &self.buckets {
            bucket.lock().record(latency, elements, error);
        }
    }

    /// Snapshot all four buckets, largest window first.
    #[must_use]
    pub fn get_stats(&self) -> Vec<BucketStats> {
        self.buckets.iter().map(|b| b.lock().stats()).collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_feed_all_windows() {
        let metrics = SurfaceMetrics::new("test");
        metrics.record(Duration::from_millis(10), 5, false);
        metrics.record(Duration::from_millis(30), 3, true);

        let stats = metrics.get_stats();
        assert_eq!(stats.len(), 4);
        for bucket in &stats {
            assert_eq!(bucket.count, 8);
            assert_eq!(bucket.failures, 1);
        }
    }

    #[test]
    fn latency_aggregates() {
        let metrics = SurfaceMetrics::new("test");
        metrics.record(Duration::from_millis(10), 1, false);
        metrics.record(Duration::from_millis(30), 1, false);

        let stats = metrics.get_stats();
        assert_eq!(stats[0].min_latency, Duration::from_millis(10));
        assert_eq!(stats[0].max_latency, Duration::from_millis(30));
        assert_eq!(stats[0].avg_latency, Duration::from_millis(20));
    }

    #[test]
    fn empty_bucket_is_zeroed() {
        let metrics = SurfaceMetrics::new("test");
        let stats = metrics.get_stats();
        assert_eq!(stats[0].count, 0);
        assert_eq!(stats[0].failures, 0);
        assert_eq!(stats[0].avg_latency, Duration::ZERO);
        assert_eq!(stats[0].min_latency, Duration::ZERO);
    }

    #[test]
    fn rate_is_positive_after_records() {
        let metrics = SurfaceMetrics::new("test");
        metrics.record(Duration::from_millis(1), 1000, false);
        std::thread::sleep(Duration::from_millis(20));

        let stats = metrics.get_stats();
        assert!(stats[0].rate > 0.0);
    }

    #[test]
    fn bucket_rolls_after_window() {
        let mut bucket = Bucket::new(Duration::from_millis(10));
        bucket.record(Duration::from_millis(1), 7, true);
        assert_eq!(bucket.count, 7);

        std::thread::sleep(Duration::from_millis(15));
        let stats = bucket.stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.failures, 0);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let metrics = SurfaceMetrics::new("test");
        metrics.record(Duration::from_millis(1), 1, false);

        let before = metrics.get_stats();
        metrics.record(Duration::from_millis(1), 1, false);

        // The earlier snapshot is unaffected by later records.
        assert_eq!(before[0].count, 1);
        assert_eq!(metrics.get_stats()[0].count, 2);
    }

    #[test]
    fn windows_are_ordered_largest_first() {
        assert!(WINDOWS[0] > WINDOWS[1]);
        assert!(WINDOWS[1] > WINDOWS[2]);
        assert!(WINDOWS[2] > WINDOWS[3]);
        assert_eq!(WINDOWS[3], Duration::from_secs(60));
    }
}
