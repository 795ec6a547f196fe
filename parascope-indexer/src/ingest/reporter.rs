//! Periodic one-line throughput reporting.
//!
//! Snapshots the reader and store metrics surfaces on a timer and emits one
//! log line per surface per tick. Purely observational: nothing here feeds
//! back into pipeline behavior.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::metrics::SurfaceMetrics;

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default reporting interval.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(10);

// ═══════════════════════════════════════════════════════════════════════════════
// STATS REPORTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Emits a periodic summary line for each instrumented surface.
#[derive(Debug)]
pub struct StatsReporter {
    surfaces: Vec<Arc<SurfaceMetrics>>,
    report_interval: Duration,
}

impl StatsReporter {
    /// Create a reporter over the given surfaces.
    #[must_use]
    pub fn new(surfaces: Vec<Arc<SurfaceMetrics>>) -> Self {
        Self {
            surfaces,
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }

    /// Override the reporting interval.
    #[must_use]
    pub const fn with_report_interval(mut self, report_interval: Duration) -> Self {
        self.report_interval = report_interval;
        self
    }

    /// Run until cancellation, logging one line per surface per tick.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval(self.report_interval);
        // The first tick fires immediately; skip it so the first report
        // covers a full interval.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }

            for surface in &self.surfaces {
                // Snapshot order is largest window first: 24h, 1h, 5m, 1m.
                let stats = surface.get_stats();
                info!(
                    surface = surface.name(),
                    count_24h = stats[0].count,
                    failures_24h = stats[0].failures,
                    count_1h = stats[1].count,
                    count_5m = stats[2].count,
                    count_1m = stats[3].count,
                    rate_1m = %format!("{:.1}/s", stats[3].rate),
                    avg_latency_1m = ?stats[3].avg_latency,
                    max_latency_1m = ?stats[3].max_latency,
                    "throughput"
                );
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reporter_exits_on_cancellation() {
        let reporter = StatsReporter::new(vec![Arc::new(SurfaceMetrics::new("reader"))])
            .with_report_interval(Duration::from_secs(60));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(reporter.run(cancel.clone()));
        cancel.cancel();
        handle.await.expect("reporter panicked");
    }
}
