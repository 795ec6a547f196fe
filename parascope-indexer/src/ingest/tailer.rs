//! Live tailing of the chain head.
//!
//! After a backfill completes, live mode keeps the store current: a timer
//! polls the chain head, and whenever it moves past `last_processed`, the
//! incremental interval is submitted through the same planner/worker path
//! used for backfill.
//!
//! # State Machine
//!
//! - `Idle` -> on tick -> read `head_id`. If ahead of `last_processed`,
//!   transition to `Catching`.
//! - `Catching`: run the pipeline over `(last_processed, head]`; on success
//!   set `last_processed := head`, return to `Idle`.
//! - Any error during `Catching` returns to `Idle` without advancing
//!   `last_processed` - the next tick retries idempotently.
//!
//! The tick interval sits below the chain's expected block interval, so the
//! tailer never falls behind by more than a tick. Termination is only via
//! cancellation.

use std::time::Duration;

use tokio::time::interval;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::ingest::IngestionDriver;
use crate::ports::{BlockStore, ChainReader};

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default head-poll interval; below the ~6 s Substrate block interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

// ═══════════════════════════════════════════════════════════════════════════════
// LIVE TAILER
// ═══════════════════════════════════════════════════════════════════════════════

/// Polls the chain head and feeds the incremental tail into the pipeline.
#[derive(Debug)]
pub struct LiveTailer {
    tick_interval: Duration,
    last_processed: u64,
}

impl LiveTailer {
    /// Create a tailer that considers everything up to and including
    /// `last_processed` already ingested.
    #[must_use]
    pub const fn new(last_processed: u64) -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            last_processed,
        }
    }

    /// Override the tick interval (mainly for tests).
    #[must_use]
    pub const fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// The highest block id successfully processed so far.
    #[must_use]
    pub const fn last_processed(&self) -> u64 {
        self.last_processed
    }

    /// Run until cancellation.
    ///
    /// # Errors
    ///
    /// Infallible in practice: head-read and catch-up failures are absorbed
    /// (logged, retried next tick). The `Result` is kept for parity with the
    /// driver surface.
    #[instrument(skip(self, driver), fields(from = self.last_processed))]
    pub async fn run<R, S>(&mut self, driver: &IngestionDriver<R, S>) -> Result<()>
    where
        R: ChainReader + 'static,
        S: BlockStore + 'static,
    {
        info!(last_processed = self.last_processed, "Live tail started");
        let mut ticker = interval(self.tick_interval);

        loop {
            tokio::select! {
                biased;
                () = driver.cancel_token().cancelled() => {
                    info!(last_processed = self.last_processed, "Live tail cancelled");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            let head = match driver.head_id().await {
                Ok(head) => head,
                Err(e) => {
                    warn!(error = %e, "Head read failed, will retry");
                    continue;
                }
            };

            if head <= self.last_processed {
                continue;
            }

            match driver.run_pass(self.last_processed + 1, head).await {
                Ok(()) => {
                    debug!(from = self.last_processed + 1, to = head, "Caught up to head");
                    self.last_processed = head;
                }
                // last_processed stays put; the next tick retries the same span.
                Err(e) => warn!(error = %e, "Catch-up failed, will retry"),
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
