//! Top-level wiring of the ingestion pipeline for one chain.
//!
//! The driver owns the shared pieces - chain reader, store, batching
//! buffer, metrics surfaces, cancellation token - and runs passes over
//! block-id intervals. A pass is the planner feeding two bounded queues,
//! one worker pool per queue, and a final synchronous drain of the buffer
//! so the pass's tail is durable before completion is reported.
//!
//! Transient trouble inside a pass (failed fetches, rolled-back saves) is
//! absorbed: the affected ids stay missing and the next pass re-emits them.
//! Only fatal-class errors (schema creation, lost database) escape to the
//! caller.

use std::sync::Arc;
use std::time::Duration;

use chain_reader::ReaderError;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::ingest::batcher::{BatchBuffer, FlushConfig};
use crate::ingest::reporter::StatsReporter;
use crate::ingest::tailer::LiveTailer;
use crate::ingest::{planner, workers};
use crate::metrics::SurfaceMetrics;
use crate::ports::{BlockStore, ChainReader};
use crate::store::timestamp::SYNTHETIC_EPOCH_MS;
use crate::types::ChainSpec;

// ═══════════════════════════════════════════════════════════════════════════════
// INGESTION DRIVER
// ═══════════════════════════════════════════════════════════════════════════════

/// Wires planner, queues, workers, and buffer for one (relay, chain) pair.
#[derive(Debug)]
pub struct IngestionDriver<R, S> {
    reader: Arc<R>,
    store: Arc<S>,
    chain: ChainSpec,
    batch_size: usize,
    max_workers: usize,
    flush: FlushConfig,
    buffer: BatchBuffer<S>,
    reader_metrics: Arc<SurfaceMetrics>,
    store_metrics: Arc<SurfaceMetrics>,
    cancel: CancellationToken,
}

impl<R, S> IngestionDriver<R, S>
where
    R: ChainReader + 'static,
    S: BlockStore + 'static,
{
    /// Create a driver.
    ///
    /// `batch_size` bounds both the contiguous-run length and the buffer's
    /// flush batch; `max_workers` is split evenly between the two pools.
    pub fn new(
        reader: Arc<R>,
        store: Arc<S>,
        chain: ChainSpec,
        batch_size: usize,
        max_workers: usize,
        flush_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let store_metrics = Arc::new(SurfaceMetrics::new("store"));
        let flush = FlushConfig {
            max_batch: batch_size.max(1),
            flush_interval,
        };
        let buffer = BatchBuffer::new(Arc::clone(&store), chain.clone(), Arc::clone(&store_metrics));

        Self {
            reader,
            store,
            chain,
            batch_size: batch_size.max(1),
            max_workers: max_workers.max(1),
            flush,
            buffer,
            reader_metrics: Arc::new(SurfaceMetrics::new("reader")),
            store_metrics,
            cancel,
        }
    }

    /// The driver's cancellation token.
    #[must_use]
    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The chain-reader metrics surface.
    #[must_use]
    pub fn reader_metrics(&self) -> Arc<SurfaceMetrics> {
        Arc::clone(&self.reader_metrics)
    }

    /// The store metrics surface.
    #[must_use]
    pub fn store_metrics(&self) -> Arc<SurfaceMetrics> {
        Arc::clone(&self.store_metrics)
    }

    /// Read the current chain head.
    ///
    /// # Errors
    ///
    /// Returns the reader's error when the service cannot answer.
    pub async fn head_id(&self) -> std::result::Result<u64, ReaderError> {
        self.reader.head_id(&self.cancel).await
    }

    /// Ensure the schema exists for this chain.
    ///
    /// Provisions partitions from the partition epoch through the current
    /// month.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Schema`](crate::error::IngestError::Schema) on
    /// DDL failure. Fatal.
    pub async fn ensure_schema(&self) -> Result<()> {
        let first_ts =
            DateTime::from_timestamp_millis(SYNTHETIC_EPOCH_MS).unwrap_or(DateTime::UNIX_EPOCH);
        self.store
            .create_schema(&self.chain, first_ts, Utc::now())
            .await
    }

    /// Run one ingestion pass over `[start, end]`.
    ///
    /// The interval is clamped to the current head. Missing ids are fetched
    /// and persisted; the buffer is drained before returning, so everything
    /// the pass fetched successfully is durable on return.
    ///
    /// # Errors
    ///
    /// Returns an error when the head cannot be read, an `existing_ids`
    /// query fails, or the pipeline's queues break. Per-id fetch failures
    /// are absorbed (the next pass retries them).
    #[instrument(skip(self), fields(chain = %self.chain))]
    pub async fn run_pass(&self, start: u64, end: u64) -> Result<()> {
        let head = self.head_id().await?;
        let end = end.min(head);
        if start > end {
            return Ok(());
        }

        info!(start, end, "Ingestion pass started");

        let pool_size = (self.max_workers / 2).max(1);
        let (batch_tx, batch_rx) = mpsc::channel(self.batch_size);
        let (single_tx, single_rx) = mpsc::channel(self.max_workers);

        let mut handles = workers::spawn_batch_workers(
            pool_size,
            Arc::clone(&self.reader),
            Arc::new(Mutex::new(batch_rx)),
            self.buffer.clone(),
            self.flush,
            Arc::clone(&self.reader_metrics),
            self.cancel.clone(),
        );
        handles.extend(workers::spawn_single_workers(
            pool_size,
            Arc::clone(&self.reader),
            Arc::new(Mutex::new(single_rx)),
            self.buffer.clone(),
            self.flush,
            Arc::clone(&self.reader_metrics),
            self.cancel.clone(),
        ));

        let plan_result = planner::plan_interval(
            self.store.as_ref(),
            &self.chain,
            start,
            end,
            self.batch_size,
            &batch_tx,
            &single_tx,
            &self.cancel,
        )
        .await;

        // Closing the queues signals the workers to drain and exit.
        drop(batch_tx);
        drop(single_tx);
        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!(error = %e, "Worker task failed");
            }
        }

        self.buffer.drain().await;

        info!(start, end, "Ingestion pass finished");
        plan_result
    }

    /// Run the full ingestion job: schema, backfill, then optionally live
    /// tailing until cancellation.
    ///
    /// `end_id` of `None` means "up to the current head".
    ///
    /// # Errors
    ///
    /// Returns fatal-class errors only; see [`Self::run_pass`].
    #[instrument(skip(self), fields(chain = %self.chain))]
    pub async fn run(&self, start_id: u64, end_id: Option<u64>, live: bool) -> Result<()> {
        self.ensure_schema().await?;

        let reporter = StatsReporter::new(vec![self.reader_metrics(), self.store_metrics()]);
        let reporter_cancel = self.cancel.child_token();
        let reporter_handle = tokio::spawn(reporter.run(reporter_cancel.clone()));

        let result = self.run_inner(start_id, end_id, live).await;

        reporter_cancel.cancel();
        let _ = reporter_handle.await;
        self.buffer.close().await;

        result
    }

    async fn run_inner(&self, start_id: u64, end_id: Option<u64>, live: bool) -> Result<()> {
        // A cancellation racing the head read is a clean exit, not a failure.
        let head = match self.head_id().await {
            Ok(head) => head,
            Err(ReaderError::Cancelled) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let end = end_id.map_or(head, |e| e.min(head));

        match self.run_pass(start_id, end).await {
            Ok(()) => {}
            Err(crate::error::IngestError::Reader(ReaderError::Cancelled)) => return Ok(()),
            Err(e) => return Err(e),
        }

        if let Err(e) = self.store.refresh_stats(&self.chain).await {
            warn!(error = %e, "Monthly statistics refresh failed");
        }

        if live && !self.cancel.is_cancelled() {
            let mut tailer = LiveTailer::new(end);
            tailer.run(self).await?;
        }

        Ok(())
    }
}
