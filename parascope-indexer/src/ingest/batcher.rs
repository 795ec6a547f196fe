//! Batching buffer between the fetchers and the store.
//!
//! Fetchers hand blocks over one run at a time; the store amortizes best
//! over larger transactions. This buffer sits between them, accumulating
//! pending blocks and flushing on three triggers:
//!
//! - **size**: the pending list reaches `max_batch`,
//! - **time**: `flush_interval` elapses since the timer was armed,
//! - **shutdown**: [`BatchBuffer::close`] drains synchronously.
//!
//! The flush configuration is captured on the first `submit` and treated as
//! immutable for the buffer's lifetime; re-binding it mid-run is
//! unsupported.
//!
//! # Failure Handling
//!
//! A failed `save` logs and drops its items. The buffer keeps nothing for
//! retry: the dropped ids stay absent from the store, and the planner's gap
//! detection re-discovers them on its next pass.
//!
//! # Ordering
//!
//! Within a single `save` call, blocks appear in submission order. Across
//! `save` calls, no ordering is guaranteed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::metrics::SurfaceMetrics;
use crate::ports::BlockStore;
use crate::types::{BlockRecord, ChainSpec};

// ═══════════════════════════════════════════════════════════════════════════════
// FLUSH CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Flush triggers for the buffer, pinned on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushConfig {
    /// Pending-list length that triggers a synchronous flush.
    pub max_batch: usize,
    /// Idle interval after which the timer flushes whatever is pending.
    pub flush_interval: Duration,
}

// ═══════════════════════════════════════════════════════════════════════════════
// BATCH BUFFER
// ═══════════════════════════════════════════════════════════════════════════════

/// Mutex-guarded accumulator of pending block records.
#[derive(Debug)]
pub struct BatchBuffer<S> {
    store: Arc<S>,
    chain: ChainSpec,
    metrics: Arc<SurfaceMetrics>,
    inner: Arc<Mutex<Inner>>,
    // Detached saves hold a read permit; drain takes the write side to wait
    // for them.
    in_flight: Arc<RwLock<()>>,
    shutdown: CancellationToken,
}

#[derive(Debug)]
struct Inner {
    pending: Vec<BlockRecord>,
    config: Option<FlushConfig>,
    timer_armed: bool,
}

impl<S> Clone for BatchBuffer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            chain: self.chain.clone(),
            metrics: Arc::clone(&self.metrics),
            inner: Arc::clone(&self.inner),
            in_flight: Arc::clone(&self.in_flight),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<S> BatchBuffer<S>
where
    S: BlockStore + 'static,
{
    /// Create a buffer writing to `store` for one chain.
    ///
    /// `metrics` is the store surface; every flush records its latency,
    /// element count, and outcome there.
    pub fn new(store: Arc<S>, chain: ChainSpec, metrics: Arc<SurfaceMetrics>) -> Self {
        Self {
            store,
            chain,
            metrics,
            inner: Arc::new(Mutex::new(Inner {
                pending: Vec::new(),
                config: None,
                timer_armed: false,
            })),
            in_flight: Arc::new(RwLock::new(())),
            shutdown: CancellationToken::new(),
        }
    }

    /// Append blocks to the pending list.
    ///
    /// The first call pins `config` for the buffer's lifetime; later values
    /// are ignored. Reaching `max_batch` triggers a flush immediately;
    /// otherwise the timer is armed for `flush_interval` if it isn't already.
    pub async fn submit(&self, blocks: Vec<BlockRecord>, config: FlushConfig) {
        let to_flush = {
            let mut inner = self.inner.lock().await;
            let config = *inner.config.get_or_insert(config);

            inner.pending.extend(blocks);

            if inner.pending.len() >= config.max_batch {
                Some(std::mem::take(&mut inner.pending))
            } else {
                if !inner.pending.is_empty() && !inner.timer_armed {
                    inner.timer_armed = true;
                    self.arm_timer(config.flush_interval);
                }
                None
            }
        };

        if let Some(items) = to_flush {
            self.spawn_save(items).await;
        }
    }

    /// Move the pending list aside and save it from a detached task.
    pub async fn flush(&self) {
        let items = {
            let mut inner = self.inner.lock().await;
            inner.timer_armed = false;
            std::mem::take(&mut inner.pending)
        };

        if !items.is_empty() {
            self.spawn_save(items).await;
        }
    }

    /// Drain the pending list synchronously through `store.save`, then wait
    /// for any detached flushes still in flight.
    ///
    /// Used at the end of an ingestion pass so everything the pass fetched
    /// is durable (or dropped-and-logged) before completion is reported.
    pub async fn drain(&self) {
        let items = {
            let mut inner = self.inner.lock().await;
            inner.timer_armed = false;
            std::mem::take(&mut inner.pending)
        };

        if !items.is_empty() {
            self.save_now(items).await;
        }

        drop(self.in_flight.write().await);
    }

    /// Drain remaining items synchronously, then signal shutdown to any
    /// armed timer.
    pub async fn close(&self) {
        self.drain().await;
        self.shutdown.cancel();
    }

    /// Number of blocks currently pending.
    pub async fn pending_len(&self) -> usize {
        self.inner.lock().await.pending.len()
    }

    /// Arm the flush timer; it fires once and re-arms on the next submit.
    fn arm_timer(&self, interval: Duration) {
        let buffer = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = buffer.shutdown.cancelled() => {}
                () = tokio::time::sleep(interval) => buffer.flush().await,
            }
        });
    }

    /// Save a batch from a detached task.
    ///
    /// The in-flight permit is taken before spawning so a `drain` that
    /// starts afterwards is guaranteed to wait for this save.
    async fn spawn_save(&self, items: Vec<BlockRecord>) {
        let permit = Arc::clone(&self.in_flight).read_owned().await;
        let buffer = self.clone();
        tokio::spawn(async move {
            buffer.save_now(items).await;
            drop(permit);
        });
    }

    /// Save a batch inline, recording store metrics.
    async fn save_now(&self, items: Vec<BlockRecord>) {
        let count = items.len();
        let started = Instant::now();

        let result = self.store.save(&items, &self.chain).await;
        self.metrics
            .record(started.elapsed(), count as u64, result.is_err());

        match result {
            Ok(()) => debug!(count, "Flushed batch"),
            // Dropped items become gaps again; the planner retries them.
            Err(e) => warn!(count, error = %e, "Batch save failed, dropping items"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use parking_lot::Mutex as SyncMutex;

    use super::*;
    use crate::error::Result;

    /// Mock store recording every save call.
    #[derive(Debug, Default)]
    struct RecordingStore {
        saves: SyncMutex<Vec<Vec<u64>>>,
    }

    impl RecordingStore {
        fn save_calls(&self) -> Vec<Vec<u64>> {
            self.saves.lock().clone()
        }
    }

    #[async_trait]
    impl BlockStore for RecordingStore {
        async fn create_schema(
            &self,
            _chain: &ChainSpec,
            _first_ts: DateTime<Utc>,
            _last_ts: DateTime<Utc>,
        ) -> Result<()> {
            Ok(())
        }

        async fn existing_ids(
            &self,
            _chain: &ChainSpec,
            _lo: u64,
            _hi: u64,
        ) -> Result<HashSet<u64>> {
            Ok(HashSet::new())
        }

        async fn save(&self, blocks: &[BlockRecord], _chain: &ChainSpec) -> Result<()> {
            self.saves
                .lock()
                .push(blocks.iter().map(|b| b.block_id).collect());
            Ok(())
        }

        async fn refresh_stats(&self, _chain: &ChainSpec) -> Result<()> {
            Ok(())
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        async fn close(&self) {}
    }

    fn block(id: u64) -> BlockRecord {
        BlockRecord {
            block_id: id,
            hash: format!("0x{id:x}"),
            parent_hash: String::new(),
            state_root: String::new(),
            extrinsics_root: String::new(),
            author_id: None,
            finalized: true,
            on_initialize: serde_json::Value::Null,
            on_finalize: serde_json::Value::Null,
            logs: serde_json::Value::Null,
            extrinsics: serde_json::Value::Null,
        }
    }

    fn buffer(store: &Arc<RecordingStore>) -> BatchBuffer<RecordingStore> {
        BatchBuffer::new(
            Arc::clone(store),
            ChainSpec::new("polkadot", "polkadot"),
            Arc::new(SurfaceMetrics::new("store")),
        )
    }

    async fn wait_for_saves(store: &RecordingStore, expected: usize) {
        for _ in 0..200 {
            if store.save_calls().len() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {expected} saves, got {:?}", store.save_calls());
    }

    const fn config(max_batch: usize, interval_ms: u64) -> FlushConfig {
        FlushConfig {
            max_batch,
            flush_interval: Duration::from_millis(interval_ms),
        }
    }

    #[tokio::test]
    async fn size_trigger_flushes() {
        let store = Arc::new(RecordingStore::default());
        let buffer = buffer(&store);

        buffer.submit(vec![block(1)], config(2, 60_000)).await;
        assert_eq!(buffer.pending_len().await, 1);

        buffer.submit(vec![block(2)], config(2, 60_000)).await;
        wait_for_saves(&store, 1).await;

        assert_eq!(store.save_calls(), vec![vec![1, 2]]);
        assert_eq!(buffer.pending_len().await, 0);
    }

    #[tokio::test]
    async fn timer_trigger_flushes() {
        let store = Arc::new(RecordingStore::default());
        let buffer = buffer(&store);

        buffer.submit(vec![block(1)], config(100, 30)).await;
        wait_for_saves(&store, 1).await;

        assert_eq!(store.save_calls(), vec![vec![1]]);
    }

    #[tokio::test]
    async fn close_drains_synchronously() {
        let store = Arc::new(RecordingStore::default());
        let buffer = buffer(&store);

        buffer.submit(vec![block(1), block(2)], config(100, 60_000)).await;
        buffer.close().await;

        // No waiting: close drains inline.
        assert_eq!(store.save_calls(), vec![vec![1, 2]]);
    }

    #[tokio::test]
    async fn first_config_is_pinned() {
        let store = Arc::new(RecordingStore::default());
        let buffer = buffer(&store);

        buffer.submit(vec![block(1)], config(100, 60_000)).await;
        // A later max_batch of 1 would flush immediately if it re-bound.
        buffer.submit(vec![block(2)], config(1, 60_000)).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.save_calls().is_empty());
        assert_eq!(buffer.pending_len().await, 2);
    }

    #[tokio::test]
    async fn submission_order_is_preserved_within_save() {
        let store = Arc::new(RecordingStore::default());
        let buffer = buffer(&store);

        buffer.submit(vec![block(3)], config(100, 60_000)).await;
        buffer.submit(vec![block(1), block(2)], config(100, 60_000)).await;
        buffer.close().await;

        assert_eq!(store.save_calls(), vec![vec![3, 1, 2]]);
    }

    #[tokio::test]
    async fn empty_flush_is_noop() {
        let store = Arc::new(RecordingStore::default());
        let buffer = buffer(&store);

        buffer.flush().await;
        buffer.close().await;
        assert!(store.save_calls().is_empty());
    }
}
