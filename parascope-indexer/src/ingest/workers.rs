//! Two-tier worker pools draining the planner's queues.
//!
//! The singleton/batch split is a real optimization, not bookkeeping:
//! sending singletons through the batch path inflates HTTP cost, and
//! sending runs through the singleton path loses the range-fetch speedup.
//! Each queue gets its own pool of `max_workers / 2` tasks.
//!
//! Workers share their queue's receiver behind a mutex; the lock is held
//! only across the `recv`, never across the fetch. Every fetch outcome is
//! recorded into the reader metrics surface.
//!
//! # Failure Handling
//!
//! - `NotFound` on a single id: logged, dropped. The id stays absent from
//!   the store and a later run re-attempts it.
//! - Transport errors: logged, the id (or the whole run) is dropped; the
//!   planner's next pass retries.
//!
//! Workers exit when their queue closes or the cancellation token fires.

use std::sync::Arc;
use std::time::Instant;

use chain_reader::ReaderError;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ingest::batcher::{BatchBuffer, FlushConfig};
use crate::metrics::SurfaceMetrics;
use crate::ports::{BlockStore, ChainReader};

// ═══════════════════════════════════════════════════════════════════════════════
// QUEUE ALIASES
// ═══════════════════════════════════════════════════════════════════════════════

/// Shared receiving end of the single-id queue.
pub type SingleQueue = Arc<Mutex<mpsc::Receiver<u64>>>;

/// Shared receiving end of the batch queue.
pub type BatchQueue = Arc<Mutex<mpsc::Receiver<Vec<u64>>>>;

// ═══════════════════════════════════════════════════════════════════════════════
// POOL SPAWNING
// ═══════════════════════════════════════════════════════════════════════════════

/// Spawn the single-fetch pool: each worker receives one id, fetches one
/// block, and submits it to the buffer.
pub fn spawn_single_workers<R, S>(
    count: usize,
    reader: Arc<R>,
    queue: SingleQueue,
    buffer: BatchBuffer<S>,
    flush: FlushConfig,
    metrics: Arc<SurfaceMetrics>,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>>
where
    R: ChainReader + 'static,
    S: BlockStore + 'static,
{
    (0..count)
        .map(|worker| {
            let reader = Arc::clone(&reader);
            let queue = Arc::clone(&queue);
            let buffer = buffer.clone();
            let metrics = Arc::clone(&metrics);
            let cancel = cancel.clone();

            tokio::spawn(async move {
                loop {
                    let Some(id) = next_item(&queue, &cancel).await else {
                        debug!(worker, "Single worker exiting");
                        return;
                    };

                    let started = Instant::now();
                    match reader.fetch_block(id, &cancel).await {
                        Ok(block) => {
                            metrics.record(started.elapsed(), 1, false);
                            buffer.submit(vec![block], flush).await;
                        }
                        Err(ReaderError::Cancelled) => return,
                        Err(e) if e.is_not_found() => {
                            metrics.record(started.elapsed(), 1, true);
                            warn!(id, "Block not found, skipping");
                        }
                        Err(e) => {
                            metrics.record(started.elapsed(), 1, true);
                            warn!(id, error = %e, "Fetch failed, dropping id");
                        }
                    }
                }
            })
        })
        .collect()
}

/// Spawn the batch-fetch pool: each worker receives a contiguous run,
/// fetches it as a range, and submits the result to the buffer.
pub fn spawn_batch_workers<R, S>(
    count: usize,
    reader: Arc<R>,
    queue: BatchQueue,
    buffer: BatchBuffer<S>,
    flush: FlushConfig,
    metrics: Arc<SurfaceMetrics>,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>>
where
    R: ChainReader + 'static,
    S: BlockStore + 'static,
{
    (0..count)
        .map(|worker| {
            let reader = Arc::clone(&reader);
            let queue = Arc::clone(&queue);
            let buffer = buffer.clone();
            let metrics = Arc::clone(&metrics);
            let cancel = cancel.clone();

            tokio::spawn(async move {
                loop {
                    let Some(ids) = next_item(&queue, &cancel).await else {
                        debug!(worker, "Batch worker exiting");
                        return;
                    };

                    let started = Instant::now();
                    match reader.fetch_range(&ids, &cancel).await {
                        Ok(blocks) => {
                            metrics.record(started.elapsed(), ids.len() as u64, false);
                            buffer.submit(blocks, flush).await;
                        }
                        Err(ReaderError::Cancelled) => return,
                        // The whole run is dropped; the planner retries it.
                        Err(e) => {
                            metrics.record(started.elapsed(), ids.len() as u64, true);
                            warn!(
                                first = ?ids.first(),
                                last = ?ids.last(),
                                error = %e,
                                "Range fetch failed, dropping run"
                            );
                        }
                    }
                }
            })
        })
        .collect()
}

/// Receive the next work item, holding the queue lock only across the recv.
///
/// Returns `None` when the queue is closed or cancellation fires.
async fn next_item<T>(queue: &Arc<Mutex<mpsc::Receiver<T>>>, cancel: &CancellationToken) -> Option<T> {
    let mut rx = queue.lock().await;
    tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        item = rx.recv() => item,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use parking_lot::Mutex as SyncMutex;

    use super::*;
    use crate::error::Result;
    use crate::types::{BlockRecord, ChainSpec};

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

    /// Mock reader serving a fixed id range with configurable failures.
    #[derive(Debug, Default)]
    struct MockReader {
        blocks: HashMap<u64, BlockRecord>,
        unavailable: HashSet<u64>,
    }

    impl MockReader {
        fn serving(ids: impl IntoIterator<Item = u64>) -> Self {
            Self {
                blocks: ids.into_iter().map(|id| (id, block(id))).collect(),
                unavailable: HashSet::new(),
            }
        }

        fn with_unavailable(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
            self.unavailable = ids.into_iter().collect();
            self
        }
    }

    #[async_trait]
    impl ChainReader for MockReader {
        async fn head_id(&self, _cancel: &CancellationToken) -> std::result::Result<u64, ReaderError> {
            Ok(self.blocks.keys().copied().max().unwrap_or(0))
        }

        async fn fetch_block(
            &self,
            id: u64,
            _cancel: &CancellationToken,
        ) -> std::result::Result<BlockRecord, ReaderError> {
            if self.unavailable.contains(&id) {
                return Err(ReaderError::Unavailable("mock outage".into()));
            }
            self.blocks.get(&id).cloned().ok_or(ReaderError::NotFound(id))
        }

        async fn fetch_range(
            &self,
            ids: &[u64],
            cancel: &CancellationToken,
        ) -> std::result::Result<Vec<BlockRecord>, ReaderError> {
            let mut blocks = Vec::with_capacity(ids.len());
            for &id in ids {
                blocks.push(self.fetch_block(id, cancel).await?);
            }
            Ok(blocks)
        }

        async fn ping(&self, _cancel: &CancellationToken) -> std::result::Result<(), ReaderError> {
            Ok(())
        }
    }

    /// Mock store recording saved block ids.
    #[derive(Debug, Default)]
    struct SinkStore {
        saved: SyncMutex<Vec<u64>>,
    }

    impl SinkStore {
        fn saved_ids(&self) -> HashSet<u64> {
            self.saved.lock().iter().copied().collect()
        }
    }

    #[async_trait]
    impl BlockStore for SinkStore {
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
            self.saved.lock().extend(blocks.iter().map(|b| b.block_id));
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

    const FLUSH: FlushConfig = FlushConfig {
        max_batch: 1000,
        flush_interval: Duration::from_secs(60),
    };

    fn harness(store: &Arc<SinkStore>) -> (BatchBuffer<SinkStore>, Arc<SurfaceMetrics>) {
        let buffer = BatchBuffer::new(
            Arc::clone(store),
            ChainSpec::new("polkadot", "polkadot"),
            Arc::new(SurfaceMetrics::new("store")),
        );
        (buffer, Arc::new(SurfaceMetrics::new("reader")))
    }

    #[tokio::test]
    async fn single_workers_fetch_and_submit() {
        let reader = Arc::new(MockReader::serving(1..=5));
        let store = Arc::new(SinkStore::default());
        let (buffer, metrics) = harness(&store);

        let (tx, rx) = mpsc::channel(16);
        let handles = spawn_single_workers(
            2,
            reader,
            Arc::new(Mutex::new(rx)),
            buffer.clone(),
            FLUSH,
            metrics,
            CancellationToken::new(),
        );

        for id in 1..=5 {
            tx.send(id).await.expect("send failed");
        }
        drop(tx);
        for handle in handles {
            handle.await.expect("worker panicked");
        }
        buffer.close().await;

        assert_eq!(store.saved_ids(), (1..=5).collect());
    }

    #[tokio::test]
    async fn single_worker_drops_not_found() {
        let reader = Arc::new(MockReader::serving([1, 3]));
        let store = Arc::new(SinkStore::default());
        let (buffer, metrics) = harness(&store);

        let (tx, rx) = mpsc::channel(16);
        let handles = spawn_single_workers(
            1,
            reader,
            Arc::new(Mutex::new(rx)),
            buffer.clone(),
            FLUSH,
            Arc::clone(&metrics),
            CancellationToken::new(),
        );

        for id in [1, 2, 3] {
            tx.send(id).await.expect("send failed");
        }
        drop(tx);
        for handle in handles {
            handle.await.expect("worker panicked");
        }
        buffer.close().await;

        assert_eq!(store.saved_ids(), HashSet::from([1, 3]));
        // The miss shows up as a failure in the reader metrics.
        assert_eq!(metrics.get_stats()[0].failures, 1);
    }

    #[tokio::test]
    async fn batch_workers_fetch_ranges() {
        let reader = Arc::new(MockReader::serving(1..=10));
        let store = Arc::new(SinkStore::default());
        let (buffer, metrics) = harness(&store);

        let (tx, rx) = mpsc::channel(16);
        let handles = spawn_batch_workers(
            2,
            reader,
            Arc::new(Mutex::new(rx)),
            buffer.clone(),
            FLUSH,
            metrics,
            CancellationToken::new(),
        );

        tx.send(vec![1, 2, 3]).await.expect("send failed");
        tx.send(vec![7, 8, 9, 10]).await.expect("send failed");
        drop(tx);
        for handle in handles {
            handle.await.expect("worker panicked");
        }
        buffer.close().await;

        assert_eq!(store.saved_ids(), HashSet::from([1, 2, 3, 7, 8, 9, 10]));
    }

    #[tokio::test]
    async fn batch_worker_drops_whole_run_on_transport_error() {
        let reader = Arc::new(MockReader::serving(1..=10).with_unavailable([5]));
        let store = Arc::new(SinkStore::default());
        let (buffer, metrics) = harness(&store);

        let (tx, rx) = mpsc::channel(16);
        let handles = spawn_batch_workers(
            1,
            reader,
            Arc::new(Mutex::new(rx)),
            buffer.clone(),
            FLUSH,
            metrics,
            CancellationToken::new(),
        );

        tx.send(vec![4, 5, 6]).await.expect("send failed");
        tx.send(vec![8, 9]).await.expect("send failed");
        drop(tx);
        for handle in handles {
            handle.await.expect("worker panicked");
        }
        buffer.close().await;

        // The run containing the outage is gone entirely.
        assert_eq!(store.saved_ids(), HashSet::from([8, 9]));
    }

    #[tokio::test]
    async fn workers_exit_on_cancellation() {
        let reader = Arc::new(MockReader::serving(1..=5));
        let store = Arc::new(SinkStore::default());
        let (buffer, metrics) = harness(&store);
        let cancel = CancellationToken::new();

        let (_tx, rx) = mpsc::channel::<u64>(16);
        let handles = spawn_single_workers(
            2,
            reader,
            Arc::new(Mutex::new(rx)),
            buffer,
            FLUSH,
            metrics,
            cancel.clone(),
        );

        cancel.cancel();
        for handle in handles {
            handle.await.expect("worker panicked");
        }
    }
}
