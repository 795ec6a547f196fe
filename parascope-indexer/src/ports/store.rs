//! Block-store port: the persist side of the pipeline.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{BlockRecord, ChainSpec};

/// Port for the durable state behind the ingestion pipeline.
///
/// # Commit Boundary
///
/// One call to [`BlockStore::save`] is one transaction: every block upsert
/// plus every derived edge insert commits or rolls back together. A failed
/// call leaves the affected ids absent from [`BlockStore::existing_ids`],
/// which is how the planner retries them.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Create the catalog row, partitioned tables, partitions, and the
    /// monthly statistics view for a chain. Idempotent.
    ///
    /// Monthly block partitions are provisioned from the configured epoch
    /// month up to the month of `last_ts` - all partitions a block in
    /// `[first_ts, last_ts]` could route to must exist before the first
    /// insert.
    ///
    /// # Errors
    ///
    /// Returns an error if any DDL statement fails. Fatal at startup.
    async fn create_schema(
        &self,
        chain: &ChainSpec,
        first_ts: DateTime<Utc>,
        last_ts: DateTime<Utc>,
    ) -> Result<()>;

    /// The set of already-ingested block ids in `[lo, hi]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn existing_ids(&self, chain: &ChainSpec, lo: u64, hi: u64) -> Result<HashSet<u64>>;

    /// Append-or-replace blocks and their derived address edges in a single
    /// transaction.
    ///
    /// Blocks upsert on `(block_id, created_at)`; edges insert-ignore on
    /// `(address, block_id)`. Within one call, blocks are written in
    /// submission order.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing from the call is
    /// then visible.
    async fn save(&self, blocks: &[BlockRecord], chain: &ChainSpec) -> Result<()>;

    /// Refresh the monthly statistics materialized view.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails.
    async fn refresh_stats(&self, chain: &ChainSpec) -> Result<()>;

    /// Check that the database is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if it is not.
    async fn ping(&self) -> Result<()>;

    /// Orderly shutdown of the underlying connections.
    async fn close(&self);
}
