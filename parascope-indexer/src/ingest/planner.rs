//! Work discovery: walking an interval and emitting missing-id runs.
//!
//! The planner owns the "missing only" invariant. It walks the requested
//! interval in fixed slices, asks the store which ids already exist, and
//! turns the gaps into work items:
//!
//! - contiguous runs of length >= 2 go to the **batch queue** (one range
//!   fetch downstream),
//! - isolated gaps go to the **single queue** (one single-block fetch).
//!
//! A run is sealed when an existing id interrupts it, when it reaches
//! `batch_size`, or at slice end. Both queues are bounded, so a slow
//! consumer blocks the planner - that backpressure is the pipeline's
//! throttle.
//!
//! The planner is also the pipeline's retry mechanism: ids dropped anywhere
//! downstream stay absent from `existing_ids` and are re-emitted on the
//! next pass.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::error::{IngestError, Result};
use crate::ports::BlockStore;
use crate::types::ChainSpec;

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Interval slice walked per `existing_ids` query.
pub const SLICE_SIZE: u64 = 100_000;

// ═══════════════════════════════════════════════════════════════════════════════
// PLANNER
// ═══════════════════════════════════════════════════════════════════════════════

/// Walk `[start, end]` and emit every missing id into the appropriate queue.
///
/// Returns `Ok(())` on completion or cancellation (the caller closes the
/// queues by dropping the senders).
///
/// # Errors
///
/// Returns an error when an `existing_ids` query fails or a queue's
/// receiving side has gone away.
#[instrument(skip(store, batch_tx, single_tx, cancel), fields(chain = %chain))]
pub async fn plan_interval<S: BlockStore>(
    store: &S,
    chain: &ChainSpec,
    start: u64,
    end: u64,
    batch_size: usize,
    batch_tx: &mpsc::Sender<Vec<u64>>,
    single_tx: &mpsc::Sender<u64>,
    cancel: &CancellationToken,
) -> Result<()> {
    if start > end {
        return Ok(());
    }

    let mut emitted = 0u64;
    let mut lo = start;
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let hi = lo.saturating_add(SLICE_SIZE - 1).min(end);
        let existing = store.existing_ids(chain, lo, hi).await?;
        debug!(lo, hi, existing = existing.len(), "Scanning slice");

        let mut run: Vec<u64> = Vec::new();
        for id in lo..=hi {
            if existing.contains(&id) {
                if !seal(&mut run, batch_tx, single_tx, cancel).await? {
                    return Ok(());
                }
            } else {
                run.push(id);
                emitted += 1;
                if run.len() >= batch_size
                    && !seal(&mut run, batch_tx, single_tx, cancel).await?
                {
                    return Ok(());
                }
            }
        }
        if !seal(&mut run, batch_tx, single_tx, cancel).await? {
            return Ok(());
        }

        if hi == end {
            break;
        }
        lo = hi + 1;
    }

    debug!(start, end, emitted, "Interval planned");
    Ok(())
}

/// Submit the current run to its queue and reset it.
///
/// Returns `Ok(false)` when cancelled mid-send.
async fn seal(
    run: &mut Vec<u64>,
    batch_tx: &mpsc::Sender<Vec<u64>>,
    single_tx: &mpsc::Sender<u64>,
    cancel: &CancellationToken,
) -> Result<bool> {
    if run.is_empty() {
        return Ok(true);
    }

    let sealed = std::mem::take(run);
    if sealed.len() == 1 {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(false),
            result = single_tx.send(sealed[0]) => {
                result.map_err(|_| IngestError::ChannelClosed("single queue".into()))?;
            }
        }
    } else {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(false),
            result = batch_tx.send(sealed) => {
                result.map_err(|_| IngestError::ChannelClosed("batch queue".into()))?;
            }
        }
    }
    Ok(true)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
