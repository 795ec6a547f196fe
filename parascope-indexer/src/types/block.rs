//! The ingestion unit and its derived records.
//!
//! A [`BlockRecord`] is one block as handed from the fetchers to the
//! persistence layer. The opaque payloads (`on_initialize`, `on_finalize`,
//! `logs`, `extrinsics`) are carried verbatim; the store derives the
//! partition timestamp and the address edges from them at save time.

use chain_reader::BlockPayload;
use serde_json::Value;

// ═══════════════════════════════════════════════════════════════════════════════
// BLOCK RECORD
// ═══════════════════════════════════════════════════════════════════════════════

/// One block, as fetched from a chain reader and queued for persistence.
#[derive(Debug, Clone)]
pub struct BlockRecord {
    /// Block id (height), monotonically assigned by the chain.
    pub block_id: u64,
    /// Block hash, hex string.
    pub hash: String,
    /// Parent block hash, hex string.
    pub parent_hash: String,
    /// State trie root, hex string.
    pub state_root: String,
    /// Extrinsics trie root, hex string.
    pub extrinsics_root: String,
    /// Block author identity, when the chain reader resolves one.
    pub author_id: Option<String>,
    /// Whether the block is finalized. Mutable across re-ingestion:
    /// the upsert refreshes it (false can flip to true).
    pub finalized: bool,
    /// Events emitted during block initialization, verbatim.
    pub on_initialize: Value,
    /// Events emitted during block finalization, verbatim.
    pub on_finalize: Value,
    /// Digest logs, verbatim.
    pub logs: Value,
    /// Extrinsics with their events, verbatim. Source of the set-now
    /// timestamp and of the address edges.
    pub extrinsics: Value,
}

impl From<BlockPayload> for BlockRecord {
    fn from(payload: BlockPayload) -> Self {
        Self {
            block_id: payload.number,
            hash: payload.hash,
            parent_hash: payload.parent_hash,
            state_root: payload.state_root,
            extrinsics_root: payload.extrinsics_root,
            author_id: payload.author_id,
            finalized: payload.finalized,
            on_initialize: payload.on_initialize,
            on_finalize: payload.on_finalize,
            logs: payload.logs,
            extrinsics: payload.extrinsics,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESS EDGE
// ═══════════════════════════════════════════════════════════════════════════════

/// One `(address, block_id)` pair recording that `address` appears inside the
/// block's extrinsics. Unique per pair; never updated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressEdge {
    /// Account identifier found in the payload.
    pub address: String,
    /// Block the address appeared in.
    pub block_id: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
