//! In-memory store and HTTP chain-reader mocks for pipeline tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use parascope_indexer::error::Result;
use parascope_indexer::ports::BlockStore;
use parascope_indexer::types::{BlockRecord, ChainSpec};

/// Unix milliseconds of 2023-01-01T00:00:00Z; per-block timestamps step
/// forward from here by one nominal block interval.
pub const JAN_2023_MS: u64 = 1_672_531_200_000;

/// Hash marker for blocks pre-seeded directly into the store.
pub const PRESEEDED: &str = "0xpreseeded";

// ═══════════════════════════════════════════════════════════════════════════════
// IN-MEMORY STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory implementation of the block-store port.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    blocks: BTreeMap<u64, BlockRecord>,
    save_batches: Vec<Vec<u64>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pre-seed blocks as already ingested (marked with [`PRESEEDED`]).
    pub fn with_existing(ids: impl IntoIterator<Item = u64>) -> Arc<Self> {
        let store = Self::default();
        {
            let mut state = store.state.lock();
            for id in ids {
                state.blocks.insert(
                    id,
                    BlockRecord {
                        block_id: id,
                        hash: PRESEEDED.into(),
                        parent_hash: String::new(),
                        state_root: String::new(),
                        extrinsics_root: String::new(),
                        author_id: None,
                        finalized: true,
                        on_initialize: serde_json::Value::Null,
                        on_finalize: serde_json::Value::Null,
                        logs: serde_json::Value::Null,
                        extrinsics: serde_json::Value::Null,
                    },
                );
            }
        }
        Arc::new(store)
    }

    /// All stored block ids, ordered.
    pub fn block_ids(&self) -> BTreeSet<u64> {
        self.state.lock().blocks.keys().copied().collect()
    }

    /// The id lists of every `save` call, in call order.
    pub fn save_batches(&self) -> Vec<Vec<u64>> {
        self.state.lock().save_batches.clone()
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.state.lock().save_batches.len()
    }

    /// Hash of a stored block, if present.
    pub fn hash_of(&self, id: u64) -> Option<String> {
        self.state.lock().blocks.get(&id).map(|b| b.hash.clone())
    }
}

#[async_trait]
impl BlockStore for MemoryStore {
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
        lo: u64,
        hi: u64,
    ) -> Result<std::collections::HashSet<u64>> {
        Ok(self
            .state
            .lock()
            .blocks
            .range(lo..=hi)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn save(&self, blocks: &[BlockRecord], _chain: &ChainSpec) -> Result<()> {
        let mut state = self.state.lock();
        state
            .save_batches
            .push(blocks.iter().map(|b| b.block_id).collect());
        for block in blocks {
            state.blocks.insert(block.block_id, block.clone());
        }
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

// ═══════════════════════════════════════════════════════════════════════════════
// MOCK CHAIN READER (wiremock)
// ═══════════════════════════════════════════════════════════════════════════════

/// One mocked chain behind a wiremock server: a set of blocks and a movable
/// head. Serves the three chain-reader endpoints.
#[derive(Debug)]
pub struct MockChain {
    blocks: Mutex<BTreeMap<u64, serde_json::Value>>,
    head: AtomicU64,
}

impl MockChain {
    /// A chain serving the given ids with timestamps walking forward from
    /// January 2023; the head starts at the highest id.
    pub fn serving(ids: impl IntoIterator<Item = u64>) -> Arc<Self> {
        let blocks: BTreeMap<u64, serde_json::Value> =
            ids.into_iter().map(|id| (id, block_json(id))).collect();
        let head = blocks.keys().max().copied().unwrap_or(0);
        Arc::new(Self {
            blocks: Mutex::new(blocks),
            head: AtomicU64::new(head),
        })
    }

    /// Move the chain head (live-mode tests).
    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    /// Drop a block from the chain (NotFound tests).
    pub fn remove(&self, id: u64) {
        self.blocks.lock().remove(&id);
    }

    /// Mount this chain on a wiremock server.
    pub async fn mount(self: &Arc<Self>, server: &MockServer) {
        Mock::given(method("GET"))
            .respond_with(ChainResponder(Arc::clone(self)))
            .mount(server)
            .await;
    }
}

struct ChainResponder(Arc<MockChain>);

impl Respond for ChainResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let path = request.url.path();

        if path == "/blocks/head" {
            let head = self.0.head.load(Ordering::SeqCst);
            return ResponseTemplate::new(200)
                .set_body_json(json!({"number": head.to_string(), "finalized": true}));
        }

        if path == "/blocks" {
            let Some(range) = request
                .url
                .query_pairs()
                .find(|(key, _)| key == "range")
                .map(|(_, value)| value.into_owned())
            else {
                return ResponseTemplate::new(400);
            };
            let Some((start, end)) = parse_range(&range) else {
                return ResponseTemplate::new(400);
            };

            // Missing ids inside the range are omitted from the array.
            let blocks = self.0.blocks.lock();
            let body: Vec<_> = (start..=end).filter_map(|id| blocks.get(&id).cloned()).collect();
            return ResponseTemplate::new(200).set_body_json(body);
        }

        if let Some(id) = path.strip_prefix("/blocks/").and_then(|s| s.parse::<u64>().ok()) {
            return self.0.blocks.lock().get(&id).map_or_else(
                || ResponseTemplate::new(404),
                |block| ResponseTemplate::new(200).set_body_json(block.clone()),
            );
        }

        ResponseTemplate::new(404)
    }
}

fn parse_range(range: &str) -> Option<(u64, u64)> {
    let (start, end) = range.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

/// A realistic block body: set-now timestamp extrinsic plus a transfer
/// carrying an account id.
pub fn block_json(id: u64) -> serde_json::Value {
    let now_ms = JAN_2023_MS + id * 6000;
    json!({
        "number": id.to_string(),
        "hash": format!("0x{id:064x}"),
        "parentHash": format!("0x{:064x}", id.saturating_sub(1)),
        "stateRoot": "0x11",
        "extrinsicsRoot": "0x22",
        "authorId": "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY",
        "finalized": true,
        "onInitialize": {"events": []},
        "onFinalize": {"events": []},
        "logs": [],
        "extrinsics": [
            {
                "method": {"pallet": "timestamp", "method": "set"},
                "args": {"now": now_ms.to_string()}
            },
            {
                "method": {"pallet": "balances", "method": "transfer"},
                "args": {"destId": "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty"}
            }
        ]
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// REQUEST ACCOUNTING
// ═══════════════════════════════════════════════════════════════════════════════

/// Count of block-fetch requests (single and range) seen by the server.
/// Head polls are excluded.
pub async fn fetch_request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| {
            let path = r.url.path();
            path.starts_with("/blocks") && path != "/blocks/head"
        })
        .count()
}

/// The `range` query parameters of every range request, in arrival order.
pub async fn range_requests(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/blocks")
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(key, _)| key == "range")
                .map(|(_, value)| value.into_owned())
        })
        .collect()
}

/// The ids of every single-block request, in arrival order.
pub async fn single_requests(server: &MockServer) -> Vec<u64> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|r| {
            r.url
                .path()
                .strip_prefix("/blocks/")
                .filter(|rest| *rest != "head")
                .and_then(|rest| rest.parse().ok())
        })
        .collect()
}
