//! Wire types for chain-reader responses.
//!
//! A chain-reader service wraps a Substrate node behind a small REST surface
//! and serves block objects as JSON. The shape follows the Substrate sidecar
//! convention: camelCase keys, the block number encoded as a decimal string,
//! and the per-block payloads (`onInitialize`, `onFinalize`, `logs`,
//! `extrinsics`) passed through as opaque JSON.
//!
//! Unknown fields are accepted and ignored; the opaque payloads are stored
//! verbatim downstream, so nothing inside them is interpreted here.

use serde::de::{self, Deserializer};
use serde::Deserialize;

// ═══════════════════════════════════════════════════════════════════════════════
// BLOCK PAYLOAD
// ═══════════════════════════════════════════════════════════════════════════════

/// One block object as served by a chain-reader service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPayload {
    /// Block id (height). Sidecar-style services encode this as a decimal
    /// string; plain integers are accepted too.
    #[serde(deserialize_with = "de_block_number")]
    pub number: u64,

    /// Block hash, hex string.
    #[serde(default)]
    pub hash: String,

    /// Parent block hash, hex string.
    #[serde(default)]
    pub parent_hash: String,

    /// State trie root, hex string.
    #[serde(default)]
    pub state_root: String,

    /// Extrinsics trie root, hex string.
    #[serde(default)]
    pub extrinsics_root: String,

    /// Block author identity, if the service resolves one.
    #[serde(default)]
    pub author_id: Option<String>,

    /// Whether the block is finalized.
    #[serde(default)]
    pub finalized: bool,

    /// Events emitted during block initialization, verbatim.
    #[serde(default)]
    pub on_initialize: serde_json::Value,

    /// Events emitted during block finalization, verbatim.
    #[serde(default)]
    pub on_finalize: serde_json::Value,

    /// Digest logs, verbatim.
    #[serde(default)]
    pub logs: serde_json::Value,

    /// Extrinsics with their events, verbatim. This is the payload the
    /// downstream address extraction and timestamp derivation walk.
    #[serde(default)]
    pub extrinsics: serde_json::Value,
}

/// Accept a block number as either a decimal string or a JSON integer.
fn de_block_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberRepr {
        Int(u64),
        Str(String),
    }

    match NumberRepr::deserialize(deserializer)? {
        NumberRepr::Int(n) => Ok(n),
        NumberRepr::Str(s) => s
            .parse::<u64>()
            .map_err(|_| de::Error::custom(format!("invalid block number: {s:?}"))),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
