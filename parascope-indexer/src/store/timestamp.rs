//! Partition-timestamp derivation for block records.
//!
//! Every block row needs a `created_at` to route it into a monthly
//! partition. The authoritative source is the set-now extrinsic: the
//! well-known timestamp extrinsic whose `now` argument carries the chain's
//! wall clock in unix milliseconds. It is found by a plain substring search
//! over the serialized extrinsics payload - the first occurrence of `"now"`
//! followed by a colon and a quoted run of digits wins.
//!
//! Parachains that do not carry the set-now extrinsic still need a
//! `created_at`, so a synthetic timestamp is computed from the block id.
//! The formula is a load-bearing contract: it must stay deterministic per
//! block id, or re-ingestion would route the same block into a different
//! partition. Each wall-clock field is taken modulo its range, so every
//! block id maps to a valid time of day on the anchor date.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde_json::Value;

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Anchor for synthetic timestamps: 2020-04-01T00:00:00Z, the first
/// provisioned partition month.
pub const SYNTHETIC_EPOCH_MS: i64 = 1_585_699_200_000;

// ═══════════════════════════════════════════════════════════════════════════════
// DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Derive `created_at` for a block from its extrinsics payload, falling back
/// to the synthetic timestamp when no set-now extrinsic is found.
#[must_use]
pub fn derive_created_at(block_id: u64, extrinsics: &Value) -> DateTime<Utc> {
    // A string payload already is the serialized form; anything else is
    // serialized for the substring search.
    let raw: Cow<'_, str> = match extrinsics {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    };

    find_set_now_millis(&raw)
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(|| synthetic_timestamp(block_id))
}

/// Deterministic fallback timestamp computed from the block id alone.
///
/// Fields are decimal slices of the id, each wrapped into its wall-clock
/// range: milliseconds from the last three digits, then seconds, minutes,
/// and hours from the higher digit groups.
#[must_use]
pub fn synthetic_timestamp(block_id: u64) -> DateTime<Utc> {
    // Every field is bounded well below i64::MAX.
    #[allow(clippy::cast_possible_wrap)]
    let offset_ms = {
        let millis = (block_id % 1000) as i64;
        let seconds = ((block_id / 1000) % 60) as i64;
        let minutes = ((block_id / 60_000) % 60) as i64;
        let hours = ((block_id / 3_600_000) % 24) as i64;
        millis + seconds * 1000 + minutes * 60_000 + hours * 3_600_000
    };

    DateTime::from_timestamp_millis(SYNTHETIC_EPOCH_MS + offset_ms)
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Find the first `"now" : "<digits>"` occurrence and parse the digits as
/// unix milliseconds.
fn find_set_now_millis(raw: &str) -> Option<i64> {
    const NEEDLE: &str = "\"now\"";

    let mut search_from = 0;
    while let Some(pos) = raw[search_from..].find(NEEDLE) {
        let after = search_from + pos + NEEDLE.len();
        if let Some(ms) = parse_quoted_digits(&raw[after..]) {
            return Some(ms);
        }
        search_from = after;
    }
    None
}

/// Parse ` : "<digits>"` allowing whitespace around the colon.
fn parse_quoted_digits(rest: &str) -> Option<i64> {
    let rest = rest.trim_start().strip_prefix(':')?;
    let rest = rest.trim_start().strip_prefix('"')?;
    let end = rest.find('"')?;
    let digits = &rest[..end];

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
