//! Address extraction from semi-structured block payloads.
//!
//! Substrate extrinsics are stored verbatim as JSON. Somewhere inside that
//! tree - signer fields, call arguments, nested batch calls - live the
//! account identifiers this indexer builds its address-to-block index from.
//! Rather than decode every pallet's call format, this module walks the tree
//! and collects every string that is syntactically an SS58 account id.
//!
//! # Qualification Rule
//!
//! A string qualifies as an address when both hold:
//!
//! - its length is between 45 and 50 inclusive,
//! - it begins with one of `1`, `5F`, `5G`, `5D`, `5E`, `5H`.
//!
//! # Traversal Rule
//!
//! - Map node: every key whose lowercased name contains `"id"` has its
//!   string value tested; every value is descended into regardless.
//! - Array node: every string element is tested; non-string elements are
//!   descended into.
//! - Other scalars are ignored.
//!
//! The walk uses an explicit work stack, so adversarially deep payloads
//! cannot overflow the call stack. The result is a set: duplicates are
//! suppressed, and the output is independent of traversal order.

use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Minimum length of a candidate address string.
const MIN_ADDRESS_LEN: usize = 45;

/// Maximum length of a candidate address string.
const MAX_ADDRESS_LEN: usize = 50;

/// Recognized SS58 prefixes (Polkadot-format and generic substrate accounts).
const ADDRESS_PREFIXES: [&str; 6] = ["1", "5F", "5G", "5D", "5E", "5H"];

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// A payload that was expected to decode as a JSON tree did not.
///
/// Callers log this and continue with an empty edge list for the block; a
/// malformed payload never aborts a batch.
#[derive(Debug, Error)]
#[error("payload parse error: {0}")]
pub struct PayloadParseError(#[from] serde_json::Error);

// ═══════════════════════════════════════════════════════════════════════════════
// EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Collect the set of account identifiers appearing in an extrinsics payload.
///
/// Accepts the payload as it comes back from a chain reader: either an
/// already-decoded JSON tree, or a JSON string wrapping one (some readers
/// double-encode). `Null` yields the empty set.
///
/// # Errors
///
/// Returns [`PayloadParseError`] when a string payload fails to re-parse as
/// JSON. The caller should log and treat the block as having no edges.
pub fn extract_addresses(payload: &Value) -> Result<HashSet<String>, PayloadParseError> {
    match payload {
        Value::Null => Ok(HashSet::new()),
        Value::String(raw) => {
            let parsed: Value = serde_json::from_str(raw)?;
            Ok(collect(&parsed))
        }
        other => Ok(collect(other)),
    }
}

/// Walk a decoded JSON tree, collecting qualifying strings.
fn collect(root: &Value) -> HashSet<String> {
    let mut found = HashSet::new();
    let mut stack: Vec<&Value> = vec![root];

    while let Some(node) = stack.pop() {
        match node {
            Value::Object(map) => {
                for (key, value) in map {
                    if key.to_lowercase().contains("id") {
                        if let Value::String(s) = value {
                            if looks_like_address(s) {
                                found.insert(s.clone());
                            }
                        }
                    }
                    stack.push(value);
                }
            }
            Value::Array(items) => {
                for item in items {
                    if let Value::String(s) = item {
                        if looks_like_address(s) {
                            found.insert(s.clone());
                        }
                    } else {
                        stack.push(item);
                    }
                }
            }
            _ => {}
        }
    }

    found
}

/// Check whether a string is syntactically an SS58 account id.
fn looks_like_address(s: &str) -> bool {
    (MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&s.len())
        && ADDRESS_PREFIXES.iter().any(|p| s.starts_with(p))
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
