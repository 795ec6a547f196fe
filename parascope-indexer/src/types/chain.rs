//! Chain identity and table-name derivation.
//!
//! One ingestion job targets exactly one (relay chain, chain) pair, and each
//! pair owns its own set of tables. Table names are derived from the pair by
//! sanitizing both components into SQL-identifier-safe form.
//!
//! # Sanitation Rule
//!
//! Lowercase, any character outside `[a-z0-9]` becomes `_`, and the relay
//! chain's name is stripped from the chain name when it appears as a prefix
//! (so `("polkadot", "PolkadotAssetHub")` and `("polkadot", "assethub")`
//! derive the same tables). The rule is applied identically on every code
//! path that derives a table name.

use std::fmt;

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN SPEC
// ═══════════════════════════════════════════════════════════════════════════════

/// Identity of one ingestion target: a (relay chain, chain) pair.
///
/// For a relay chain itself, `chain` equals `relay_chain`
/// (e.g. `("polkadot", "polkadot")`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainSpec {
    /// Relay chain name (e.g. "polkadot", "kusama").
    pub relay_chain: String,
    /// Chain name (the relay chain itself or one of its parachains).
    pub chain: String,
}

impl ChainSpec {
    /// Create a new chain spec.
    pub fn new(relay_chain: impl Into<String>, chain: impl Into<String>) -> Self {
        Self {
            relay_chain: relay_chain.into(),
            chain: chain.into(),
        }
    }

    /// Sanitized relay chain name, safe for use in SQL identifiers.
    #[must_use]
    pub fn relay_ident(&self) -> String {
        sanitize(&self.relay_chain)
    }

    /// Sanitized chain name, safe for use in SQL identifiers.
    ///
    /// The relay chain name is stripped when it prefixes the chain name.
    #[must_use]
    pub fn chain_ident(&self) -> String {
        let relay = sanitize(&self.relay_chain);
        let chain = sanitize(&self.chain);

        if chain != relay {
            if let Some(stripped) = chain.strip_prefix(&relay) {
                let stripped = stripped.trim_start_matches('_');
                if !stripped.is_empty() {
                    return stripped.to_string();
                }
            }
        }
        chain
    }

    /// Name of the partitioned block table for this pair.
    #[must_use]
    pub fn blocks_table(&self) -> String {
        format!("blocks_{}_{}", self.relay_ident(), self.chain_ident())
    }

    /// Name of the partitioned address-to-block edge table for this pair.
    #[must_use]
    pub fn edges_table(&self) -> String {
        format!("address2blocks_{}_{}", self.relay_ident(), self.chain_ident())
    }

    /// Name of the monthly statistics materialized view for this pair.
    #[must_use]
    pub fn stats_view(&self) -> String {
        format!("{}_monthly_stats", self.blocks_table())
    }
}

impl fmt::Display for ChainSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.relay_chain, self.chain)
    }
}

/// Lowercase and map every non-alphanumeric character to `_`.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() { c } else { '_' }
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
