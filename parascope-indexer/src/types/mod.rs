//! Domain types for the Parascope block ingestion service.
//!
//! This module contains the core types used throughout the indexer:
//!
//! - [`chain`] - Chain identity and table-name derivation (`ChainSpec`)
//! - [`block`] - The ingestion unit (`BlockRecord`) and derived edges

pub mod block;
pub mod chain;

// Re-export commonly used types at module level
pub use block::{AddressEdge, BlockRecord};
pub use chain::ChainSpec;
