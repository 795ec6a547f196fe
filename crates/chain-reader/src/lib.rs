//! HTTP client for Parascope chain-reader services.
//!
//! Each Substrate chain tracked by Parascope is fronted by a chain-reader
//! service: a small REST server that wraps the node's RPC and serves block
//! objects over plain HTTP. This crate is the client side of that contract.
//!
//! # Crate Relationships
//!
//! This is a **low-level crate** in the Parascope stack:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Service Layer (parascope-indexer)                       │
//! │  └─ ingestion pipeline, persistence                      │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  Client Layer (chain-reader) ◄── YOU ARE HERE            │
//! │  └─ Direct REST access to one chain-reader service       │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use chain_reader::ChainReaderClient;
//! use tokio_util::sync::CancellationToken;
//!
//! let client = ChainReaderClient::new("http://localhost:8000")?;
//! let cancel = CancellationToken::new();
//!
//! let head = client.head_id(&cancel).await?;
//! let block = client.fetch_block(head, &cancel).await?;
//! ```
//!
//! # Range Fetching
//!
//! The ingestion pipeline distinguishes contiguous runs of missing blocks
//! from isolated gaps. [`ChainReaderClient::fetch_range`] honors that split:
//! a contiguous ascending run of length >= 2 becomes a single
//! `GET /blocks?range=a-b` request, anything else degrades to per-id
//! requests. The caller only relies on getting the same set of blocks back.
//!
//! # Modules
//!
//! - [`client`] - The main [`ChainReaderClient`] implementation
//! - [`config`] - Configuration options via [`ClientConfig`]
//! - [`types`] - Wire types for chain-reader responses
//! - [`error`] - Error types

#![doc(html_root_url = "https://docs.parascope.io/chain-reader")]

// ═══════════════════════════════════════════════════════════════════════════════
// MODULES
// ═══════════════════════════════════════════════════════════════════════════════

pub mod client;
pub mod config;
pub mod error;
pub mod types;

// ═══════════════════════════════════════════════════════════════════════════════
// RE-EXPORTS
// ═══════════════════════════════════════════════════════════════════════════════

// Primary types - what most users need
pub use client::ChainReaderClient;
pub use config::ClientConfig;
pub use error::{ReaderError, Result};
pub use types::BlockPayload;

// ═══════════════════════════════════════════════════════════════════════════════
// CRATE INFO
// ═══════════════════════════════════════════════════════════════════════════════

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version string.
#[must_use]
pub const fn version() -> &'static str {
    VERSION
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
