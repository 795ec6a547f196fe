//! Parascope Block Ingestion Service
//!
//! Ingests block data for Substrate relay chains and parachains from
//! HTTP-accessible chain-reader services and materializes it into a
//! partitioned PostgreSQL store. Two modes: bulk historical backfill over a
//! block-id range, and continuous tailing of the chain head.
//!
//! # Architecture
//!
//! The service follows a hexagonal architecture:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        INGESTION CORE                           │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Planner    │─▶│   Workers    │─▶│   Batching   │           │
//! │  │ (gap finder) │  │ (two pools)  │  │    Buffer    │           │
//! │  └──────────────┘  └──────────────┘  └──────┬───────┘           │
//! │         ▲                 │                 │                   │
//! │         │                 ▼                 ▼                   │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │    Store     │  │ Chain Reader │  │    Store     │           │
//! │  │ existing_ids │  │    (HTTP)    │  │  save (tx)   │           │
//! │  └──────────────┘  └──────────────┘  └──────────────┘           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`types`] - Domain types (`ChainSpec`, `BlockRecord`)
//! - [`error`] - Layered error types
//! - [`config`] - Configuration loading and validation
//! - [`ports`] - The chain-reader and block-store trait seams
//! - [`extract`] - Address extraction from semi-structured payloads
//! - [`metrics`] - Sliding-window throughput buckets
//! - [`store`] - PostgreSQL persistence and partitioned schema
//! - [`ingest`] - The concurrent pipeline (planner, workers, buffer, tailer)
//!
//! # Getting Started
//!
//! ```bash
//! # Set up environment
//! cp .env.example .env
//! # Edit .env with your configuration
//!
//! # Create the schema and backfill, then follow the head
//! cargo run -- run --live
//! ```

#![doc(html_root_url = "https://docs.parascope.io/indexer")]

pub mod config;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod metrics;
pub mod ports;
pub mod store;
pub mod types;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version string
#[must_use]
pub const fn version() -> &'static str {
    VERSION
}
