//! The concurrent ingestion pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         Ingestion Pipeline                           │
//! │                                                                      │
//! │  ┌─────────┐   batch queue   ┌───────────────┐                       │
//! │  │         │────────────────▶│ batch workers │──┐                    │
//! │  │ planner │                 └───────────────┘  │  ┌────────┐  ┌───┐ │
//! │  │ (gaps)  │   single queue  ┌───────────────┐  ├─▶│ buffer │─▶│ DB│ │
//! │  │         │────────────────▶│single workers │──┘  └────────┘  └───┘ │
//! │  └─────────┘                 └───────────────┘                       │
//! │       ▲                                                              │
//! │       │ head poll (live mode)                                        │
//! │  ┌─────────┐                                                         │
//! │  │ tailer  │                                                         │
//! │  └─────────┘                                                         │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The planner walks the requested interval, asks the store which ids
//! already exist, and emits the gaps: contiguous runs to the batch queue,
//! isolated ids to the single queue. Two worker pools drain the queues,
//! fetch from the chain reader, and hand blocks to the batching buffer,
//! which flushes them into the store in single transactions.
//!
//! # Modules
//!
//! - [`batcher`] - time-or-size flush buffer in front of the store
//! - [`planner`] - gap discovery and run detection
//! - [`workers`] - the two fetch pools
//! - [`tailer`] - live head-tailing mode
//! - [`reporter`] - periodic throughput logging
//!
//! [`IngestionDriver`] wires the pieces together for one chain.

pub mod batcher;
mod driver;
pub mod planner;
pub mod reporter;
pub mod tailer;
pub mod workers;

pub use batcher::{BatchBuffer, FlushConfig};
pub use driver::IngestionDriver;
pub use reporter::StatsReporter;
pub use tailer::LiveTailer;
