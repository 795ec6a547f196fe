//! Data persistence for the ingestion pipeline.
//!
//! - [`postgres`] - The PostgreSQL adapter behind the
//!   [`BlockStore`](crate::ports::BlockStore) port
//! - [`schema`] - Pure DDL generation for the partitioned per-chain layout
//! - [`timestamp`] - Partition-timestamp derivation (set-now extrinsic with
//!   a deterministic synthetic fallback)

pub mod postgres;
pub mod schema;
pub mod timestamp;

pub use postgres::PostgresStore;
