//! PostgreSQL implementation of the block-store port using SQLx.
//!
//! One pair of partitioned tables per (relay, chain), created idempotently
//! at startup, written through batched transactions.
//!
//! # Type Conversions
//!
//! PostgreSQL uses signed integers for numeric columns while the domain uses
//! unsigned block ids. These casts are safe because block ids won't exceed
//! `i64::MAX` (~9 quintillion).
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use tracing::{debug, instrument, warn};

use crate::error::{IngestError, Result};
use crate::extract::extract_addresses;
use crate::ports::BlockStore;
use crate::store::schema::{self, Tablespaces};
use crate::store::timestamp::derive_created_at;
use crate::types::{AddressEdge, BlockRecord, ChainSpec};

// ═══════════════════════════════════════════════════════════════════════════════
// POSTGRES STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// PostgreSQL-based store implementation.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    tablespaces: Tablespaces,
}

impl PostgresStore {
    /// Create a store around an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tablespaces: Tablespaces::default(),
        }
    }

    /// Connect to the database and create the pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Set the fast/slow tablespaces used for partition placement.
    #[must_use]
    pub fn with_tablespaces(mut self, fast: Option<String>, slow: Option<String>) -> Self {
        self.tablespaces = Tablespaces { fast, slow };
        self
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BlockStore for PostgresStore {
    #[instrument(skip(self, _first_ts, last_ts), fields(chain = %chain))]
    async fn create_schema(
        &self,
        chain: &ChainSpec,
        _first_ts: DateTime<Utc>,
        last_ts: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(&schema::catalog_table())
            .execute(&self.pool)
            .await
            .map_err(IngestError::Schema)?;

        sqlx::query("INSERT INTO chains (relay_chain, chain) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(&chain.relay_chain)
            .bind(&chain.chain)
            .execute(&self.pool)
            .await
            .map_err(IngestError::Schema)?;

        let statements = schema::chain_statements(chain, last_ts, &self.tablespaces);
        let count = statements.len();
        for statement in statements {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(IngestError::Schema)?;
        }

        debug!(statements = count, "Schema ensured");
        Ok(())
    }

    #[instrument(skip(self), fields(chain = %chain))]
    async fn existing_ids(&self, chain: &ChainSpec, lo: u64, hi: u64) -> Result<HashSet<u64>> {
        let query = format!(
            "SELECT block_id FROM {} WHERE block_id BETWEEN $1 AND $2",
            chain.blocks_table()
        );

        let ids: Vec<i64> = sqlx::query_scalar(&query)
            .bind(lo as i64)
            .bind(hi as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().map(|id| id as u64).collect())
    }

    #[instrument(skip(self, blocks), fields(chain = %chain, count = blocks.len()))]
    async fn save(&self, blocks: &[BlockRecord], chain: &ChainSpec) -> Result<()> {
        if blocks.is_empty() {
            return Ok(());
        }

        let upsert = format!(
            r#"
            INSERT INTO {} (
                block_id, created_at, hash, parent_hash, state_root,
                extrinsics_root, author_id, finalized,
                on_initialize, on_finalize, logs, extrinsics
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (block_id, created_at) DO UPDATE SET
                hash = EXCLUDED.hash,
                parent_hash = EXCLUDED.parent_hash,
                state_root = EXCLUDED.state_root,
                extrinsics_root = EXCLUDED.extrinsics_root,
                author_id = EXCLUDED.author_id,
                finalized = EXCLUDED.finalized,
                on_initialize = EXCLUDED.on_initialize,
                on_finalize = EXCLUDED.on_finalize,
                logs = EXCLUDED.logs,
                extrinsics = EXCLUDED.extrinsics
            "#,
            chain.blocks_table()
        );
        let edge_insert = format!(
            "INSERT INTO {} (address, block_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            chain.edges_table()
        );

        let mut tx = self.pool.begin().await?;

        for block in blocks {
            let created_at = derive_created_at(block.block_id, &block.extrinsics);

            sqlx::query(&upsert)
                .bind(block.block_id as i64)
                .bind(created_at)
                .bind(&block.hash)
                .bind(&block.parent_hash)
                .bind(&block.state_root)
                .bind(&block.extrinsics_root)
                .bind(block.author_id.as_deref())
                .bind(block.finalized)
                .bind(Json(&block.on_initialize))
                .bind(Json(&block.on_finalize))
                .bind(Json(&block.logs))
                .bind(Json(&block.extrinsics))
                .execute(&mut *tx)
                .await?;

            // A malformed payload costs the block its edges, never the batch.
            let addresses = match extract_addresses(&block.extrinsics) {
                Ok(addresses) => addresses,
                Err(e) => {
                    warn!(block_id = block.block_id, error = %e, "Unparseable extrinsics, no edges");
                    HashSet::new()
                }
            };

            for edge in addresses.into_iter().map(|address| AddressEdge {
                address,
                block_id: block.block_id,
            }) {
                sqlx::query(&edge_insert)
                    .bind(&edge.address)
                    .bind(edge.block_id as i64)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        debug!(count = blocks.len(), "Blocks saved");
        Ok(())
    }

    #[instrument(skip(self), fields(chain = %chain))]
    async fn refresh_stats(&self, chain: &ChainSpec) -> Result<()> {
        let query = format!("REFRESH MATERIALIZED VIEW CONCURRENTLY {}", chain.stats_view());
        sqlx::query(&query).execute(&self.pool).await?;

        debug!("Monthly statistics refreshed");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
