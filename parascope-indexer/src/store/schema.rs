//! DDL generation for the partitioned per-chain schema.
//!
//! Every (relay, chain) pair owns:
//!
//! - a block table RANGE-partitioned by `created_at` month, with partitions
//!   pre-provisioned from the epoch month through the month of the newest
//!   expected block (partitions must exist before the first insert routes
//!   into them),
//! - an address-to-block edge table HASH-partitioned with a fixed modulus,
//! - a monthly statistics materialized view with a unique month index so it
//!   can be refreshed concurrently.
//!
//! Statement generation is pure (no database access) so the layout is unit
//! testable; execution lives in [`super::postgres`].
//!
//! # Tablespace Placement
//!
//! When fast/slow tablespaces are configured, the trailing 12 months are
//! placed on the fast one and older months on the slow one. This is a
//! placement hint only; with no tablespaces configured the clause is
//! omitted.

use chrono::{DateTime, Datelike, Utc};

use crate::types::ChainSpec;

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// First provisioned partition month: April 2020.
pub const PARTITION_EPOCH: (i32, u32) = (2020, 4);

/// Fixed modulus of the hash-partitioned edge table.
pub const EDGE_PARTITIONS: u32 = 4;

/// Number of trailing months placed on the fast tablespace.
const FAST_MONTHS: usize = 12;

// ═══════════════════════════════════════════════════════════════════════════════
// TABLESPACES
// ═══════════════════════════════════════════════════════════════════════════════

/// Optional fast/slow tablespace names for partition placement.
#[derive(Debug, Clone, Default)]
pub struct Tablespaces {
    /// Tablespace for recent months.
    pub fast: Option<String>,
    /// Tablespace for historical months.
    pub slow: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATEMENT GENERATION
// ═══════════════════════════════════════════════════════════════════════════════

/// DDL creating the catalog table. Shared across all chains.
#[must_use]
pub fn catalog_table() -> String {
    r#"
    CREATE TABLE IF NOT EXISTS chains (
        relay_chain TEXT NOT NULL,
        chain TEXT NOT NULL,
        registered_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (relay_chain, chain)
    )
    "#
    .to_string()
}

/// All DDL statements for one chain's tables, in execution order.
///
/// Partitions cover every month from [`PARTITION_EPOCH`] through the month
/// of `last_ts` inclusive.
#[must_use]
pub fn chain_statements(
    chain: &ChainSpec,
    last_ts: DateTime<Utc>,
    tablespaces: &Tablespaces,
) -> Vec<String> {
    let blocks = chain.blocks_table();
    let edges = chain.edges_table();
    let view = chain.stats_view();

    let mut statements = Vec::new();

    // Parent block table, partitioned by created_at month.
    statements.push(format!(
        r#"
        CREATE TABLE IF NOT EXISTS {blocks} (
            block_id BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            hash TEXT NOT NULL,
            parent_hash TEXT NOT NULL,
            state_root TEXT NOT NULL,
            extrinsics_root TEXT NOT NULL,
            author_id TEXT,
            finalized BOOLEAN NOT NULL DEFAULT false,
            on_initialize JSONB,
            on_finalize JSONB,
            logs JSONB,
            extrinsics JSONB,
            PRIMARY KEY (block_id, created_at)
        ) PARTITION BY RANGE (created_at)
        "#
    ));

    // Monthly partitions, epoch through the month of last_ts.
    let months = months_through(last_ts);
    let fast_cutoff = months.len().saturating_sub(FAST_MONTHS);
    for (idx, &(year, month)) in months.iter().enumerate() {
        let tablespace = if idx >= fast_cutoff {
            tablespaces.fast.as_deref()
        } else {
            tablespaces.slow.as_deref()
        };
        statements.push(month_partition(&blocks, year, month, tablespace));
    }

    // Edge table, hash-partitioned on address.
    statements.push(format!(
        r#"
        CREATE TABLE IF NOT EXISTS {edges} (
            address TEXT NOT NULL,
            block_id BIGINT NOT NULL,
            PRIMARY KEY (address, block_id)
        ) PARTITION BY HASH (address)
        "#
    ));
    for remainder in 0..EDGE_PARTITIONS {
        statements.push(format!(
            "CREATE TABLE IF NOT EXISTS {edges}_p{remainder} PARTITION OF {edges} \
             FOR VALUES WITH (MODULUS {EDGE_PARTITIONS}, REMAINDER {remainder})"
        ));
    }

    // Monthly statistics view, unique-indexed so it refreshes concurrently.
    statements.push(format!(
        "CREATE MATERIALIZED VIEW IF NOT EXISTS {view} AS \
         SELECT date_trunc('month', created_at) AS month, \
                count(*) AS total_blocks, \
                min(block_id) AS min_block_id, \
                max(block_id) AS max_block_id \
         FROM {blocks} GROUP BY 1"
    ));
    statements.push(format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {view}_month_idx ON {view} (month)"
    ));

    statements
}

/// DDL for one monthly partition of a block table.
fn month_partition(blocks: &str, year: i32, month: u32, tablespace: Option<&str>) -> String {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let clause = tablespace.map_or_else(String::new, |ts| format!(" TABLESPACE {ts}"));

    format!(
        "CREATE TABLE IF NOT EXISTS {blocks}_y{year}m{month:02} PARTITION OF {blocks} \
         FOR VALUES FROM ('{year}-{month:02}-01') TO ('{next_year}-{next_month:02}-01'){clause}"
    )
}

/// Enumerate (year, month) pairs from the partition epoch through the month
/// of `last_ts` inclusive. Timestamps before the epoch yield the epoch month
/// alone.
fn months_through(last_ts: DateTime<Utc>) -> Vec<(i32, u32)> {
    let (epoch_year, epoch_month) = PARTITION_EPOCH;
    let (mut year, mut month) = (epoch_year, epoch_month);
    let (end_year, end_month) = (last_ts.year(), last_ts.month());

    let mut months = vec![(year, month)];
    while year < end_year || (year == end_year && month < end_month) {
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
        months.push((year, month));
    }
    months
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    fn spec() -> ChainSpec {
        ChainSpec::new("polkadot", "assethub")
    }

    #[test]
    fn months_span_epoch_to_last() {
        let months = months_through(ts(2020, 6, 15));
        assert_eq!(months, vec![(2020, 4), (2020, 5), (2020, 6)]);
    }

    #[test]
    fn months_cross_year_boundary() {
        let months = months_through(ts(2021, 2, 1));
        assert_eq!(months.len(), 11); // Apr 2020 .. Feb 2021
        assert_eq!(months[0], (2020, 4));
        assert_eq!(*months.last().unwrap(), (2021, 2));
    }

    #[test]
    fn pre_epoch_timestamp_yields_epoch_month() {
        let months = months_through(ts(2019, 1, 1));
        assert_eq!(months, vec![(2020, 4)]);
    }

    #[test]
    fn partition_bounds_are_month_aligned() {
        let ddl = month_partition("blocks_polkadot_assethub", 2023, 1, None);
        assert!(ddl.contains("blocks_polkadot_assethub_y2023m01"));
        assert!(ddl.contains("FROM ('2023-01-01') TO ('2023-02-01')"));
        assert!(!ddl.contains("TABLESPACE"));
    }

    #[test]
    fn december_partition_rolls_year() {
        let ddl = month_partition("b", 2022, 12, None);
        assert!(ddl.contains("FROM ('2022-12-01') TO ('2023-01-01')"));
    }

    #[test]
    fn tablespace_clause_when_configured() {
        let ddl = month_partition("b", 2023, 5, Some("fastpool"));
        assert!(ddl.ends_with("TABLESPACE fastpool"));
    }

    #[test]
    fn chain_statements_cover_all_parts() {
        let statements = chain_statements(&spec(), ts(2020, 5, 1), &Tablespaces::default());

        // Parent + 2 months + edge parent + 4 hash partitions + view + index.
        assert_eq!(statements.len(), 1 + 2 + 1 + 4 + 2);
        assert!(statements[0].contains("PARTITION BY RANGE (created_at)"));
        assert!(statements.iter().any(|s| s.contains("PARTITION BY HASH (address)")));
        assert!(statements.iter().any(|s| s.contains("MODULUS 4, REMAINDER 3")));
        assert!(statements.iter().any(|s| s.contains("CREATE MATERIALIZED VIEW")));
        assert!(statements.iter().any(|s| s.contains("UNIQUE INDEX")));
    }

    #[test]
    fn recent_months_go_to_fast_tablespace() {
        let tablespaces = Tablespaces {
            fast: Some("hot".into()),
            slow: Some("cold".into()),
        };
        let statements = chain_statements(&spec(), ts(2022, 4, 1), &tablespaces);

        // Apr 2020 .. Apr 2022 is 25 months: 13 cold, then 12 hot.
        let cold: Vec<_> = statements.iter().filter(|s| s.contains("TABLESPACE cold")).collect();
        let hot: Vec<_> = statements.iter().filter(|s| s.contains("TABLESPACE hot")).collect();
        assert_eq!(cold.len(), 13);
        assert_eq!(hot.len(), 12);

        // The newest month is hot, the oldest cold.
        assert!(statements.iter().any(|s| s.contains("y2022m04") && s.contains("hot")));
        assert!(statements.iter().any(|s| s.contains("y2020m04") && s.contains("cold")));
    }

    #[test]
    fn statements_are_idempotent_by_construction() {
        for statement in chain_statements(&spec(), ts(2021, 1, 1), &Tablespaces::default()) {
            assert!(
                statement.contains("IF NOT EXISTS"),
                "not idempotent: {statement}"
            );
        }
        assert!(catalog_table().contains("IF NOT EXISTS"));
    }
}
