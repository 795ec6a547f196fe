//! Settings structs and loading logic.
//!
//! All settings have sensible defaults and can be overridden via a TOML
//! file or `PARASCOPE_`-prefixed environment variables.

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

use crate::types::ChainSpec;

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Sentinel for `end_id` meaning "use the current chain head".
pub const END_ID_HEAD: u64 = 0;

/// Deployment-wide chain-reader port convention.
///
/// Each known (relay, chain) pair is served by a chain-reader on a fixed
/// port; a configured URL that names a known chain on the wrong port is a
/// deployment mistake and is rejected at startup. Unknown chains pass
/// unchecked.
const CHAIN_READER_PORTS: &[(&str, &str, u16)] = &[
    ("polkadot", "polkadot", 8000),
    ("polkadot", "assethub", 8001),
    ("polkadot", "people", 8002),
    ("polkadot", "coretime", 8003),
    ("polkadot", "collectives", 8004),
    ("kusama", "kusama", 8010),
    ("kusama", "assethub", 8011),
    ("kusama", "people", 8012),
    ("kusama", "coretime", 8013),
];

/// Look up the conventional chain-reader port for a (relay, chain) pair.
///
/// Returns `None` for pairs outside the deployment convention.
#[must_use]
pub fn chain_reader_port(relay_chain: &str, chain: &str) -> Option<u16> {
    let relay = relay_chain.to_lowercase();
    let chain = chain.to_lowercase();
    CHAIN_READER_PORTS
        .iter()
        .find(|(r, c, _)| *r == relay && *c == chain)
        .map(|(_, _, port)| *port)
}

// ═══════════════════════════════════════════════════════════════════════════════
// SETTINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration for one ingestion job.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Relay chain name (e.g. "polkadot").
    pub relay_chain: String,
    /// Chain name (the relay itself or one of its parachains).
    pub chain: String,
    /// Base URL of the chain-reader service for this chain.
    pub chain_reader_url: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// First block id of the requested interval.
    pub start_id: u64,
    /// Last block id of the requested interval; `0` means "use head".
    pub end_id: u64,
    /// Maximum length of a contiguous fetch run and of one store batch.
    pub batch_size: usize,
    /// Total worker budget, split evenly between the two pools.
    pub max_workers: usize,
    /// Buffer flush interval in milliseconds.
    pub flush_interval_ms: u64,
    /// Keep tailing the chain head after the backfill completes.
    pub live: bool,
    /// Optional tablespace for recent (hot) block partitions.
    pub fast_tablespace: Option<String>,
    /// Optional tablespace for historical (cold) block partitions.
    pub slow_tablespace: Option<String>,
}

impl Settings {
    /// Load settings from a TOML file and `PARASCOPE_` environment variables.
    ///
    /// # Errors
    /// Returns `ConfigError` if configuration is invalid or cannot be loaded.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            // Start with default values
            .set_default("relay_chain", "polkadot")?
            .set_default("chain", "polkadot")?
            .set_default("chain_reader_url", "http://localhost:8000")?
            .set_default("database_url", "postgres://localhost/parascope")?
            .set_default("start_id", 0)?
            .set_default("end_id", END_ID_HEAD)?
            .set_default("batch_size", 100)?
            .set_default("max_workers", 8)?
            .set_default("flush_interval_ms", 2000)?
            .set_default("live", false)?
            .set_default("fast_tablespace", Option::<String>::None)?
            .set_default("slow_tablespace", Option::<String>::None)?
            // Load the configuration file when present
            .add_source(File::from(path.as_ref()).required(false))
            // Override with environment variables (PARASCOPE_ prefix)
            .add_source(
                Environment::with_prefix("PARASCOPE")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// The chain identity this job ingests.
    #[must_use]
    pub fn chain_spec(&self) -> ChainSpec {
        ChainSpec::new(self.relay_chain.clone(), self.chain.clone())
    }

    /// Get the buffer flush interval as a `Duration`.
    #[must_use]
    pub const fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Whether `end_id` is the "use head" sentinel.
    #[must_use]
    pub const fn end_is_head(&self) -> bool {
        self.end_id == END_ID_HEAD
    }

    /// Validate settings and return any validation errors.
    ///
    /// # Errors
    /// Returns a list of validation error messages.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.relay_chain.is_empty() {
            errors.push("relay_chain cannot be empty".into());
        }
        if self.chain.is_empty() {
            errors.push("chain cannot be empty".into());
        }
        if self.chain_reader_url.is_empty() {
            errors.push("chain_reader_url cannot be empty".into());
        }
        if self.database_url.is_empty() {
            errors.push("database_url cannot be empty".into());
        }
        if self.batch_size == 0 {
            errors.push("batch_size must be non-zero".into());
        }
        if self.max_workers == 0 {
            errors.push("max_workers must be non-zero".into());
        }
        if self.flush_interval_ms == 0 {
            errors.push("flush_interval_ms must be non-zero".into());
        }
        if !self.end_is_head() && self.end_id < self.start_id {
            errors.push(format!(
                "invalid range: end_id {} is below start_id {}",
                self.end_id, self.start_id
            ));
        }

        self.check_port_convention(&mut errors);

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Reject a chain-reader URL whose port contradicts the deployment
    /// convention for a known chain.
    fn check_port_convention(&self, errors: &mut Vec<String>) {
        let Some(expected) = chain_reader_port(&self.relay_chain, &self.chain) else {
            return;
        };

        match Url::parse(&self.chain_reader_url) {
            Ok(parsed) => {
                if let Some(port) = parsed.port() {
                    if port != expected {
                        errors.push(format!(
                            "chain_reader_url port {port} does not match convention \
                             for {}/{} (expected {expected})",
                            self.relay_chain, self.chain
                        ));
                    }
                }
            }
            Err(e) => errors.push(format!("chain_reader_url is not a valid URL: {e}")),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
