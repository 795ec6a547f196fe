//! HTTP client for per-chain chain-reader services.
//!
//! This module provides [`ChainReaderClient`], the main entry point for
//! fetching block data from a chain-reader service.
//!
//! # Endpoints
//!
//! | Path | Purpose |
//! |------|---------|
//! | `GET /blocks/head` | Current head block (used only for its id) |
//! | `GET /blocks/{id}` | Single block by id |
//! | `GET /blocks?range={start}-{end}` | Inclusive id range, array of blocks |
//!
//! # Range Optimization
//!
//! [`ChainReaderClient::fetch_range`] issues one range request when the ids
//! form a contiguous ascending run of length >= 2; otherwise it degrades to
//! one single-block request per id and concatenates the results in input
//! order. Callers must not assume any particular HTTP call pattern, only that
//! the same set of blocks comes back.
//!
//! # Cancellation
//!
//! Every operation takes a [`CancellationToken`]. Once the token is
//! cancelled, the operation returns [`ReaderError::Cancelled`] promptly and
//! the in-flight request is dropped with it.
//!
//! # Example
//!
//! ```ignore
//! use chain_reader::ChainReaderClient;
//! use tokio_util::sync::CancellationToken;
//!
//! let client = ChainReaderClient::new("http://localhost:8000")?;
//! let cancel = CancellationToken::new();
//!
//! let head = client.head_id(&cancel).await?;
//! let blocks = client.fetch_range(&(0..=99).collect::<Vec<_>>(), &cancel).await?;
//! ```

use reqwest::StatusCode;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::{ClientConfig, PING_TIMEOUT};
use crate::error::{ReaderError, Result};
use crate::types::BlockPayload;

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN READER CLIENT
// ═══════════════════════════════════════════════════════════════════════════════

/// HTTP client for one chain-reader service.
///
/// # Thread Safety
///
/// This client is `Send + Sync` and can be shared across tasks. The internal
/// `reqwest::Client` is designed for concurrent use.
#[derive(Debug, Clone)]
pub struct ChainReaderClient {
    /// HTTP client for REST requests.
    client: reqwest::Client,

    /// Base URL of the chain-reader service, without trailing slash.
    base_url: String,

    /// Client configuration.
    config: ClientConfig,
}

impl ChainReaderClient {
    /// Create a new chain-reader client with default configuration.
    ///
    /// # Arguments
    ///
    /// * `base_url` - HTTP URL of the chain-reader service
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(base_url, ClientConfig::default())
    }

    /// Create a new client with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn with_config(base_url: impl Into<String>, config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ReaderError::Unavailable(format!("failed to create HTTP client: {e}"))
            })?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Get the base URL this client is connected to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the current configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ───────────────────────────────────────────────────────────────────────────
    // PUBLIC OPERATIONS
    // ───────────────────────────────────────────────────────────────────────────

    /// Fetch the id of the current chain head.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::Unavailable`] on transport failure, non-200
    /// status, or unparseable body; [`ReaderError::Cancelled`] on cancellation.
    #[instrument(skip(self, cancel))]
    pub async fn head_id(&self, cancel: &CancellationToken) -> Result<u64> {
        let url = format!("{}/blocks/head", self.base_url);
        let response = self.send_cancellable(&url, cancel).await?;

        if !response.status().is_success() {
            return Err(ReaderError::Unavailable(format!(
                "unexpected status {} from {url}",
                response.status()
            )));
        }

        let block = parse_body::<BlockPayload>(response).await?;
        debug!(head = block.number, "Fetched chain head");
        Ok(block.number)
    }

    /// Fetch a single block by id.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::NotFound`] on 404, [`ReaderError::Unavailable`]
    /// on any other failure, [`ReaderError::Cancelled`] on cancellation.
    #[instrument(skip(self, cancel))]
    pub async fn fetch_block(&self, id: u64, cancel: &CancellationToken) -> Result<BlockPayload> {
        let url = format!("{}/blocks/{id}", self.base_url);
        let response = self.send_cancellable(&url, cancel).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ReaderError::NotFound(id));
        }
        if !response.status().is_success() {
            return Err(ReaderError::Unavailable(format!(
                "unexpected status {} from {url}",
                response.status()
            )));
        }

        parse_body(response).await
    }

    /// Fetch a list of blocks by id.
    ///
    /// When `ids` is a contiguous ascending run of length >= 2, one range
    /// request is issued; otherwise each id is fetched individually and the
    /// results are concatenated in input order.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; see [`Self::fetch_block`] for the
    /// per-request error mapping. A 404 on the range endpoint itself is
    /// treated as [`ReaderError::Unavailable`] (the endpoint must exist).
    #[instrument(skip(self, cancel), fields(count = ids.len()))]
    pub async fn fetch_range(
        &self,
        ids: &[u64],
        cancel: &CancellationToken,
    ) -> Result<Vec<BlockPayload>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        if is_contiguous_run(ids) {
            let (start, end) = (ids[0], ids[ids.len() - 1]);
            let url = format!("{}/blocks?range={start}-{end}", self.base_url);
            let response = self.send_cancellable(&url, cancel).await?;

            if !response.status().is_success() {
                return Err(ReaderError::Unavailable(format!(
                    "unexpected status {} from {url}",
                    response.status()
                )));
            }

            let blocks: Vec<BlockPayload> = parse_body(response).await?;
            debug!(start, end, fetched = blocks.len(), "Fetched block range");
            return Ok(blocks);
        }

        // Non-contiguous input: degrade to per-id fetches.
        let mut blocks = Vec::with_capacity(ids.len());
        for &id in ids {
            blocks.push(self.fetch_block(id, cancel).await?);
        }
        Ok(blocks)
    }

    /// Check that the chain-reader service is reachable.
    ///
    /// Carries a hard 5 second timeout regardless of the configured request
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::Unavailable`] if the service does not answer
    /// with a success status within the deadline.
    #[instrument(skip(self, cancel))]
    pub async fn ping(&self, cancel: &CancellationToken) -> Result<()> {
        let url = format!("{}/blocks/head", self.base_url);

        let response = timeout(PING_TIMEOUT, self.send_cancellable(&url, cancel))
            .await
            .map_err(|_| ReaderError::Unavailable("ping timed out".into()))??;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ReaderError::Unavailable(format!(
                "ping got status {}",
                response.status()
            )))
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // INTERNAL HELPERS
    // ───────────────────────────────────────────────────────────────────────────

    /// Issue a GET request, racing it against the cancellation token.
    async fn send_cancellable(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ReaderError::Cancelled),
            result = self.client.get(url).send() => {
                result.map_err(|e| {
                    warn!(url, error = %e, "Chain-reader request failed");
                    e.into()
                })
            }
        }
    }
}

/// Parse a successful response body, mapping decode failures to
/// [`ReaderError::Unavailable`] (a 200 with an unparseable body is a broken
/// service, not a missing block).
async fn parse_body<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| ReaderError::Unavailable(format!("invalid response body: {e}")))
}

/// Check whether `ids` is a contiguous ascending run of length >= 2.
fn is_contiguous_run(ids: &[u64]) -> bool {
    ids.len() >= 2 && ids.windows(2).all(|w| w[1] == w[0] + 1)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
