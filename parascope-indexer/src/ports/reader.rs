//! Chain-reader port: the fetch side of the pipeline.

use async_trait::async_trait;
use chain_reader::{ChainReaderClient, ReaderError};
use tokio_util::sync::CancellationToken;

use crate::types::BlockRecord;

/// Port for fetching block data from a per-chain reader service.
///
/// All operations are cancellation-aware: once the token is cancelled they
/// return [`ReaderError::Cancelled`] promptly.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Fetch the id of the current chain head.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::Unavailable`] when the service cannot answer.
    async fn head_id(&self, cancel: &CancellationToken) -> Result<u64, ReaderError>;

    /// Fetch a single block by id.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::NotFound`] when the id does not exist,
    /// [`ReaderError::Unavailable`] on any transport-class failure.
    async fn fetch_block(
        &self,
        id: u64,
        cancel: &CancellationToken,
    ) -> Result<BlockRecord, ReaderError>;

    /// Fetch a list of blocks, in input order where the service supplies them.
    ///
    /// # Errors
    ///
    /// Returns the first per-request error encountered.
    async fn fetch_range(
        &self,
        ids: &[u64],
        cancel: &CancellationToken,
    ) -> Result<Vec<BlockRecord>, ReaderError>;

    /// Check that the reader service is reachable (5 s hard timeout).
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::Unavailable`] when it is not.
    async fn ping(&self, cancel: &CancellationToken) -> Result<(), ReaderError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// HTTP ADAPTER
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl ChainReader for ChainReaderClient {
    async fn head_id(&self, cancel: &CancellationToken) -> Result<u64, ReaderError> {
        Self::head_id(self, cancel).await
    }

    async fn fetch_block(
        &self,
        id: u64,
        cancel: &CancellationToken,
    ) -> Result<BlockRecord, ReaderError> {
        Self::fetch_block(self, id, cancel).await.map(Into::into)
    }

    async fn fetch_range(
        &self,
        ids: &[u64],
        cancel: &CancellationToken,
    ) -> Result<Vec<BlockRecord>, ReaderError> {
        let blocks = Self::fetch_range(self, ids, cancel).await?;
        Ok(blocks.into_iter().map(Into::into).collect())
    }

    async fn ping(&self, cancel: &CancellationToken) -> Result<(), ReaderError> {
        Self::ping(self, cancel).await
    }
}
