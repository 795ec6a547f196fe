//! Layered error types for the Parascope block ingestion service.
//!
//! # Error Philosophy
//!
//! The pipeline absorbs transient failures locally: a failed fetch or a
//! rolled-back `save` just leaves the affected block ids missing, and the
//! planner's gap detection re-discovers them on the next pass. Only
//! fatal-class errors (configuration, schema creation, unrecoverable
//! database loss) propagate to the driver and decide the process exit code.

use thiserror::Error;

use crate::extract::PayloadParseError;

// ═══════════════════════════════════════════════════════════════════════════════
// INGEST ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors raised by the ingestion pipeline and its persistence layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestError {
    /// Invalid configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Schema creation failed. Fatal at startup.
    #[error("schema creation failed: {0}")]
    Schema(#[source] sqlx::Error),

    /// Database error during normal operation.
    ///
    /// Transient when raised inside a `save` (the transaction rolls back and
    /// the planner retries the ids); fatal when the pool itself is lost.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Chain-reader error.
    #[error(transparent)]
    Reader(#[from] chain_reader::ReaderError),

    /// Semi-structured payload failed to parse during address extraction.
    ///
    /// Never fatal: the affected block is stored with an empty edge list.
    #[error(transparent)]
    PayloadParse(#[from] PayloadParseError),

    /// An internal pipeline channel closed unexpectedly.
    #[error("pipeline channel closed: {0}")]
    ChannelClosed(String),

    /// Graceful shutdown requested.
    #[error("shutdown requested")]
    Shutdown,
}

/// Type alias for ingestion Results.
pub type Result<T> = std::result::Result<T, IngestError>;

impl IngestError {
    /// Check if this error class is fatal to the process.
    ///
    /// Transient errors are absorbed by the pipeline; fatal ones propagate
    /// to the driver and decide the exit code.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Schema(_))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
