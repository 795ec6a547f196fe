//! Error types for the chain-reader client.
//!
//! This module provides the error hierarchy for chain-reader operations:
//!
//! - [`ReaderError`] - The primary error type for all client operations
//!
//! # Error Philosophy
//!
//! The taxonomy is deliberately small. Callers of this crate (the ingestion
//! pipeline) only distinguish three outcomes: the block does not exist
//! ([`ReaderError::NotFound`]), the service is temporarily unreachable or
//! misbehaving ([`ReaderError::Unavailable`]), or the operation was cancelled
//! ([`ReaderError::Cancelled`]). Everything transient is folded into
//! `Unavailable`; the planner's gap detection is the retry mechanism.

use thiserror::Error;

/// Result type alias using [`ReaderError`].
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Errors that can occur when talking to a chain-reader service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReaderError {
    /// The chain-reader service is unreachable or returned a bad response.
    ///
    /// Covers transport failures, timeouts, non-200 statuses, and 200
    /// responses whose body does not parse. All of these are transient from
    /// the pipeline's point of view: the affected ids stay missing and are
    /// picked up again on the planner's next pass.
    #[error("chain reader unavailable: {0}")]
    Unavailable(String),

    /// The requested block id returned HTTP 404.
    #[error("block {0} not found")]
    NotFound(u64),

    /// The operation was cancelled via its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid configuration provided to the client.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ReaderError {
    /// Check if this error means the block simply does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error is transient and worth retrying on a later pass.
    ///
    /// `NotFound` is not transient within one invocation (the id is skipped)
    /// but the id remains absent from the store, so a later run re-attempts it.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONVERSIONS FROM reqwest ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

impl From<reqwest::Error> for ReaderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Unavailable("request timed out".into())
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
