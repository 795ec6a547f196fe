//! Configuration for the chain-reader client.
//!
//! This module provides [`ClientConfig`] for customizing client behavior:
//!
//! - Request timeouts
//! - Health-check (`ping`) timeout
//!
//! # Example
//!
//! ```
//! use chain_reader::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::default()
//!     .with_timeout(Duration::from_secs(60));
//! ```

use std::time::Duration;

use crate::error::{ReaderError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default timeout for HTTP requests to the chain-reader service.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Hard timeout applied to `ping()` regardless of the request timeout.
pub const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimum allowed request timeout.
pub const MIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Maximum allowed request timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(300);

// ═══════════════════════════════════════════════════════════════════════════════
// CLIENT CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration options for [`ChainReaderClient`](crate::ChainReaderClient).
///
/// Use the builder pattern to customize settings:
///
/// ```
/// use chain_reader::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout for HTTP calls.
    ///
    /// Default: 30 seconds.
    /// Range: 1-300 seconds.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Request timeout duration (1-300 seconds)
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate the configuration.
    ///
    /// Called automatically when creating a client.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::InvalidConfig`] if the timeout is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.timeout < MIN_TIMEOUT {
            return Err(ReaderError::InvalidConfig(format!(
                "timeout must be at least {MIN_TIMEOUT:?}"
            )));
        }

        if self.timeout > MAX_TIMEOUT {
            return Err(ReaderError::InvalidConfig(format!(
                "timeout must be at most {MAX_TIMEOUT:?}"
            )));
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
