//! Configuration loading and validation for the Parascope indexer.
//!
//! Configuration is loaded from multiple sources in order of precedence:
//! 1. Environment variables with `PARASCOPE_` prefix (highest)
//! 2. A TOML configuration file (`parascope.toml` by default)
//! 3. Built-in defaults
//!
//! # Example
//!
//! ```ignore
//! use parascope_indexer::config::Settings;
//!
//! let settings = Settings::load("parascope.toml")?;
//! settings.validate()?;
//! ```

mod settings;

pub use settings::{Settings, chain_reader_port};
