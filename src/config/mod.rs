//! Configuration module for Sillage
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so an empty file describes the stock harvest.
//!
//! # Example
//!
//! ```no_run
//! use sillage::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sillage.toml")).unwrap();
//! println!("Retry budget per URL: {}", config.fetcher.max_retries);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DelayConfig, DelayRange, DiscoveryConfig, FetcherConfig, OutputConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
