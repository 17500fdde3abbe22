//! Configuration module for url-sentry
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! A configuration file is optional: every section has defaults, and the
//! command line can override individual values afterwards.
//!
//! # Example
//!
//! ```no_run
//! use url_sentry::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sentry.toml")).unwrap();
//! println!("Checking with {} workers", config.checker.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CheckerConfig, ClassifierConfig, Config, OutputConfig, OutputFormat, SectorEntry};

// Re-export parser functions
pub use parser::{compute_config_hash, hash_content, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
