//! url-sentry: a concurrent URL checker
//!
//! This crate checks reachability, redirect behavior, and simple content
//! classification for a list of URLs. Probes run on a bounded worker pool and
//! every result is persisted the moment it arrives.

pub mod config;
pub mod engine;
pub mod output;
pub mod probe;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for url-sentry operations
///
/// Only fatal conditions end up here. Per-URL problems are reported as
/// [`probe::ProbeFailure`] records and never abort a batch.
#[derive(Debug, Error)]
pub enum SentryError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Output error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("No URLs to check")]
    EmptyBatch,

    #[error("Invalid batch state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::BatchState,
        to: state::BatchState,
    },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Empty URL")]
    Empty,
}

/// Result type alias for url-sentry operations
pub type Result<T> = std::result::Result<T, SentryError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use engine::{BatchSummary, Dispatcher, OutputTarget, WorkerPool};
pub use probe::{ErrorKind, HttpProbe, Outcome, Probe, ProbeFailure, ProbeKind, ProbeReport};
pub use state::BatchState;
pub use crate::url::{ensure_scheme, UrlTask};
