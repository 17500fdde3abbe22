//! URL handling module for url-sentry
//!
//! This module provides scheme normalization, URL list reading, and the
//! [`UrlTask`] unit of work handed to the worker pool.

mod input;
mod normalize;

pub use input::{parse_url_list, read_url_list};
pub use normalize::{ensure_scheme, has_scheme, parse_http_url};

use crate::UrlResult;
use ::url::Url;

/// One URL to check, as read from the input list
///
/// `id` is the input position, so duplicate input lines remain distinct
/// tasks. `normalized` is the scheme-prefixed form computed on construction,
/// before any probe sees the task. Tasks are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlTask {
    id: usize,
    original: String,
    normalized: String,
}

impl UrlTask {
    /// Builds a task from a raw input line
    pub fn new(id: usize, original: impl Into<String>) -> Self {
        let original = original.into();
        let normalized = ensure_scheme(&original);
        Self {
            id,
            original,
            normalized,
        }
    }

    /// Builds tasks for a whole URL list, numbered in input order
    pub fn from_list<S: AsRef<str>>(urls: &[S]) -> Vec<Self> {
        urls.iter()
            .enumerate()
            .map(|(id, raw)| Self::new(id, raw.as_ref()))
            .collect()
    }

    /// Input position of this task
    pub fn id(&self) -> usize {
        self.id
    }

    /// The URL exactly as it appeared in the input
    pub fn original(&self) -> &str {
        &self.original
    }

    /// The scheme-prefixed URL that probes operate on
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Whether the input already carried an HTTP(S) scheme
    pub fn had_scheme(&self) -> bool {
        has_scheme(&self.original)
    }

    /// Parses the normalized URL for network probes
    pub fn parsed(&self) -> UrlResult<Url> {
        parse_http_url(&self.normalized)
    }
}
