//! Probes: one network check against one URL
//!
//! This module contains:
//! - The [`Probe`] trait the worker pool drives
//! - [`Outcome`] / [`ProbeFailure`], the typed result of a probe
//! - The reqwest-backed [`HttpProbe`]
//! - Keyword classification of page text
//!
//! A probe never fails past its boundary: transport errors are classified
//! into an [`ErrorKind`] and returned as `Err(ProbeFailure)`.

mod classify;
mod http;

pub use classify::{classify_text, find_dummy_keyword, visible_text, Classification};
pub use http::{build_http_client, HttpProbe, HttpSettings};

use crate::url::UrlTask;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which check a batch performs on every URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProbeKind {
    /// HTTP status code after following redirects
    Status,
    /// Hop-by-hop redirect trace
    Redirect,
    /// Whether the input URL carried a scheme (no network)
    Scheme,
    /// Keyword-based sector classification of the page text
    Classify,
    /// Placeholder / under-construction page detection
    Dummy,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Redirect => "redirect",
            Self::Scheme => "scheme",
            Self::Classify => "classify",
            Self::Dummy => "dummy",
        }
    }

    /// Returns true if the probe needs network access
    pub fn needs_network(&self) -> bool {
        !matches!(self, Self::Scheme)
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "status" => Ok(Self::Status),
            "redirect" => Ok(Self::Redirect),
            "scheme" => Ok(Self::Scheme),
            "classify" => Ok(Self::Classify),
            "dummy" => Ok(Self::Dummy),
            other => Err(format!("unknown probe kind '{}'", other)),
        }
    }
}

/// Successful result of a probe
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Status {
        code: u16,
    },
    Redirect {
        redirected: bool,
        /// URLs visited before `final_url`, as resolved absolute URLs
        chain: Vec<String>,
        final_url: String,
    },
    Classify {
        sector: String,
        confidence: f64,
    },
    Scheme {
        had_scheme: bool,
        normalized: String,
    },
    Dummy {
        is_dummy: bool,
        matched: Option<String>,
    },
}

impl Outcome {
    /// Value stored in the `outcome` column of the SQLite results table
    pub fn label(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Redirect { .. } => "redirect",
            Self::Classify { .. } => "classify",
            Self::Scheme { .. } => "scheme",
            Self::Dummy { .. } => "dummy",
        }
    }
}

/// Failure classification for a single URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    Timeout,
    ConnectionRefused,
    TlsError,
    DnsFailure,
    HttpProtocolError,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionRefused => "connection_refused",
            Self::TlsError => "tls_error",
            Self::DnsFailure => "dns_failure",
            Self::HttpProtocolError => "http_protocol_error",
            Self::Unknown => "unknown",
        }
    }

    pub fn all() -> [Self; 6] {
        [
            Self::Timeout,
            Self::ConnectionRefused,
            Self::TlsError,
            Self::DnsFailure,
            Self::HttpProtocolError,
            Self::Unknown,
        ]
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A probe that could not produce an [`Outcome`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl ProbeFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("no response within {}ms", after.as_millis()),
        )
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Result of one probe
pub type ProbeResult = Result<Outcome, ProbeFailure>;

/// A probe result paired with the task that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub task: UrlTask,
    pub result: ProbeResult,
}

impl ProbeReport {
    pub fn new(task: UrlTask, result: ProbeResult) -> Self {
        Self { task, result }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// A single network-bound check
///
/// Implementations must be stateless with respect to individual calls; the
/// pool runs many calls concurrently on the same instance.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, task: &UrlTask, kind: ProbeKind) -> ProbeResult;
}

/// The scheme report needs no network access
pub(crate) fn scheme_outcome(task: &UrlTask) -> Outcome {
    Outcome::Scheme {
        had_scheme: task.had_scheme(),
        normalized: task.normalized().to_string(),
    }
}
