//! HTTP probe implementation
//!
//! This module handles all HTTP requests, including:
//! - Building HTTP clients with the configured timeout and TLS policy
//! - Status checks (GET, redirects followed)
//! - Hop-by-hop redirect tracing (HEAD, falling back to GET on 405)
//! - Fetching page bodies for classification
//! - Error classification into [`ErrorKind`]

use crate::config::{ClassifierConfig, Config};
use crate::probe::classify::{classify_text, find_dummy_keyword, visible_text};
use crate::probe::{scheme_outcome, ErrorKind, Outcome, Probe, ProbeFailure, ProbeKind, ProbeResult};
use crate::url::UrlTask;
use async_trait::async_trait;
use reqwest::header::{HeaderValue, LOCATION};
use reqwest::{redirect::Policy, Client, Method, Response, StatusCode};
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Transport settings for [`HttpProbe`]
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub verify_tls: bool,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl HttpSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.checker.timeout(),
            verify_tls: config.checker.verify_tls,
            max_redirects: config.checker.max_redirects,
            user_agent: config.checker.user_agent.clone(),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `settings` - Timeout, TLS and user agent settings
/// * `policy` - Redirect policy for this client
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(settings: &HttpSettings, policy: Policy) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.timeout)
        .connect_timeout(settings.timeout)
        .redirect(policy)
        .danger_accept_invalid_certs(!settings.verify_tls)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Probe backed by reqwest
///
/// Holds two clients sharing the same settings: one that follows redirects
/// (status and page fetches) and one that never does (redirect tracing).
#[derive(Debug, Clone)]
pub struct HttpProbe {
    following: Client,
    manual: Client,
    max_redirects: usize,
    classifier: Arc<ClassifierConfig>,
}

impl HttpProbe {
    /// Creates a new probe
    ///
    /// # Returns
    ///
    /// * `Ok(HttpProbe)` - Clients built
    /// * `Err(reqwest::Error)` - TLS backend or client setup failed
    pub fn new(settings: HttpSettings, classifier: ClassifierConfig) -> Result<Self, reqwest::Error> {
        if !settings.verify_tls {
            tracing::warn!("TLS certificate verification is disabled");
        }

        let following = build_http_client(&settings, Policy::limited(settings.max_redirects))?;
        let manual = build_http_client(&settings, Policy::none())?;

        Ok(Self {
            following,
            manual,
            max_redirects: settings.max_redirects,
            classifier: Arc::new(classifier),
        })
    }

    /// Creates a probe from the full configuration
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(HttpSettings::from_config(config), config.classifier.clone())
    }

    async fn check_status(&self, url: Url) -> ProbeResult {
        let response = self.following.get(url).send().await.map_err(classify_error)?;
        Ok(Outcome::Status {
            code: response.status().as_u16(),
        })
    }

    /// Follows redirects one hop at a time
    ///
    /// `chain` collects every URL visited before the final one. Relative
    /// `Location` headers are resolved against the current URL.
    async fn trace_redirects(&self, start: Url) -> ProbeResult {
        let mut chain: Vec<String> = Vec::new();
        let mut current = start;

        loop {
            let response = self.send_hop(&current).await?;
            let status = response.status();

            if !status.is_redirection() {
                break;
            }

            let Some(location) = response.headers().get(LOCATION) else {
                tracing::debug!("{} answered {} without a Location header", current, status);
                break;
            };
            let next = resolve_location(&current, location)?;

            chain.push(current.to_string());

            if chain.iter().any(|visited| visited == next.as_str()) {
                return Err(ProbeFailure::new(
                    ErrorKind::HttpProtocolError,
                    format!("redirect loop detected at {}", next),
                ));
            }

            if chain.len() > self.max_redirects {
                return Err(ProbeFailure::new(
                    ErrorKind::HttpProtocolError,
                    format!("more than {} redirects", self.max_redirects),
                ));
            }

            current = next;
        }

        Ok(Outcome::Redirect {
            redirected: !chain.is_empty(),
            chain,
            final_url: current.to_string(),
        })
    }

    /// Sends one redirect-tracing request, retrying with GET if HEAD is refused
    async fn send_hop(&self, url: &Url) -> Result<Response, ProbeFailure> {
        let response = self
            .manual
            .request(Method::HEAD, url.clone())
            .send()
            .await
            .map_err(classify_error)?;

        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            return self
                .manual
                .get(url.clone())
                .send()
                .await
                .map_err(classify_error);
        }

        Ok(response)
    }

    async fn fetch_text(&self, url: Url) -> Result<String, ProbeFailure> {
        let response = self.following.get(url).send().await.map_err(classify_error)?;
        let body = response.text().await.map_err(classify_error)?;
        Ok(visible_text(&body))
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, task: &UrlTask, kind: ProbeKind) -> ProbeResult {
        if kind == ProbeKind::Scheme {
            return Ok(scheme_outcome(task));
        }

        let url = task
            .parsed()
            .map_err(|e| ProbeFailure::new(ErrorKind::Unknown, format!("invalid URL: {}", e)))?;

        match kind {
            ProbeKind::Status => self.check_status(url).await,
            ProbeKind::Redirect => self.trace_redirects(url).await,
            ProbeKind::Classify => {
                let text = self.fetch_text(url).await?;
                let result = classify_text(
                    &text,
                    &self.classifier.sectors,
                    self.classifier.min_confidence,
                );
                Ok(Outcome::Classify {
                    sector: result.sector,
                    confidence: result.confidence,
                })
            }
            ProbeKind::Dummy => {
                let text = self.fetch_text(url).await?;
                let matched = find_dummy_keyword(&text, &self.classifier.dummy_keywords)
                    .map(str::to_string);
                Ok(Outcome::Dummy {
                    is_dummy: matched.is_some(),
                    matched,
                })
            }
            ProbeKind::Scheme => Ok(scheme_outcome(task)),
        }
    }
}

/// Resolves a `Location` header against the URL that returned it
fn resolve_location(current: &Url, value: &HeaderValue) -> Result<Url, ProbeFailure> {
    let location = value.to_str().map_err(|_| {
        ProbeFailure::new(
            ErrorKind::HttpProtocolError,
            format!("non-UTF-8 Location header from {}", current),
        )
    })?;

    current.join(location).map_err(|e| {
        ProbeFailure::new(
            ErrorKind::HttpProtocolError,
            format!("invalid redirect target '{}': {}", location, e),
        )
    })
}

/// Maps a reqwest error onto the failure taxonomy
///
/// reqwest only exposes coarse predicates, so connect errors are refined by
/// looking at the messages in the source chain.
pub(crate) fn classify_error(error: reqwest::Error) -> ProbeFailure {
    // The request URL would otherwise leak into the keyword matching below.
    let error = error.without_url();
    let detail = error_chain(&error);
    let lowered = detail.to_lowercase();

    let kind = if error.is_timeout() {
        ErrorKind::Timeout
    } else if is_tls_message(&lowered) {
        ErrorKind::TlsError
    } else if lowered.contains("dns error")
        || lowered.contains("failed to lookup address")
        || lowered.contains("name or service not known")
        || lowered.contains("no such host")
    {
        ErrorKind::DnsFailure
    } else if lowered.contains("connection refused") {
        ErrorKind::ConnectionRefused
    } else if error.is_redirect() || error.is_request() || error.is_body() || error.is_decode() {
        ErrorKind::HttpProtocolError
    } else {
        ErrorKind::Unknown
    };

    ProbeFailure::new(kind, detail)
}

fn is_tls_message(lowered: &str) -> bool {
    ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|needle| lowered.contains(needle))
}

/// Joins an error and all of its sources into one message
fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
