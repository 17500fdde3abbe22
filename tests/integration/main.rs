//! Integration tests
//!
//! These tests use wiremock to stand in for the checked sites and exercise
//! the probes and full batches end-to-end.

mod batch_tests;
mod probe_tests;

use std::time::Duration;
use url_sentry::config::ClassifierConfig;
use url_sentry::probe::HttpSettings;
use url_sentry::HttpProbe;

pub fn test_settings(timeout: Duration) -> HttpSettings {
    HttpSettings {
        timeout,
        verify_tls: false,
        max_redirects: 5,
        user_agent: "url-sentry-test/1.0".to_string(),
    }
}

pub fn test_probe() -> HttpProbe {
    HttpProbe::new(test_settings(Duration::from_secs(5)), ClassifierConfig::default())
        .expect("client builds")
}

/// A local port with nothing listening on it
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    port
}
