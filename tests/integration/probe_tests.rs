//! Probe behavior against mock servers

use crate::{closed_port, test_probe, test_settings};
use std::time::Duration;
use url_sentry::config::ClassifierConfig;
use url_sentry::{ErrorKind, HttpProbe, Outcome, Probe, ProbeKind, UrlTask};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_redirect(server: &MockServer, verb: &str, from: &str, status: u16, to: &str) {
    Mock::given(method(verb))
        .and(path(from))
        .respond_with(ResponseTemplate::new(status).insert_header("Location", to))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, at: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html; charset=utf-8"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn two_hop_redirect_reports_chain_and_final() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_redirect(&server, "HEAD", "/a", 301, &format!("{}/b", base)).await;
    // relative Location is resolved against the current hop
    mount_redirect(&server, "HEAD", "/b", 302, "/c").await;
    Mock::given(method("HEAD"))
        .and(path("/c"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let task = UrlTask::new(0, format!("{}/a", base));
    let outcome = test_probe()
        .probe(&task, ProbeKind::Redirect)
        .await
        .expect("redirect trace succeeds");

    assert_eq!(
        outcome,
        Outcome::Redirect {
            redirected: true,
            chain: vec![format!("{}/a", base), format!("{}/b", base)],
            final_url: format!("{}/c", base),
        }
    );
}

#[tokio::test]
async fn no_redirect_reports_input_as_final() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/home"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let url = format!("{}/home", server.uri());
    let outcome = test_probe()
        .probe(&UrlTask::new(0, url.clone()), ProbeKind::Redirect)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Redirect {
            redirected: false,
            chain: vec![],
            final_url: url,
        }
    );
}

#[tokio::test]
async fn head_refused_falls_back_to_get() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("HEAD"))
        .and(path("/legacy"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    mount_redirect(&server, "GET", "/legacy", 301, "/new").await;
    Mock::given(method("HEAD"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let outcome = test_probe()
        .probe(&UrlTask::new(0, format!("{}/legacy", base)), ProbeKind::Redirect)
        .await
        .unwrap();

    match outcome {
        Outcome::Redirect {
            redirected,
            final_url,
            ..
        } => {
            assert!(redirected);
            assert_eq!(final_url, format!("{}/new", base));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn redirect_loop_is_protocol_error() {
    let server = MockServer::start().await;
    mount_redirect(&server, "HEAD", "/ping", 302, "/pong").await;
    mount_redirect(&server, "HEAD", "/pong", 302, "/ping").await;

    let failure = test_probe()
        .probe(
            &UrlTask::new(0, format!("{}/ping", server.uri())),
            ProbeKind::Redirect,
        )
        .await
        .unwrap_err();

    assert_eq!(failure.kind, ErrorKind::HttpProtocolError);
    assert!(failure.message.contains("loop"));
}

#[tokio::test]
async fn status_reports_error_codes_as_outcomes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let outcome = test_probe()
        .probe(
            &UrlTask::new(0, format!("{}/gone", server.uri())),
            ProbeKind::Status,
        )
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Status { code: 404 });
}

#[tokio::test]
async fn status_follows_redirects() {
    let server = MockServer::start().await;
    mount_redirect(&server, "GET", "/old", 301, "/current").await;
    mount_page(&server, "/current", "<html>ok</html>").await;

    let outcome = test_probe()
        .probe(
            &UrlTask::new(0, format!("{}/old", server.uri())),
            ProbeKind::Status,
        )
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Status { code: 200 });
}

#[tokio::test]
async fn bare_host_gets_http_scheme() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let bare = server.uri().trim_start_matches("http://").to_string();
    let outcome = test_probe()
        .probe(&UrlTask::new(0, bare), ProbeKind::Status)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Status { code: 204 });
}

#[tokio::test]
async fn classify_reads_visible_text() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/chips",
        r#"<html><head><script>var drug = "medicine";</script></head>
        <body><h1>Semiconductor Display Materials</h1></body></html>"#,
    )
    .await;

    let outcome = test_probe()
        .probe(
            &UrlTask::new(0, format!("{}/chips", server.uri())),
            ProbeKind::Classify,
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Classify {
            sector: "electronics".to_string(),
            confidence: 0.75,
        }
    );
}

#[tokio::test]
async fn dummy_page_detected() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/soon",
        "<html><body><p>Our new shop is Coming Soon!</p></body></html>",
    )
    .await;
    mount_page(&server, "/shop", "<html><body><p>Add to cart</p></body></html>").await;

    let probe = test_probe();
    let dummy = probe
        .probe(
            &UrlTask::new(0, format!("{}/soon", server.uri())),
            ProbeKind::Dummy,
        )
        .await
        .unwrap();
    assert_eq!(
        dummy,
        Outcome::Dummy {
            is_dummy: true,
            matched: Some("coming soon".to_string()),
        }
    );

    let live = probe
        .probe(
            &UrlTask::new(1, format!("{}/shop", server.uri())),
            ProbeKind::Dummy,
        )
        .await
        .unwrap();
    assert_eq!(
        live,
        Outcome::Dummy {
            is_dummy: false,
            matched: None,
        }
    );
}

#[tokio::test]
async fn connection_refused_is_classified() {
    let url = format!("http://127.0.0.1:{}/", closed_port());

    for kind in [ProbeKind::Status, ProbeKind::Redirect, ProbeKind::Classify] {
        let failure = test_probe()
            .probe(&UrlTask::new(0, url.clone()), kind)
            .await
            .unwrap_err();
        assert_eq!(failure.kind, ErrorKind::ConnectionRefused, "{} probe", kind);
    }
}

#[tokio::test]
async fn slow_server_is_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let probe = HttpProbe::new(
        test_settings(Duration::from_millis(200)),
        ClassifierConfig::default(),
    )
    .unwrap();

    let failure = probe
        .probe(
            &UrlTask::new(0, format!("{}/slow", server.uri())),
            ProbeKind::Status,
        )
        .await
        .unwrap_err();

    assert_eq!(failure.kind, ErrorKind::Timeout);
}

#[tokio::test]
async fn https_to_plaintext_server_is_tls_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let url = format!("https://127.0.0.1:{}/", server.address().port());
    let failure = test_probe()
        .probe(&UrlTask::new(0, url), ProbeKind::Status)
        .await
        .unwrap_err();

    assert_eq!(failure.kind, ErrorKind::TlsError, "{}", failure.message);
}

#[tokio::test]
async fn unresolvable_host_is_dns_failure() {
    // .invalid never resolves
    let failure = test_probe()
        .probe(
            &UrlTask::new(0, "http://nonexistent-host.invalid/"),
            ProbeKind::Status,
        )
        .await
        .unwrap_err();

    assert_eq!(failure.kind, ErrorKind::DnsFailure, "{}", failure.message);
}
