//! Full batches through the dispatcher

use crate::{closed_port, test_probe};
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url_sentry::config::CheckerConfig;
use url_sentry::output::{load_run, MemorySink, RunStatus};
use url_sentry::{BatchState, Dispatcher, ErrorKind, OutputTarget, ProbeKind, SentryError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn checker(concurrency: usize) -> CheckerConfig {
    CheckerConfig {
        concurrency,
        timeout_ms: 2000,
        ..CheckerConfig::default()
    }
}

/// Serves `/ok/<n>` with 200 and `/missing` with 404
async fn start_site() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(20)))
        .mount(&server)
        .await;
    server
}

fn batch_urls(server: &MockServer) -> Vec<String> {
    let base = server.uri();
    let bare = base.trim_start_matches("http://").to_string();

    let mut urls: Vec<String> = (0..10).map(|i| format!("{}/ok/{}", base, i)).collect();
    urls.push(format!("{}/missing", base));
    urls.push(format!("{}/ok/bare", bare));
    urls.push(format!("http://127.0.0.1:{}/", closed_port()));
    // duplicates are checked and recorded twice
    urls.push(format!("{}/ok/0", base));
    urls
}

fn sorted(mut values: Vec<String>) -> Vec<String> {
    values.sort();
    values
}

#[tokio::test]
async fn csv_batch_records_every_url_once() {
    let server = start_site().await;
    let urls = batch_urls(&server);
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("status.csv");

    let dispatcher = Dispatcher::new(Arc::new(test_probe()), &checker(4));
    let summary = dispatcher
        .run_batch(
            &urls,
            ProbeKind::Status,
            &OutputTarget::Csv(out.clone()),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.total, urls.len() as u64);
    assert_eq!(summary.completed, urls.len() as u64);
    assert_eq!(summary.state, BatchState::Done);
    assert_eq!(summary.succeeded.get("200"), Some(&12));
    assert_eq!(summary.succeeded.get("404"), Some(&1));
    assert_eq!(summary.failed.get(&ErrorKind::ConnectionRefused), Some(&1));

    let mut reader = csv::Reader::from_path(&out).unwrap();
    assert_eq!(
        reader.headers().unwrap().iter().collect::<Vec<_>>(),
        vec!["Original URL", "Status"]
    );
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    let originals: Vec<String> = rows.iter().map(|r| r[0].to_string()).collect();
    assert_eq!(sorted(originals), sorted(urls.clone()));

    let by_url: HashMap<String, String> = rows
        .iter()
        .map(|r| (r[0].to_string(), r[1].to_string()))
        .collect();
    assert_eq!(by_url[&format!("{}/missing", server.uri())], "404");
    assert!(by_url[&urls[12]].starts_with("error (connection_refused)"));
}

#[tokio::test]
async fn sqlite_batch_records_run_and_results() {
    let server = start_site().await;
    let urls = batch_urls(&server);
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("results.db");

    let dispatcher =
        Dispatcher::new(Arc::new(test_probe()), &checker(3)).with_config_hash("feedface");
    let summary = dispatcher
        .run_batch(
            &urls,
            ProbeKind::Status,
            &OutputTarget::Sqlite(db.clone()),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(summary.completed, urls.len() as u64);

    let conn = Connection::open(&db).unwrap();
    let run = load_run(&conn, 1).unwrap().expect("run recorded");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "feedface");
    assert_eq!(run.probe_kind, "status");
    assert_eq!(run.records, urls.len() as u64);

    let mut stmt = conn
        .prepare("SELECT original_url FROM results WHERE run_id = 1 ORDER BY seq")
        .unwrap();
    let stored: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(sorted(stored), sorted(urls));
}

#[tokio::test]
async fn scheme_batch_needs_no_server() {
    let urls = vec![
        "www.ikea.com".to_string(),
        "https://www.ebay.com".to_string(),
        "HTTP://archive.org".to_string(),
    ];
    let dispatcher = Dispatcher::new(Arc::new(test_probe()), &checker(2));
    let mut sink = MemorySink::new();

    let summary = dispatcher
        .run_batch_with_sink(&urls, ProbeKind::Scheme, &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.succeeded.get("without scheme"), Some(&1));
    assert_eq!(summary.succeeded.get("with scheme"), Some(&2));
    assert_eq!(sink.reports().len(), 3);
}

#[tokio::test]
async fn cancelled_batch_keeps_completed_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fast"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let mut urls = vec![format!("{}/fast", server.uri())];
    urls.extend((0..6).map(|i| format!("{}/stall/{}", server.uri(), i)));

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("partial.csv");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let dispatcher = Dispatcher::new(
        Arc::new(test_probe()),
        &CheckerConfig {
            concurrency: 2,
            timeout_ms: 60_000,
            ..CheckerConfig::default()
        },
    );
    let summary = dispatcher
        .run_batch(&urls, ProbeKind::Status, &OutputTarget::Csv(out.clone()), &cancel)
        .await
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.state, BatchState::Done);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.completed + summary.abandoned, urls.len() as u64);

    let mut reader = csv::Reader::from_path(&out).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], urls[0].as_str());
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("never.csv");
    let dispatcher = Dispatcher::new(Arc::new(test_probe()), &checker(2));

    let result = dispatcher
        .run_batch(
            &[],
            ProbeKind::Status,
            &OutputTarget::Csv(out.clone()),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(SentryError::EmptyBatch)));
    assert!(!out.exists());
}
