//! Integration tests for the fetcher
//!
//! These tests use wiremock to stand in for a rate-limiting origin that serves
//! block and not-found pages with HTTP 200.

use drugbank_harvester::config::{FetcherConfig, SiteConfig};
use drugbank_harvester::crawler::{Fetcher, RunCounters};
use drugbank_harvester::FetchError;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BLOCK_PAGE: &str = "<html><body><h1>Error code: 1015</h1>You are being rate limited.</body></html>";
const NOT_FOUND_PAGE: &str = "<html><body><h1>Page not found</h1></body></html>";
const CLEAN_PAGE: &str = r#"<html><body>
    <a class="track-link" href="/ads/1">Sponsored</a>
    <dl><dt>Type</dt><dd>Small Molecule</dd></dl>
</body></html>"#;

/// Creates a fetcher with instant sleeps
fn create_test_fetcher(retry_limit: u32) -> (Fetcher, Arc<RunCounters>) {
    let config = FetcherConfig {
        retry_limit,
        base_delay_ms: 0,
        error_delay_ms: 5,
        ..FetcherConfig::default()
    };
    let counters = Arc::new(RunCounters::new());
    let fetcher = Fetcher::new(&config, &SiteConfig::default(), Arc::clone(&counters))
        .expect("Failed to build fetcher");
    (fetcher, counters)
}

async fn mount_clean_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/drugs/DB00001"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CLEAN_PAGE))
        .mount(server)
        .await;
}

async fn mount_failures_then_success(server: &MockServer, failure: ResponseTemplate, failures: u64) {
    // Mocks match in mount order, so the failures are served first
    if failures > 0 {
        Mock::given(method("GET"))
            .and(path("/drugs/DB00001"))
            .respond_with(failure)
            .up_to_n_times(failures)
            .mount(server)
            .await;
    }

    mount_clean_page(server).await;
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .expect("Request recording is enabled")
        .len()
}

#[tokio::test]
async fn test_k_block_pages_then_success() {
    for failures in 0..4u64 {
        let mock_server = MockServer::start().await;
        mount_failures_then_success(
            &mock_server,
            ResponseTemplate::new(200).set_body_string(BLOCK_PAGE),
            failures,
        )
        .await;

        let (fetcher, counters) = create_test_fetcher(4);
        let url = format!("{}/drugs/DB00001", mock_server.uri());

        let document = fetcher
            .fetch_document(&url)
            .await
            .expect("Fetch should succeed on the final attempt");

        assert_eq!(document.select("dd").unwrap()[0].text(), "Small Molecule");
        assert_eq!(request_count(&mock_server).await, failures as usize + 1);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.requests, 1);
        assert_eq!(snapshot.retries, failures);
        assert_eq!(snapshot.errors, failures);
        // One recovery sleep per failure plus the pacing sleep after success
        assert_eq!(snapshot.sleeps, failures + 1);
        assert!(snapshot.rate_limit_failures.is_empty());
    }
}

#[tokio::test]
async fn test_not_found_page_consumes_a_retry() {
    let mock_server = MockServer::start().await;
    mount_failures_then_success(
        &mock_server,
        ResponseTemplate::new(200).set_body_string(NOT_FOUND_PAGE),
        1,
    )
    .await;

    let (fetcher, counters) = create_test_fetcher(4);
    let url = format!("{}/drugs/DB00001", mock_server.uri());

    assert!(fetcher.fetch_document(&url).await.is_ok());
    assert_eq!(request_count(&mock_server).await, 2);
    assert_eq!(counters.retries(), 1);

    let snapshot = counters.snapshot();
    assert!(snapshot.error_log[0].contains("Not-found page served"));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let mock_server = MockServer::start().await;
    mount_failures_then_success(&mock_server, ResponseTemplate::new(503), 2).await;

    let (fetcher, counters) = create_test_fetcher(4);
    let url = format!("{}/drugs/DB00001", mock_server.uri());

    assert!(fetcher.fetch_document(&url).await.is_ok());
    assert_eq!(request_count(&mock_server).await, 3);
    assert_eq!(counters.retries(), 2);
}

#[tokio::test]
async fn test_exhaustion_is_terminal() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drugs/DB00001"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BLOCK_PAGE))
        .mount(&mock_server)
        .await;

    let (fetcher, counters) = create_test_fetcher(3);
    let url = format!("{}/drugs/DB00001", mock_server.uri());

    let result = fetcher.fetch_document(&url).await;

    match result {
        Err(FetchError::Exhausted { url: failed, attempts }) => {
            assert_eq!(failed, url);
            assert_eq!(attempts, 3);
        }
        other => panic!("Expected exhaustion, got {:?}", other.map(|_| ())),
    }

    assert_eq!(request_count(&mock_server).await, 3);

    let snapshot = counters.snapshot();
    assert_eq!(snapshot.requests, 1);
    // No retry follows the final attempt
    assert_eq!(snapshot.retries, 2);
    assert_eq!(snapshot.errors, 3);
    assert_eq!(snapshot.rate_limit_failures, vec![url]);
}

#[tokio::test]
async fn test_fetched_document_has_no_tracking_links() {
    let mock_server = MockServer::start().await;
    mount_clean_page(&mock_server).await;

    let (fetcher, _counters) = create_test_fetcher(2);
    let url = format!("{}/drugs/DB00001", mock_server.uri());

    let page = fetcher.fetch(&url, true).await.unwrap();

    assert!(page.body.contains("track-link"));
    let document = page.document.expect("Document was requested");
    assert!(document.select("a").unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_text_returns_raw_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drugs/DB00001/drug_interactions.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"recordsTotal":0,"data":[]}"#))
        .mount(&mock_server)
        .await;

    let (fetcher, counters) = create_test_fetcher(2);
    let url = format!("{}/drugs/DB00001/drug_interactions.json", mock_server.uri());

    let body = fetcher.fetch_text(&url).await.unwrap();

    assert_eq!(body, r#"{"recordsTotal":0,"data":[]}"#);
    assert_eq!(counters.requests(), 1);
}

#[tokio::test]
async fn test_unparseable_document_consumes_retries() {
    let mock_server = MockServer::start().await;
    mount_clean_page(&mock_server).await;

    let config = FetcherConfig {
        retry_limit: 3,
        base_delay_ms: 0,
        error_delay_ms: 0,
        ..FetcherConfig::default()
    };
    let site = SiteConfig {
        tracking_link_selector: "a[".to_string(),
        ..SiteConfig::default()
    };
    let counters = Arc::new(RunCounters::new());
    let fetcher = Fetcher::new(&config, &site, Arc::clone(&counters)).unwrap();
    let url = format!("{}/drugs/DB00001", mock_server.uri());

    let result = fetcher.fetch_document(&url).await;

    assert!(matches!(result, Err(FetchError::Exhausted { attempts: 3, .. })));
    assert_eq!(request_count(&mock_server).await, 3);

    let snapshot = counters.snapshot();
    assert_eq!(snapshot.retries, 2);
    assert_eq!(snapshot.errors, 3);
    assert!(snapshot.error_log.iter().all(|entry| entry.contains("Unparseable document")));
    assert_eq!(snapshot.rate_limit_failures, vec![url]);

    // Raw text needs no document, so the same page succeeds
    assert!(fetcher.fetch_text(&format!("{}/drugs/DB00001", mock_server.uri())).await.is_ok());
}
