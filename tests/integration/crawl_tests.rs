//! Integration tests for the harvester
//!
//! These tests use wiremock to stand up a mock listing site and run the
//! full harvest cycle end-to-end against a CSV result file.

use std::path::Path;
use std::sync::{Arc, Mutex};
use sumi_harvest::config::{parse_config, Config};
use sumi_harvest::crawler::{Coordinator, StopReason};
use sumi_harvest::record::Record;
use sumi_harvest::storage::{open_store, CsvStore, Store, StorageResult};
use sumi_harvest::transport::ReqwestTransport;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/listing/north/plumbers";

/// Creates a test configuration pointing at the mock server with no delays
fn create_test_config(server_uri: &str, results_path: &Path, max_pages: Option<u32>) -> Config {
    let ceiling = max_pages
        .map(|n| format!("max-pages = {}", n))
        .unwrap_or_default();
    let toml = format!(
        r#"
[site]
listing-url = "{uri}/listing/{{region}}/{{category}}"
reveal-url = "{uri}/reveal"

[fetch]
max-attempts = 4
base-delay-ms = 0
timeout-secs = 5

[reveal]
max-attempts = 2
base-delay-ms = 0
delay-ms = 0

[crawler]
page-size = 5
{ceiling}

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
results-path = "{results}"
"#,
        uri = server_uri,
        ceiling = ceiling,
        results = results_path.display()
    );
    parse_config(&toml).expect("test config should be valid")
}

/// Renders a listing page with entries `first..first + count`
fn listing_page(first: usize, count: usize, next: Option<u32>) -> String {
    let entries: String = (first..first + count)
        .map(|i| {
            format!(
                r##"<div class="entry">
                    <h3>Name: Firm {i}</h3>
                    <p>Category: Plumbing</p>
                    <p>Phone: 555-010{i}</p>
                    <p>Description: family business</p>
                    <a href="#" data-reveal-key="k{i}">Show email</a>
                </div>"##
            )
        })
        .collect();
    let next = next
        .map(|page| {
            format!(
                r#"<form class="next-page" method="post">
                    <input type="hidden" name="p" value="{}">
                    <button type="submit">Next</button>
                </form>"#,
                page
            )
        })
        .unwrap_or_default();
    format!(
        "<html><head><title>Listing</title></head><body>{}{}</body></html>",
        entries, next
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

/// Mounts the first listing page
async fn mount_first_page(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Mounts a later listing page, reached by posting the "next" form
async fn mount_page(server: &MockServer, page: u32, body: String) {
    Mock::given(method("POST"))
        .and(path(LISTING_PATH))
        .and(body_string_contains(format!("p={}", page)))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Lookups answer with an address for every other key, JSON for some
async fn mount_reveals(server: &MockServer, keys: std::ops::Range<usize>) {
    for i in keys {
        let body = match i % 3 {
            0 => format!("firm{}@example.com", i),
            1 => format!(r#"{{"status":"ok","email":"firm{}@example.com"}}"#, i),
            _ => "<p>Please log in</p>".to_string(),
        };
        Mock::given(method("GET"))
            .and(path("/reveal"))
            .and(query_param("id", format!("k{}", i)))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }
}

fn transport(config: &Config) -> Arc<ReqwestTransport> {
    Arc::new(ReqwestTransport::from_config(&config.user_agent).expect("client should build"))
}

fn listing_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}{}", server.uri(), LISTING_PATH)).unwrap()
}

/// Keys of the reveal lookups the server received, in order
async fn revealed_keys(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == "/reveal")
        .filter_map(|request| {
            request
                .url
                .query_pairs()
                .find(|(k, _)| k == "id")
                .map(|(_, v)| v.into_owned())
        })
        .collect()
}

fn names(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.field("Name").map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_two_page_harvest() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &temp.path().join("results.csv"), None);

    mount_first_page(&server, listing_page(0, 5, Some(2))).await;
    mount_page(&server, 2, listing_page(5, 3, None)).await;
    mount_reveals(&server, 0..8).await;

    let mut coordinator = Coordinator::with_parts(
        config.clone(),
        transport(&config),
        open_store(&config),
        listing_url(&server),
        false,
    );
    let report = coordinator.run().await.expect("harvest should succeed");

    assert_eq!(report.pages_processed, 2);
    assert_eq!(report.reveal_attempts, 8);
    assert_eq!(report.stop_reason, StopReason::NoContinuation { page: 2 });

    let records = open_store(&config).load();
    assert_eq!(records.len(), 8);
    assert_eq!(
        names(&records),
        (0..8).map(|i| format!("Firm {}", i)).collect::<Vec<_>>()
    );

    for (i, record) in records.iter().enumerate() {
        let expected = match i % 3 {
            2 => None,
            _ => Some(format!("firm{}@example.com", i)),
        };
        assert_eq!(record.revealed_value(), expected.as_deref(), "record {}", i);
        assert_eq!(record.field("Category"), Some("Plumbing"));
        assert!(!record.dispatched);
    }

    assert_eq!(
        revealed_keys(&server).await,
        (0..8).map(|i| format!("k{}", i)).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_first_page_failure_leaves_store_untouched() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let results = temp.path().join("results.csv");
    let config = create_test_config(&server.uri(), &results, None);

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::with_parts(
        config.clone(),
        transport(&config),
        open_store(&config),
        listing_url(&server),
        false,
    );
    let report = coordinator
        .run()
        .await
        .expect("fetch failure should not be an error");

    assert!(matches!(
        report.stop_reason,
        StopReason::FetchFailed { page: 1, .. }
    ));
    assert_eq!(report.total_records, 0);
    assert!(!results.exists());
    assert!(revealed_keys(&server).await.is_empty());
}

#[tokio::test]
async fn test_later_page_failure_keeps_last_checkpoint_on_disk() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &temp.path().join("results.csv"), None);

    mount_first_page(&server, listing_page(0, 5, Some(2))).await;
    Mock::given(method("POST"))
        .and(path(LISTING_PATH))
        .and(body_string_contains("p=2"))
        .respond_with(ResponseTemplate::new(502))
        .expect(4)
        .mount(&server)
        .await;
    mount_reveals(&server, 0..5).await;

    let mut coordinator = Coordinator::with_parts(
        config.clone(),
        transport(&config),
        open_store(&config),
        listing_url(&server),
        false,
    );
    let report = coordinator
        .run()
        .await
        .expect("fetch failure should not be an error");

    assert!(matches!(
        report.stop_reason,
        StopReason::FetchFailed { page: 2, .. }
    ));
    assert_eq!(report.pages_processed, 1);

    let records = open_store(&config).load();
    assert_eq!(
        names(&records),
        (0..5).map(|i| format!("Firm {}", i)).collect::<Vec<_>>()
    );
    assert_eq!(records[0].revealed_value(), Some("firm0@example.com"));
}

#[tokio::test]
async fn test_resume_within_first_page_does_not_duplicate_rows() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &temp.path().join("results.csv"), None);

    let prior: Vec<Record> = (0..3)
        .map(|i| {
            let mut record = Record::default();
            record.set_field("Name", format!("Firm {}", i));
            record
        })
        .collect();
    open_store(&config).save(&prior).unwrap();

    mount_first_page(&server, listing_page(0, 5, None)).await;
    mount_reveals(&server, 0..5).await;

    let mut coordinator = Coordinator::with_parts(
        config.clone(),
        transport(&config),
        open_store(&config),
        listing_url(&server),
        false,
    );
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.total_records, 5);
    assert_eq!(revealed_keys(&server).await, vec!["k3", "k4"]);
    assert_eq!(
        names(&open_store(&config).load()),
        (0..5).map(|i| format!("Firm {}", i)).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &temp.path().join("results.csv"), None);

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::with_parts(
        config.clone(),
        transport(&config),
        open_store(&config),
        listing_url(&server),
        false,
    );
    let report = coordinator.run().await.unwrap();

    assert!(matches!(
        report.stop_reason,
        StopReason::FetchFailed { page: 1, .. }
    ));
}

#[tokio::test]
async fn test_page_without_entries_ends_harvest() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &temp.path().join("results.csv"), None);

    mount_first_page(&server, listing_page(0, 5, Some(2))).await;
    mount_page(&server, 2, listing_page(0, 0, Some(3))).await;
    Mock::given(method("POST"))
        .and(path(LISTING_PATH))
        .and(body_string_contains("p=3"))
        .respond_with(html(listing_page(5, 5, None)))
        .expect(0)
        .mount(&server)
        .await;
    mount_reveals(&server, 0..5).await;

    let mut coordinator = Coordinator::with_parts(
        config.clone(),
        transport(&config),
        open_store(&config),
        listing_url(&server),
        false,
    );
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.stop_reason, StopReason::EmptyPage { page: 2 });
    assert_eq!(open_store(&config).load().len(), 5);
}

#[tokio::test]
async fn test_resume_replays_chain_and_skips_captured_pages() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let results = temp.path().join("results.csv");

    mount_first_page(&server, listing_page(0, 5, Some(2))).await;
    mount_page(&server, 2, listing_page(5, 5, Some(3))).await;
    mount_page(&server, 3, listing_page(10, 2, None)).await;
    mount_reveals(&server, 0..12).await;

    // Interrupted run: stops at the page ceiling after two pages
    let interrupted = create_test_config(&server.uri(), &results, Some(2));
    let report = Coordinator::with_parts(
        interrupted.clone(),
        transport(&interrupted),
        open_store(&interrupted),
        listing_url(&server),
        false,
    )
    .run()
    .await
    .unwrap();
    assert_eq!(report.stop_reason, StopReason::PageCeiling { page: 3 });
    assert_eq!(open_store(&interrupted).load().len(), 10);

    server.reset().await;
    mount_first_page(&server, listing_page(0, 5, Some(2))).await;
    mount_page(&server, 2, listing_page(5, 5, Some(3))).await;
    mount_page(&server, 3, listing_page(10, 2, None)).await;
    mount_reveals(&server, 0..12).await;

    // Resumed run: fast-forwards to page 3 and reveals only its entries
    let resumed = create_test_config(&server.uri(), &results, None);
    let report = Coordinator::with_parts(
        resumed.clone(),
        transport(&resumed),
        open_store(&resumed),
        listing_url(&server),
        false,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.start_page, 3);
    assert_eq!(report.carried_forward, 10);
    assert_eq!(report.new_records, 2);
    assert_eq!(revealed_keys(&server).await, vec!["k10", "k11"]);

    let records = open_store(&resumed).load();
    assert_eq!(
        names(&records),
        (0..12).map(|i| format!("Firm {}", i)).collect::<Vec<_>>()
    );
    assert_eq!(records[9].revealed_value(), Some("firm9@example.com"));
    assert_eq!(records[10].revealed_value(), Some("firm10@example.com"));
}

#[tokio::test]
async fn test_resume_abort_keeps_persisted_rows() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &temp.path().join("results.csv"), None);

    let store = open_store(&config);
    let prior: Vec<Record> = (0..10)
        .map(|i| {
            let mut record = Record::default();
            record.set_field("Name", format!("Firm {}", i));
            record.set_revealed(format!("firm{}@example.com", i));
            record.dispatched = i < 4;
            record
        })
        .collect();
    store.save(&prior).unwrap();
    let before = store.load();

    mount_first_page(&server, listing_page(0, 5, Some(2))).await;
    Mock::given(method("POST"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::with_parts(
        config.clone(),
        transport(&config),
        store,
        listing_url(&server),
        false,
    );
    let report = coordinator.run().await.unwrap();

    assert!(matches!(
        report.stop_reason,
        StopReason::ResumeAborted { page: 2, .. }
    ));
    assert_eq!(report.total_records, 10);
    assert_eq!(open_store(&config).load(), before);
    assert!(revealed_keys(&server).await.is_empty());
}

/// Store that records the size of every checkpoint before delegating
struct RecordingStore {
    inner: CsvStore,
    checkpoints: Mutex<Vec<usize>>,
}

impl Store for RecordingStore {
    fn load(&self) -> Vec<Record> {
        self.inner.load()
    }

    fn save(&self, records: &[Record]) -> StorageResult<()> {
        self.checkpoints.lock().unwrap().push(records.len());
        self.inner.save(records)
    }
}

#[tokio::test]
async fn test_checkpoint_after_each_page() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &temp.path().join("results.csv"), None);

    mount_first_page(&server, listing_page(0, 5, Some(2))).await;
    mount_page(&server, 2, listing_page(5, 5, Some(3))).await;
    mount_page(&server, 3, listing_page(10, 4, None)).await;
    mount_reveals(&server, 0..14).await;

    let store = RecordingStore {
        inner: open_store(&config),
        checkpoints: Mutex::default(),
    };
    let mut coordinator = Coordinator::with_parts(
        config.clone(),
        transport(&config),
        store,
        listing_url(&server),
        true,
    );
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.total_records, 14);
    assert_eq!(
        *coordinator.store().checkpoints.lock().unwrap(),
        vec![5, 10, 14]
    );
}
