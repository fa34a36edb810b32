//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the listing, detail and comment
//! endpoints and run the full two-level crawl end-to-end.

use fang_comments::config::Config;
use fang_comments::crawler::{crawl, Coordinator};
use fang_comments::{ExtractionError, SpiderError};
use serde_json::json;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMMENT_PATH: &str = "house/ajaxrequest/dianpingList_201501.php";

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, output: &Path) -> Config {
    let mut config = Config::default();
    config.site.listing_url_template = format!("{}/house/s/b9{{page}}/", base_url);
    config.http.timeout_secs = 5;
    config.http.backoff_min_ms = 1; // Very short for testing
    config.http.backoff_max_ms = 5;
    config.crawler.page_size = 2;
    config.output.directory = output.join("fang_comments");
    config
}

/// Listing page markup, GBK-encoded like the real site
fn listing_page(base_url: &str, total: u64, items: &[(&str, &str)]) -> Vec<u8> {
    let host = base_url.trim_start_matches("http:");
    let anchors: String = items
        .iter()
        .map(|(title, slug)| {
            format!(
                r#"<div class="nlclist"><div class="nlcd_name"><a href="{}/{}/" target="_blank">
                    {}
                </a></div></div>"#,
                host, slug, title
            )
        })
        .collect();

    let html = format!(
        r#"<html><head><meta charset="gb2312"><title>新房</title></head><body>
        <div id="sjina_C01_47"><ul><li>共<b>{}</b>个楼盘</li></ul></div>
        {}
        </body></html>"#,
        total, anchors
    );

    let (bytes, _, _) = encoding_rs::GBK.encode(&html);
    bytes.into_owned()
}

fn detail_page(identifier: &str) -> String {
    format!(
        r#"<html><head>
        <meta name="mobile-agent" content="format=html5;url=//m.fang.com/xf/xian/{}.htm">
        </head><body>detail</body></html>"#,
        identifier
    )
}

fn comments(count: usize) -> serde_json::Value {
    let list: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "user_id": 5000 + i,
                "username": format!("user{}", i),
                "create_time": "2020-03-21",
                "content": format!("  good<br/>{}  ", i),
            })
        })
        .collect();
    json!({ "count": count, "list": list })
}

async fn mount_listing(server: &MockServer, page: u64, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("/house/s/b9{}/", page)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_bytes(body),
        )
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, slug: &str, identifier: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/", slug)))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(identifier)))
        .mount(server)
        .await;
}

/// Mounts both comment phases for one item
async fn mount_comments(server: &MockServer, slug: &str, identifier: &str, count: usize) {
    let endpoint = format!("/{}/{}", slug, COMMENT_PATH);
    let id_field = format!("dianpingNewcode={}&", identifier);

    if count == 0 {
        Mock::given(method("POST"))
            .and(path(endpoint))
            .and(body_string_contains(id_field))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 0 })))
            .expect(1)
            .mount(server)
            .await;
        return;
    }

    // Count phase
    Mock::given(method("POST"))
        .and(path(endpoint.clone()))
        .and(body_string_contains(id_field.clone()))
        .and(body_string_contains("pagesize=1&"))
        .respond_with(ResponseTemplate::new(200).set_body_json(comments(count)))
        .mount(server)
        .await;

    // Fetch-all phase
    Mock::given(method("POST"))
        .and(path(endpoint))
        .and(body_string_contains(id_field))
        .and(body_string_contains(format!("pagesize={}&", count)))
        .respond_with(ResponseTemplate::new(200).set_body_json(comments(count)))
        .mount(server)
        .await;
}

fn read_output(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name))
        .unwrap_or_else(|e| panic!("missing output file {}: {}", name, e))
}

#[tokio::test]
async fn test_full_crawl_two_pages() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let tmp = TempDir::new().unwrap();

    // 3 records at 2 per page -> 2 pages
    mount_listing(
        &mock_server,
        1,
        listing_page(&base_url, 3, &[("曲江/苑", "a"), ("万科城", "b")]),
    )
    .await;
    mount_listing(&mock_server, 2, listing_page(&base_url, 3, &[("绿地", "c")])).await;

    mount_detail(&mock_server, "a", "1001").await;
    mount_detail(&mock_server, "b", "1002").await;
    mount_detail(&mock_server, "c", "1003").await;

    mount_comments(&mock_server, "a", "1001", 2).await;
    mount_comments(&mock_server, "b", "1002", 1).await;
    mount_comments(&mock_server, "c", "1003", 0).await;

    let config = create_test_config(&base_url, tmp.path());
    let out = config.output.directory.clone();

    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let summary = coordinator.run().await.expect("Crawl failed");

    assert_eq!(summary.pages_planned, 2);
    assert_eq!(summary.pages_listed, 2);
    assert_eq!(summary.items_discovered, 3);
    assert_eq!(summary.identifiers_resolved, 3);
    assert_eq!(summary.items_written, 2);
    assert_eq!(summary.items_without_comments, 1);
    assert_eq!(summary.items_skipped, 0);
    assert_eq!(summary.comments_written, 3);

    assert_eq!(
        read_output(&out, "曲江_苑_[评论2条].txt"),
        "[5000]|[user0]|[2020-03-21]|good0\n[5001]|[user1]|[2020-03-21]|good1\n"
    );
    assert_eq!(
        read_output(&out, "万科城_[评论1条].txt"),
        "[5000]|[user0]|[2020-03-21]|good0\n"
    );

    // Zero comments: no file at all
    let files = std::fs::read_dir(&out).unwrap().count();
    assert_eq!(files, 2);
}

#[tokio::test]
async fn test_failed_item_does_not_stop_siblings() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let tmp = TempDir::new().unwrap();

    mount_listing(
        &mock_server,
        1,
        listing_page(&base_url, 2, &[("A", "a"), ("B", "b"), ("C", "c")]),
    )
    .await;

    mount_detail(&mock_server, "a", "1").await;
    mount_detail(&mock_server, "c", "3").await;

    // B's detail page is gone: every attempt fails, and no sixth one is made
    Mock::given(method("GET"))
        .and(path("/b/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(5)
        .mount(&mock_server)
        .await;

    mount_comments(&mock_server, "a", "1", 2).await;
    mount_comments(&mock_server, "c", "3", 3).await;

    let mut config = create_test_config(&base_url, tmp.path());
    config.crawler.page_size = 20;
    let out = config.output.directory.clone();

    let summary = Coordinator::new(config)
        .unwrap()
        .run()
        .await
        .expect("A failing item must not fail the run");

    assert_eq!(summary.pages_listed, 1);
    assert_eq!(summary.items_discovered, 3);
    assert_eq!(summary.items_written, 2);
    assert_eq!(summary.items_skipped, 1);

    assert!(out.join("A_[评论2条].txt").exists());
    assert!(out.join("C_[评论3条].txt").exists());
    assert!(!out.join("B_[评论0条].txt").exists());
}

#[tokio::test]
async fn test_fetch_all_uses_exact_count_as_page_size() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let tmp = TempDir::new().unwrap();

    mount_listing(&mock_server, 1, listing_page(&base_url, 1, &[("Big", "big")])).await;
    mount_detail(&mock_server, "big", "777").await;

    let endpoint = format!("/big/{}", COMMENT_PATH);
    Mock::given(method("POST"))
        .and(path(endpoint.clone()))
        .and(body_string_contains("pagesize=1&"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": "137" })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path(endpoint))
        .and(body_string_contains("pagesize=137&"))
        .respond_with(ResponseTemplate::new(200).set_body_json(comments(137)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, tmp.path());
    let out = config.output.directory.clone();
    let summary = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.comments_written, 137);
    let written = read_output(&out, "Big_[评论137条].txt");
    assert_eq!(written.lines().count(), 137);
}

#[tokio::test]
async fn test_zero_records_means_zero_pages() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let tmp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/house/s/b91/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(listing_page(&base_url, 0, &[])))
        .expect(1) // Only the page-count request, no page task
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, tmp.path());
    let out = config.output.directory.clone();
    let summary = crawl(config).await.unwrap();

    assert_eq!(summary.pages_planned, 0);
    assert_eq!(summary.items_discovered, 0);
    assert!(!out.exists());
}

#[tokio::test]
async fn test_missing_total_count_is_fatal() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let tmp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/house/s/b91/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>maintenance</body></html>"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, tmp.path());
    let result = Coordinator::new(config).unwrap().run().await;

    assert!(matches!(
        result,
        Err(SpiderError::Extraction(ExtractionError::MissingNode { .. }))
    ));
}

#[tokio::test]
async fn test_unreachable_listing_is_fatal() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let tmp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/house/s/b91/"))
        .respond_with(ResponseTemplate::new(502))
        .expect(5)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, tmp.path());
    let result = Coordinator::new(config).unwrap().run().await;

    match result {
        Err(SpiderError::RequestFailure { attempts, .. }) => assert_eq!(attempts, 5),
        other => panic!("expected a request failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_comment_json_skips_item() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let tmp = TempDir::new().unwrap();

    mount_listing(
        &mock_server,
        1,
        listing_page(&base_url, 2, &[("Broken", "x"), ("Fine", "y")]),
    )
    .await;
    mount_detail(&mock_server, "x", "11").await;
    mount_detail(&mock_server, "y", "12").await;

    Mock::given(method("POST"))
        .and(path(format!("/x/{}", COMMENT_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>error</html>"))
        .mount(&mock_server)
        .await;
    mount_comments(&mock_server, "y", "12", 1).await;

    let config = create_test_config(&base_url, tmp.path());
    let out = config.output.directory.clone();
    let summary = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.items_skipped, 1);
    assert_eq!(summary.items_written, 1);
    assert!(out.join("Fine_[评论1条].txt").exists());
}

#[tokio::test]
async fn test_capped_item_fan_out_processes_every_item() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let tmp = TempDir::new().unwrap();

    let items = [("P1", "p1"), ("P2", "p2"), ("P3", "p3"), ("P4", "p4")];
    mount_listing(&mock_server, 1, listing_page(&base_url, 4, &items)).await;
    for (i, (_, slug)) in items.iter().enumerate() {
        let id = format!("90{}", i);
        mount_detail(&mock_server, slug, &id).await;
        mount_comments(&mock_server, slug, &id, i + 1).await;
    }

    let mut config = create_test_config(&base_url, tmp.path());
    config.crawler.page_size = 20;
    config.crawler.max_items_in_flight = Some(1);
    let out = config.output.directory.clone();

    let summary = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.items_written, 4);
    assert_eq!(summary.comments_written, 1 + 2 + 3 + 4);
    assert!(out.join("P4_[评论4条].txt").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_items_of_a_page_resolve_concurrently() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let tmp = TempDir::new().unwrap();

    let delay = Duration::from_millis(800);
    let items = [("S1", "s1"), ("S2", "s2"), ("S3", "s3"), ("S4", "s4")];
    mount_listing(&mock_server, 1, listing_page(&base_url, 4, &items)).await;
    for (i, (_, slug)) in items.iter().enumerate() {
        let id = format!("70{}", i);
        Mock::given(method("GET"))
            .and(path(format!("/{}/", slug)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(detail_page(&id))
                    .set_delay(delay),
            )
            .mount(&mock_server)
            .await;
        mount_comments(&mock_server, slug, &id, 1).await;
    }

    let mut config = create_test_config(&base_url, tmp.path());
    config.crawler.page_size = 20;

    let started = Instant::now();
    let summary = Coordinator::new(config).unwrap().run().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(summary.items_written, 4);
    // Four slow detail pages in sequence would take at least 3.2s
    assert!(
        elapsed < delay * 2,
        "items were not fetched concurrently: took {:?}",
        elapsed
    );
}
