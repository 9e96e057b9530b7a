//! End-to-end crawls: wiremock sitemaps, recording browser

use crate::support::{fast_config, pages, sitemap_index, urlset, RecordingBrowser};
use sitemap_walker::jitter::Jitter;
use sitemap_walker::sitemap::HttpFetcher;
use sitemap_walker::{Coordinator, CrawlError};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn coordinator(browser: &RecordingBrowser) -> Coordinator {
    let config = fast_config();
    let fetcher = HttpFetcher::with_user_agent(&config.visit.user_agent, Duration::from_secs(5))
        .expect("Failed to build HTTP client");
    Coordinator::with_components(
        config,
        Arc::new(fetcher),
        Arc::new(browser.clone()),
        Arc::new(Jitter::seeded(11)),
    )
}

async fn serve(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_of_sitemap_index() {
    let server = MockServer::start().await;
    let base = server.uri();

    let blog = pages(&base, "blog", 3);
    let shop = pages(&base, "shop", 2);
    serve(
        &server,
        "/sitemap.xml",
        sitemap_index(&[format!("{}/blog.xml", base), format!("{}/shop.xml", base)]),
    )
    .await;
    serve(&server, "/blog.xml", urlset(&blog)).await;
    serve(&server, "/shop.xml", urlset(&shop)).await;

    let browser = RecordingBrowser::new();
    let coordinator = coordinator(&browser);

    let handle = coordinator
        .start(&format!("{}/sitemap.xml", base))
        .await
        .expect("Failed to start crawl");
    let summary = handle.wait().await.expect("Crawl task failed");

    assert_eq!(summary.succeeded, 5);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.batches, 5);

    // maxConcurrent = 1, so visits follow sitemap order exactly.
    let mut expected = blog;
    expected.extend(shop);
    assert_eq!(browser.navigations(), expected);

    let snapshot = coordinator.snapshot();
    assert!(!snapshot.is_running);
    assert_eq!(snapshot.total_urls, 5);
    assert_eq!(snapshot.visited_urls, expected);
    assert!(snapshot.error.is_none());

    assert_eq!(browser.launches(), 1);
    assert_eq!(browser.closes(), 1);
    assert_eq!(browser.open_contexts(), 0);
    assert!(browser.user_agents().iter().all(|ua| ua == "WalkerTest/1.0"));
}

#[tokio::test]
async fn test_crawl_isolates_failed_visit() {
    let server = MockServer::start().await;
    let base = server.uri();
    let all = pages(&base, "page", 4);
    serve(&server, "/sitemap.xml", urlset(&all)).await;

    let browser = RecordingBrowser::failing(&all[1..2]);
    let coordinator = coordinator(&browser);

    let summary = coordinator
        .start(&format!("{}/sitemap.xml", base))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 1);

    let snapshot = coordinator.snapshot();
    assert!(!snapshot.is_running);
    assert_eq!(snapshot.visited_count, 4);
    assert!(snapshot.error.is_none());
    assert!(snapshot.visited_urls[1].starts_with(&all[1]));
    assert!(snapshot.visited_urls[1].contains("ERR_CONNECTION_RESET"));
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_unreachable_sitemap_fails_before_visiting() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let browser = RecordingBrowser::new();
    let coordinator = coordinator(&browser);

    let err = coordinator
        .start(&format!("{}/sitemap.xml", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, CrawlError::Resolve(_)));

    let snapshot = coordinator.snapshot();
    assert!(!snapshot.is_running);
    assert_eq!(snapshot.visited_count, 0);
    assert!(snapshot.error.unwrap().contains("503"));
    assert_eq!(browser.launches(), 0);
}

#[tokio::test]
async fn test_snapshot_json_shape() {
    let server = MockServer::start().await;
    let base = server.uri();
    serve(&server, "/sitemap.xml", urlset(&pages(&base, "p", 1))).await;

    let browser = RecordingBrowser::new();
    let coordinator = coordinator(&browser);
    coordinator
        .start(&format!("{}/sitemap.xml", base))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    let json = serde_json::to_value(coordinator.snapshot()).unwrap();
    assert_eq!(json["isRunning"], false);
    assert_eq!(json["totalUrls"], 1);
    assert_eq!(json["visitedCount"], 1);
    assert_eq!(json["options"]["userAgent"], "WalkerTest/1.0");
    assert_eq!(json["options"]["delayMin"], 5);
    assert!(json["startedAt"].is_string());
    assert!(json["finishedAt"].is_string());
}
