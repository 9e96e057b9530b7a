//! Sitemap resolution against a live HTTP server

use crate::support::{fast_config, pages, sitemap_index, urlset};
use sitemap_walker::jitter::Jitter;
use sitemap_walker::sitemap::{HttpFetcher, SitemapResolver};
use sitemap_walker::ResolveError;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn resolver() -> SitemapResolver {
    let config = fast_config();
    let fetcher = HttpFetcher::with_user_agent(&config.visit.user_agent, Duration::from_secs(5))
        .expect("Failed to build HTTP client");
    SitemapResolver::new(Arc::new(fetcher), Arc::new(Jitter::seeded(3)), config.sitemap)
}

async fn serve(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_resolve_flat_urlset() {
    let server = MockServer::start().await;
    let base = server.uri();
    let expected = pages(&base, "post", 4);
    serve(&server, "/sitemap.xml", urlset(&expected)).await;

    let urls = resolver()
        .resolve(&format!("{}/sitemap.xml", base))
        .await
        .unwrap();

    assert_eq!(urls, expected);
}

#[tokio::test]
async fn test_resolve_index_depth_first() {
    let server = MockServer::start().await;
    let base = server.uri();

    let posts = pages(&base, "post", 3);
    let docs = pages(&base, "doc", 2);
    serve(
        &server,
        "/sitemap.xml",
        sitemap_index(&[
            format!("{}/posts.xml", base),
            format!("{}/docs.xml", base),
        ]),
    )
    .await;
    serve(&server, "/posts.xml", urlset(&posts)).await;
    serve(&server, "/docs.xml", urlset(&docs)).await;

    let urls = resolver()
        .resolve(&format!("{}/sitemap.xml", base))
        .await
        .unwrap();

    let mut expected = posts;
    expected.extend(docs);
    assert_eq!(urls, expected);
}

#[tokio::test]
async fn test_relative_child_locations() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(
        &server,
        "/maps/index.xml",
        sitemap_index(&["child.xml".to_string()]),
    )
    .await;
    serve(
        &server,
        "/maps/child.xml",
        urlset(&["/about".to_string(), "contact".to_string()]),
    )
    .await;

    let urls = resolver()
        .resolve(&format!("{}/maps/index.xml", base))
        .await
        .unwrap();

    assert_eq!(
        urls,
        vec![format!("{}/about", base), format!("{}/maps/contact", base)]
    );
}

#[tokio::test]
async fn test_child_fetch_failure_is_fatal() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(
        &server,
        "/sitemap.xml",
        sitemap_index(&[
            format!("{}/ok.xml", base),
            format!("{}/missing.xml", base),
        ]),
    )
    .await;
    serve(&server, "/ok.xml", urlset(&pages(&base, "ok", 2))).await;
    Mock::given(method("GET"))
        .and(path("/missing.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = resolver()
        .resolve(&format!("{}/sitemap.xml", base))
        .await
        .unwrap_err();

    match err {
        ResolveError::Fetch { location, .. } => assert!(location.ends_with("/missing.xml")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_sitemap_document_rejected() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/sitemap.xml",
        "<html><body>Not found</body></html>".to_string(),
    )
    .await;

    let err = resolver()
        .resolve(&format!("{}/sitemap.xml", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::UnrecognizedShape { .. }));
}

#[tokio::test]
async fn test_requests_carry_visit_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .and(header("user-agent", "WalkerTest/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(urlset(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let urls = resolver()
        .resolve(&format!("{}/sitemap.xml", server.uri()))
        .await
        .unwrap();

    assert!(urls.is_empty());
}
