//! Integration tests for the resolver module.
//!
//! Tests the bundled resolver and the registry through the public API.

use std::sync::Arc;

use omegadl_core::{
    ChapterRef, OmegaScansResolver, ResolveError, Resolver, ResolverRegistry, RetryPolicy,
    build_default_resolver_registry,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::{socket_skip_return, start_mock_server_or_skip};
use support::{chapter_page_html, series_page_html};

#[test]
fn test_default_registry_routes_omegascans_urls() {
    let registry = build_default_resolver_registry(30, 40).unwrap();
    assert_eq!(registry.resolver_count(), 1);

    let resolver = registry
        .find("https://omegascans.org/series/solo-leveling")
        .unwrap();
    assert_eq!(resolver.name(), "omegascans");
}

#[test]
fn test_default_registry_rejects_unknown_host() {
    let registry = build_default_resolver_registry(30, 40).unwrap();
    let err = registry
        .find("https://unknown.example.com/series/x")
        .err()
        .unwrap();
    assert!(matches!(err, ResolveError::NoResolver { .. }));
    assert!(
        err.to_string().contains("no resolver"),
        "Expected 'no resolver' error, got: {err}"
    );
}

#[tokio::test]
async fn test_list_chapters_from_series_page() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    Mock::given(method("GET"))
        .and(path("/series/solo"))
        .respond_with(ResponseTemplate::new(200).set_body_string(series_page_html(4)))
        .mount(&mock_server)
        .await;

    let resolver = OmegaScansResolver::with_host(&mock_server.uri()).unwrap();
    let chapters = resolver
        .list_chapters(&format!("{}/series/solo/", mock_server.uri()))
        .await
        .unwrap();

    let numbers: Vec<&str> = chapters.iter().map(|c| c.number.as_str()).collect();
    assert_eq!(numbers, ["1", "2", "3", "4"]);
    assert_eq!(
        chapters[3].source_url,
        format!("{}/series/solo/chapter-4", mock_server.uri())
    );
}

#[tokio::test]
async fn test_resolve_chapter_images_in_document_order() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    let urls: Vec<String> = ["b.jpg", "a.jpg", "c.webp"]
        .iter()
        .map(|name| format!("https://media.example.com/solo/1/{name}"))
        .collect();
    Mock::given(method("GET"))
        .and(path("/series/solo/chapter-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(chapter_page_html(&urls)))
        .mount(&mock_server)
        .await;

    let resolver = OmegaScansResolver::with_host(&mock_server.uri()).unwrap();
    let chapter = ChapterRef::new("1", format!("{}/series/solo/chapter-1", mock_server.uri()));
    let resolved = resolver.resolve(&chapter).await.unwrap();

    assert_eq!(resolved, urls);
}

#[tokio::test]
async fn test_resolve_retries_transient_chapter_page_failure() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    let urls = vec!["https://media.example.com/solo/5/01.jpg".to_string()];
    Mock::given(method("GET"))
        .and(path("/series/solo/chapter-5"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/series/solo/chapter-5"))
        .respond_with(ResponseTemplate::new(200).set_body_string(chapter_page_html(&urls)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolver = OmegaScansResolver::with_host(&mock_server.uri())
        .unwrap()
        .with_retry_policy(RetryPolicy::immediate(2));
    let chapter = ChapterRef::new("5", format!("{}/series/solo/chapter-5", mock_server.uri()));

    assert_eq!(resolver.resolve(&chapter).await.unwrap(), urls);
}

#[tokio::test]
async fn test_resolve_gives_up_after_retries_exhausted() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    Mock::given(method("GET"))
        .and(path("/series/solo"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&mock_server)
        .await;

    let resolver = OmegaScansResolver::with_host(&mock_server.uri())
        .unwrap()
        .with_retry_policy(RetryPolicy::immediate(1));
    let err = resolver
        .list_chapters(&format!("{}/series/solo", mock_server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::Http { status: 502, .. }));
}

#[tokio::test]
async fn test_resolve_missing_chapter_is_http_error() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    Mock::given(method("GET"))
        .and(path("/series/solo/chapter-9"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolver = OmegaScansResolver::with_host(&mock_server.uri()).unwrap();
    let chapter = ChapterRef::new("9", format!("{}/series/solo/chapter-9", mock_server.uri()));
    let err = resolver.resolve(&chapter).await.unwrap_err();

    assert!(matches!(err, ResolveError::Http { status: 404, .. }));
}

#[tokio::test]
async fn test_resolve_page_without_content_is_unparsable() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    Mock::given(method("GET"))
        .and(path("/series/solo/chapter-2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&mock_server)
        .await;

    let mut registry = ResolverRegistry::new();
    registry.register(Arc::new(
        OmegaScansResolver::with_host(&mock_server.uri()).unwrap(),
    ));
    let chapter_url = format!("{}/series/solo/chapter-2", mock_server.uri());
    let resolver = registry.find(&chapter_url).unwrap();
    let err = resolver
        .resolve(&ChapterRef::new("2", chapter_url))
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::Unparsable { .. }));
}
