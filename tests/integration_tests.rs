//! Integration tests for the unified search orchestrator.
//!
//! Every provider is replaced by a `MockSource`, so these tests exercise the
//! fan-out, isolation, caching and reporting paths without network access.

use std::sync::Arc;
use std::time::Duration;

use unified_search::config::RateLimitConfig;
use unified_search::models::{SearchFilters, SearchRequest, SourceKind};
use unified_search::monitoring::HealthStatus;
use unified_search::sources::mock::make_result;
use unified_search::sources::{MockSource, SourceError};
use unified_search::utils::validate::ValidationError;
use unified_search::{UnifiedSearch, UnifiedSearchError};

fn results(kind: SourceKind, titles: &[&str]) -> Vec<unified_search::SearchResult> {
    titles.iter().map(|t| make_result(kind, t)).collect()
}

fn mock(kind: SourceKind, titles: &[&str]) -> Arc<MockSource> {
    Arc::new(MockSource::new(kind).with_results(results(kind, titles)))
}

#[tokio::test]
async fn test_machine_learning_academic_scenario() {
    let academic = mock(
        SourceKind::Academic,
        &["Deep Learning", "Pattern Recognition", "Statistical Learning"],
    );
    let search = UnifiedSearch::builder().source(academic).build();

    let request = SearchRequest::new("machine learning")
        .sources([SourceKind::Academic])
        .num_results(3);
    let response = search.search(request).await.unwrap();

    assert_eq!(response.results_for(SourceKind::Academic).map(<[_]>::len), Some(3));
    assert_eq!(response.total_results(), 3);
    assert!(response.errors().is_empty());
    assert_eq!(response.metadata().successful_sources, vec![SourceKind::Academic]);
    assert!(!response.metadata().cache_hit);
}

#[tokio::test]
async fn test_all_sources_succeed() {
    let search = UnifiedSearch::builder()
        .source(mock(SourceKind::Academic, &["Paper A", "Paper B"]))
        .source(mock(SourceKind::Web, &["Page A"]))
        .source(mock(SourceKind::Video, &["Video A", "Video B", "Video C"]))
        .build();

    let response = search.search(SearchRequest::new("rust")).await.unwrap();

    assert_eq!(response.results().len(), 3);
    assert!(response.errors().is_empty());
    assert_eq!(response.total_results(), 6);
    assert_eq!(response.metadata().requested_sources, SourceKind::ALL.to_vec());
    assert_eq!(response.metadata().source_times_ms.len(), 3);
    assert!(response.is_complete());
}

#[tokio::test]
async fn test_provider_order_is_preserved() {
    let search = UnifiedSearch::builder()
        .source(mock(SourceKind::Web, &["first", "second", "third"]))
        .build();

    let response = search.search(SearchRequest::new("order")).await.unwrap();
    let titles: Vec<&str> = response
        .results_for(SourceKind::Web)
        .unwrap_or_default()
        .iter()
        .map(|r| r.title())
        .collect();
    assert_eq!(titles, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_one_failure_is_isolated() {
    let failing = Arc::new(MockSource::new(SourceKind::Web).with_error(SourceError::ExternalService {
        service: "Google Web Search".to_string(),
        message: "Server error 503".to_string(),
        status_code: Some(503),
    }));
    let search = UnifiedSearch::builder()
        .source(mock(SourceKind::Academic, &["Paper"]))
        .source(failing)
        .source(mock(SourceKind::Video, &["Video"]))
        .build();

    let response = search.search(SearchRequest::new("rust")).await.unwrap();

    assert_eq!(response.total_results(), 2);
    assert!(response.results_for(SourceKind::Web).is_none());
    assert!(response.errors()[&SourceKind::Web].contains("503"));
    assert_eq!(
        response.metadata().successful_sources,
        vec![SourceKind::Academic, SourceKind::Video]
    );
    assert!(response.metadata().unavailable_sources.is_empty());
}

#[tokio::test]
async fn test_panicking_source_is_isolated() {
    let search = UnifiedSearch::builder()
        .source(Arc::new(MockSource::new(SourceKind::Academic).panicking()))
        .source(mock(SourceKind::Web, &["Page"]))
        .build();

    let response = search.search(SearchRequest::new("rust")).await.unwrap();

    assert_eq!(response.total_results(), 1);
    let error = &response.errors()[&SourceKind::Academic];
    assert!(error.contains("panicked"), "{}", error);
    assert!(error.contains("mock source panicked"), "{}", error);
}

#[tokio::test]
async fn test_slow_source_times_out() {
    let slow = Arc::new(
        MockSource::new(SourceKind::Video)
            .with_results(results(SourceKind::Video, &["late"]))
            .with_delay(Duration::from_secs(5)),
    );
    let search = UnifiedSearch::builder()
        .source(slow)
        .source(mock(SourceKind::Web, &["Page"]))
        .source_timeout(Duration::from_millis(100))
        .build();

    let response = search.search(SearchRequest::new("rust")).await.unwrap();

    assert_eq!(response.total_results(), 1);
    assert!(response.errors()[&SourceKind::Video].contains("timed out"));
    assert!(response.search_time() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_requested_source_without_adapter_is_unavailable() {
    let search = UnifiedSearch::builder()
        .source(mock(SourceKind::Academic, &["Paper"]))
        .build();

    let request = SearchRequest::new("rust").sources([SourceKind::Web]);
    let response = search.search(request).await.unwrap();

    assert!(response.results().is_empty());
    assert_eq!(response.total_results(), 0);
    assert!(response.errors()[&SourceKind::Web].contains("not configured"));
    assert_eq!(response.metadata().unavailable_sources, vec![SourceKind::Web]);
    assert!(response.metadata().successful_sources.is_empty());
}

#[tokio::test]
async fn test_no_adapters_is_a_hard_failure() {
    let search = UnifiedSearch::builder().build();
    let err = search.search(SearchRequest::new("rust")).await.unwrap_err();
    assert_eq!(err, UnifiedSearchError::NoAdapters);
}

#[tokio::test]
async fn test_invalid_requests_are_rejected_before_any_call() {
    let web = mock(SourceKind::Web, &["Page"]);
    let search = UnifiedSearch::builder().source(web.clone()).build();

    let err = search.search(SearchRequest::new("   ")).await.unwrap_err();
    assert_eq!(err, UnifiedSearchError::Validation(ValidationError::EmptyQuery));

    let err = search
        .search(SearchRequest::new("rust").num_results(0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        UnifiedSearchError::Validation(ValidationError::NumResultsOutOfRange { got: 0, .. })
    ));

    let err = search
        .search(SearchRequest::new("rust").years(Some(2020), Some(2010)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        UnifiedSearchError::Validation(ValidationError::InvertedYearRange { .. })
    ));

    assert_eq!(web.calls(), 0);
}

#[tokio::test]
async fn test_complete_response_is_served_from_cache() {
    let web = mock(SourceKind::Web, &["Page"]);
    let search = UnifiedSearch::builder().source(web.clone()).build();

    let first = search.search(SearchRequest::new("rust")).await.unwrap();
    // Same request after normalisation
    let second = search.search(SearchRequest::new("  rust ")).await.unwrap();

    assert_eq!(web.calls(), 1);
    assert!(!first.metadata().cache_hit);
    assert!(second.metadata().cache_hit);
    assert_eq!(first.results(), second.results());
}

#[tokio::test]
async fn test_incomplete_response_is_not_cached() {
    let web = mock(SourceKind::Web, &["Page"]);
    let video = Arc::new(
        MockSource::new(SourceKind::Video).with_error(SourceError::Network("reset".to_string())),
    );
    let search = UnifiedSearch::builder()
        .source(web.clone())
        .source(video.clone())
        .build();

    search.search(SearchRequest::new("rust")).await.unwrap();
    let second = search.search(SearchRequest::new("rust")).await.unwrap();

    assert_eq!(web.calls(), 2);
    assert_eq!(video.calls(), 2);
    assert!(!second.metadata().cache_hit);
}

#[tokio::test]
async fn test_rate_gate_denies_source_over_budget() {
    let web = mock(SourceKind::Web, &["Page"]);
    let search = UnifiedSearch::builder()
        .source(web.clone())
        .rate_limits(RateLimitConfig {
            enabled: true,
            max_requests: 1,
            window_secs: 3600,
        })
        .build();

    let first = search.search(SearchRequest::new("first")).await.unwrap();
    assert_eq!(first.total_results(), 1);

    let second = search.search(SearchRequest::new("second")).await.unwrap();
    assert_eq!(web.calls(), 1);
    assert!(second.errors()[&SourceKind::Web].contains("rate limit"));
    assert!(second.metadata().unavailable_sources.is_empty());

    let usage = search.rate_gate().usage("search:web", Duration::from_secs(3600));
    assert_eq!(usage, 1);
}

#[tokio::test]
async fn test_disabled_rate_gate_admits_everything() {
    let web = mock(SourceKind::Web, &["Page"]);
    let search = UnifiedSearch::builder()
        .source(web.clone())
        .rate_limits(RateLimitConfig {
            enabled: false,
            max_requests: 1,
            window_secs: 3600,
        })
        .build();

    for query in ["one", "two", "three"] {
        let response = search.search(SearchRequest::new(query)).await.unwrap();
        assert!(response.errors().is_empty());
    }
    assert_eq!(web.calls(), 3);
}

#[tokio::test]
async fn test_cancellation_keeps_finished_sources() {
    let slow = Arc::new(
        MockSource::new(SourceKind::Video)
            .with_results(results(SourceKind::Video, &["late"]))
            .with_delay(Duration::from_secs(10)),
    );
    let search = UnifiedSearch::builder()
        .source(mock(SourceKind::Web, &["Page"]))
        .source(slow)
        .build();

    let response = search
        .search_with_cancel(
            SearchRequest::new("rust"),
            tokio::time::sleep(Duration::from_millis(200)),
        )
        .await
        .unwrap();

    assert_eq!(response.total_results(), 1);
    assert!(response.errors()[&SourceKind::Video].contains("cancelled"));
    assert!(response.search_time() < Duration::from_secs(10));
    assert_eq!(search.cache().get_stats().await.sets, 0);
}

#[tokio::test]
async fn test_search_source_single_provider() {
    let web = mock(SourceKind::Web, &["a", "b", "c", "d", "e"]);
    let search = UnifiedSearch::builder().source(web).build();
    let filters = SearchFilters::default();

    let found = search
        .search_source(SourceKind::Web, "rust", 3, &filters)
        .await
        .unwrap();
    assert_eq!(found.len(), 3);

    let missing = search
        .search_source(SourceKind::Video, "rust", 3, &filters)
        .await
        .unwrap_err();
    assert!(matches!(missing, SourceError::NotConfigured(_)));

    let invalid = search
        .search_source(SourceKind::Web, "", 3, &filters)
        .await
        .unwrap_err();
    assert!(matches!(invalid, SourceError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_author_info() {
    let search = UnifiedSearch::builder()
        .source(mock(SourceKind::Academic, &[]))
        .build();

    let profile = search.author_info("  Geoffrey Hinton ").await.unwrap();
    assert_eq!(profile.name, "Geoffrey Hinton");

    let err = search.author_info(" ").await.unwrap_err();
    assert!(matches!(err, SourceError::InvalidRequest(_)));

    let without_academic = UnifiedSearch::builder()
        .source(mock(SourceKind::Web, &[]))
        .build();
    let err = without_academic.author_info("Hinton").await.unwrap_err();
    assert!(matches!(err, SourceError::NotConfigured(_)));
}

#[tokio::test]
async fn test_clear_cache_by_source_prefix() {
    let search = UnifiedSearch::builder()
        .source(mock(SourceKind::Web, &[]))
        .build();
    let cache = search.cache();
    let ttl = Duration::from_secs(60);
    cache.set("web:aaaa", b"1".to_vec(), ttl).await;
    cache.set("web:bbbb", b"2".to_vec(), ttl).await;
    cache.set("video:cccc", b"3".to_vec(), ttl).await;
    cache.set("unified:dddd", b"4".to_vec(), ttl).await;

    let removed = search.clear_cache(Some(SourceKind::Web)).await;

    assert_eq!(removed, 3);
    assert!(!cache.exists("web:aaaa").await);
    assert!(!cache.exists("unified:dddd").await);
    assert_eq!(cache.get("video:cccc").await, Some(b"3".to_vec()));

    assert_eq!(search.clear_cache(None).await, 1);
    assert!(!cache.exists("video:cccc").await);
}

#[tokio::test]
async fn test_usage_stats_reflect_searches() {
    let search = UnifiedSearch::builder()
        .source(mock(SourceKind::Web, &["Page"]))
        .source(Arc::new(
            MockSource::new(SourceKind::Video).with_error(SourceError::Network("reset".to_string())),
        ))
        .build();

    search.search(SearchRequest::new("rust")).await.unwrap();
    let stats = search.get_api_usage_stats().await;

    assert_eq!(
        stats
            .metrics
            .counter("search_requests_total{source=web,status=success}"),
        1
    );
    assert_eq!(
        stats
            .metrics
            .counter("search_requests_total{source=video,status=error}"),
        1
    );
    assert_eq!(
        stats.metrics.counter("errors_total{type=network_error,source=video}"),
        1
    );
    assert_eq!(stats.metrics.counter("cache_misses_total{source=unified}"), 1);
    assert!(stats.cache.enabled);
    assert_eq!(stats.usage.providers.len(), 3);
}

#[tokio::test]
async fn test_service_status() {
    let search = UnifiedSearch::builder()
        .source(mock(SourceKind::Academic, &[]))
        .source(Arc::new(
            MockSource::new(SourceKind::Web).with_error(SourceError::Network("down".to_string())),
        ))
        .build();

    let passive = search.get_service_status(false).await;
    assert_eq!(passive.sources.len(), 3);
    let web = passive.sources.iter().find(|s| s.source == SourceKind::Web).unwrap();
    assert_eq!(web.status, HealthStatus::Healthy);
    let video = passive.sources.iter().find(|s| s.source == SourceKind::Video).unwrap();
    assert!(!video.configured);
    assert_eq!(video.status, HealthStatus::Unhealthy);
    assert_eq!(passive.status, HealthStatus::Degraded);
    assert_eq!(passive.cache.status, HealthStatus::Healthy);

    let probed = search.get_service_status(true).await;
    let web = probed.sources.iter().find(|s| s.source == SourceKind::Web).unwrap();
    assert_eq!(web.status, HealthStatus::Degraded);
    assert!(web.probe_error.as_deref().unwrap_or_default().contains("down"));
    let academic = probed
        .sources
        .iter()
        .find(|s| s.source == SourceKind::Academic)
        .unwrap();
    assert_eq!(academic.status, HealthStatus::Healthy);
}

#[tokio::test]
async fn test_service_without_sources_is_unhealthy() {
    let status = UnifiedSearch::builder().build().get_service_status(false).await;
    assert_eq!(status.status, HealthStatus::Unhealthy);
    assert!(status.sources.iter().all(|s| !s.configured));
}
