//! End-to-end search scenarios over in-memory engine doubles.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

use marple::classify::DEFAULT_THRESHOLD;
use marple::dedup::Deduplicator;
use marple::dispatcher::AdapterOutcome;
use marple::errors::{AdapterErrorKind, MarpleError};
use marple::search::{DispatchConfig, EngineAdapter, MarpleConfig, ResultRecord, SearchQuery};
use marple::session::SearchSession;
use marple::testing::{hit, FailingAdapter, RecordingAdapter, SlowAdapter, StaticAdapter};

fn config() -> MarpleConfig {
    MarpleConfig {
        dispatch: DispatchConfig::new()
            .with_adapter_timeout(Duration::from_secs(2))
            .with_global_timeout(Duration::from_secs(5))
            .with_cancel_grace(Duration::from_millis(20)),
        ..MarpleConfig::default()
    }
}

fn session(adapters: Vec<Arc<dyn EngineAdapter>>) -> SearchSession {
    assert_ok!(SearchSession::new(adapters, &config(), DEFAULT_THRESHOLD))
}

#[tokio::test]
async fn duplicate_url_from_two_engines_is_merged() {
    let session = session(vec![
        Arc::new(StaticAdapter::new("bing", vec![hit("https://example.com/alice", "Alice")])),
        Arc::new(StaticAdapter::new(
            "duckduckgo",
            vec![hit("https://example.com/alice", "alice's page")],
        )),
    ]);

    let outcome = assert_ok!(session.run("alice", SearchQuery::new("alice")).await);
    let unique = outcome.dispatch.result.unique_links();

    assert_eq!(unique.len(), 1);
    let mut sources = unique[0].sources.clone();
    sources.sort();
    assert_eq!(sources, vec!["bing".to_string(), "duckduckgo".to_string()]);
    assert_eq!(unique[0].source, unique[0].sources[0]);
    assert_eq!(outcome.report.status.total_collected_count, 2);
    assert_eq!(outcome.report.status.unique_count, 1);
}

#[tokio::test]
async fn junk_pdf_is_listed_only_as_pdf() {
    let session = session(vec![Arc::new(StaticAdapter::new(
        "bing",
        vec![
            hit("https://www.pinterest.com/alice/resume.pdf", ""),
            hit("https://github.com/alice", "alice · GitHub"),
        ],
    ))]);

    let outcome = assert_ok!(session.run("alice", SearchQuery::new("alice")).await);
    let report = outcome.report;

    assert_eq!(report.pdf_results.len(), 1);
    let pdf = &report.pdf_results[0];
    assert_eq!(pdf.url, "https://www.pinterest.com/alice/resume.pdf");
    assert!(pdf.junk_score > DEFAULT_THRESHOLD);
    assert!(report.results.iter().all(|r| r.url != pdf.url));
    assert_eq!(report.status.displayed_count, 1);
}

#[tokio::test]
async fn every_engine_timing_out_fails_the_run() {
    let session = session(vec![
        Arc::new(FailingAdapter::timeout("bing")),
        Arc::new(FailingAdapter::timeout("duckduckgo")),
    ]);

    let err = assert_err!(session.run("alice", SearchQuery::new("alice")).await);
    match err {
        MarpleError::AllAdaptersFailed { failures } => {
            assert_eq!(failures.len(), 2);
            assert!(failures.iter().all(|f| f.kind == AdapterErrorKind::Timeout));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn url_filter_off_penalizes_but_keeps() {
    let record = hit("https://example.com/profile/42", "Alice Smith").with_snippet("alice writes about rust");
    let session = session(vec![Arc::new(StaticAdapter::new("bing", vec![record]))]);

    let query = SearchQuery::new("alice").with_url_filter(false);
    let outcome = assert_ok!(session.run("alice", query).await);

    let scored = &outcome.dispatch.result.unique_links()[0];
    assert!(scored.junk_score > 0);
    assert!(scored.junk_score <= DEFAULT_THRESHOLD);
    assert_eq!(outcome.report.results.len(), 1);
    assert_eq!(outcome.report.results[0].url, "https://example.com/profile/42");
}

#[tokio::test]
async fn url_filter_on_excludes_missing_token() {
    let record = hit("https://example.com/profile/42", "Alice Smith").with_snippet("alice writes about rust");
    let session = session(vec![Arc::new(StaticAdapter::new("bing", vec![record]))]);

    let outcome = assert_ok!(session.run("alice", SearchQuery::new("alice")).await);
    assert!(outcome.report.results.is_empty());
    assert_eq!(outcome.report.status.unique_count, 1);
}

#[tokio::test]
async fn deadline_keeps_partial_records() {
    let mut config = config();
    config.dispatch = config
        .dispatch
        .with_global_timeout(Duration::from_millis(100))
        .with_adapter_timeout(Duration::from_secs(30));
    let adapters: Vec<Arc<dyn EngineAdapter>> = vec![Arc::new(
        SlowAdapter::with_delay_ms(
            "bing",
            vec![hit("https://one.example/alice", "alice"), hit("https://two.example/alice", "alice")],
            10_000,
        )
        .stalling(),
    )];
    let session = assert_ok!(SearchSession::new(adapters, &config, DEFAULT_THRESHOLD));

    let outcome = assert_ok!(session.run("alice", SearchQuery::new("alice")).await);

    assert!(outcome.dispatch.deadline_hit);
    assert_eq!(outcome.dispatch.diagnostics[0].outcome, AdapterOutcome::Cancelled);
    let urls: Vec<&str> = outcome
        .dispatch
        .result
        .all_links()
        .iter()
        .map(|r| r.url.as_str())
        .collect();
    assert_eq!(urls, vec!["https://one.example/alice"]);
}

#[tokio::test]
async fn one_failing_engine_does_not_sink_the_run() {
    let session = session(vec![
        Arc::new(FailingAdapter::new("bing", AdapterErrorKind::RateLimited, "HTTP 429")),
        Arc::new(StaticAdapter::new("duckduckgo", vec![hit("https://github.com/alice", "alice")])),
    ]);

    let outcome = assert_ok!(session.run("alice", SearchQuery::new("alice")).await);
    assert_eq!(outcome.report.status.total_collected_count, 1);
    assert_eq!(outcome.dispatch.failures().len(), 1);
}

#[tokio::test]
async fn every_engine_sees_the_same_query() {
    let first = Arc::new(RecordingAdapter::new("bing"));
    let second = Arc::new(RecordingAdapter::new("duckduckgo"));
    let session = session(vec![first.clone(), second.clone()]);

    let query = SearchQuery::new("jsnow").with_name("Jon", "Snow").with_results_count(5);
    assert_ok!(session.run("Jon Snow", query.clone()).await);

    assert_eq!(first.queries(), vec![query.clone()]);
    assert_eq!(second.queries(), vec![query]);
}

#[tokio::test]
async fn unique_never_exceeds_collected() {
    let records: Vec<ResultRecord> = (0..30)
        .map(|i| hit(&format!("https://site{}.example/alice/", i % 7), "alice"))
        .collect();
    let session = session(vec![
        Arc::new(StaticAdapter::new("bing", records.clone())),
        Arc::new(StaticAdapter::new("duckduckgo", records)),
    ]);

    let outcome = assert_ok!(session.run("alice", SearchQuery::new("alice")).await);
    let status = outcome.report.status;
    assert!(status.unique_count <= status.total_collected_count);
    assert_eq!(status.unique_count, 7);
    assert_eq!(status.total_collected_count, 60);

    let unique = outcome.dispatch.result.unique_links();
    assert_eq!(Deduplicator::new().dedupe(unique).len(), unique.len());
}
