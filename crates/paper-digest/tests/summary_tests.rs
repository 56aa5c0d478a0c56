//! Streaming summary pipeline tests.
//!
//! The provider is mocked with wiremock for whole-body streams and with a
//! small TCP server when chunk timing matters.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use paper_digest::config::{Config, ProviderConfig};
use paper_digest::error::SummaryError;
use paper_digest::models::{SummaryRequest, SummaryResult};
use paper_digest::store::{JsonFileStore, KeyValueStore};
use paper_digest::summary::{SummaryEvent, SummaryPipeline};

mod common;

use common::{sse_frame, staged_server};

fn sse_body(fragments: &[&str]) -> String {
    let mut body: String = fragments.iter().map(|f| sse_frame(f)).collect();
    body.push_str("data: [DONE]\n\n");
    body
}

fn sse_response(fragments: &[&str]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(sse_body(fragments))
}

fn expected_summary() -> SummaryResult {
    SummaryResult {
        title: "Sparse Attention at Scale".to_string(),
        key_points: vec!["Linear memory".to_string(), "Same accuracy".to_string()],
        methodology: "Block-sparse kernels.".to_string(),
        findings: "2x faster on long inputs.".to_string(),
        implications: "Cheaper long-context models.".to_string(),
        overall_summary: "A faster \"sparse\" attention.".to_string(),
    }
}

/// The expected summary serialized and cut into uneven fragments.
fn summary_fragments() -> Vec<String> {
    let text = serde_json::to_string(&expected_summary()).unwrap();
    let bytes = text.as_bytes();
    bytes.chunks(17).map(|c| String::from_utf8(c.to_vec()).unwrap()).collect()
}

fn request() -> SummaryRequest {
    SummaryRequest::new("2501.00001", "Sparse Attention at Scale", "We make attention sparse.")
}

fn setup_pipeline(mock_server: &MockServer) -> SummaryPipeline {
    SummaryPipeline::new(&Config::for_testing(&mock_server.uri()), None).unwrap()
}

async fn collect(mut rx: mpsc::Receiver<SummaryEvent>) -> Vec<SummaryEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

async fn mount_stream(mock_server: &MockServer, expected_calls: u64) {
    let fragments = summary_fragments();
    let fragments: Vec<&str> = fragments.iter().map(String::as_str).collect();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "mock-model", "stream": true})))
        .respond_with(sse_response(&fragments))
        .expect(expected_calls)
        .mount(mock_server)
        .await;
}

// =============================================================================
// Streaming
// =============================================================================

#[tokio::test]
async fn test_stream_completes_and_caches() {
    let mock_server = MockServer::start().await;
    mount_stream(&mock_server, 1).await;

    let pipeline = setup_pipeline(&mock_server);
    let (tx, rx) = mpsc::channel(64);
    let result = pipeline.stream_summarize(&request(), tx).await.unwrap();
    let events = collect(rx).await;

    assert_eq!(result, expected_summary());
    assert_eq!(
        events.last(),
        Some(&SummaryEvent::Complete { result: expected_summary(), from_cache: false })
    );
    assert_eq!(pipeline.cache_stats().size, 1);
    assert_eq!(
        pipeline.get_cached("2501.00001", "mock", "mock-model"),
        Some(expected_summary())
    );
}

#[tokio::test]
async fn test_second_request_is_a_cache_hit() {
    let mock_server = MockServer::start().await;
    mount_stream(&mock_server, 1).await;

    let pipeline = setup_pipeline(&mock_server);
    let (tx, _rx) = mpsc::channel(64);
    pipeline.stream_summarize(&request(), tx).await.unwrap();

    let (tx, rx) = mpsc::channel(64);
    let again = pipeline.stream_summarize(&request(), tx).await.unwrap();
    let events = collect(rx).await;

    assert_eq!(again, expected_summary());
    assert_eq!(events, vec![SummaryEvent::Complete { result: expected_summary(), from_cache: true }]);
}

#[tokio::test]
async fn test_cache_is_keyed_by_provider_and_model() {
    let mock_server = MockServer::start().await;

    let fragments = summary_fragments();
    let fragments: Vec<&str> = fragments.iter().map(String::as_str).collect();
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(sse_response(&fragments))
        .expect(2)
        .mount(&mock_server)
        .await;

    let pipeline = setup_pipeline(&mock_server);
    let other_model = ProviderConfig { model: "other-model".to_string(), ..pipeline.provider().clone() };

    let (tx, _rx) = mpsc::channel(64);
    pipeline.stream_summarize(&request(), tx).await.unwrap();
    let (tx, _rx) = mpsc::channel(64);
    pipeline.stream_summarize_with(&other_model, &request(), tx).await.unwrap();

    assert_eq!(pipeline.cache_stats().size, 2);
    assert!(pipeline.get_cached("2501.00001", "mock", "mock-model").is_some());
    assert!(pipeline.get_cached("2501.00001", "mock", "other-model").is_some());
    assert!(pipeline.get_cached("2501.00001", "other", "mock-model").is_none());
    assert!(pipeline.get_cached("2501.00002", "mock", "mock-model").is_none());
}

#[tokio::test]
async fn test_dropped_receiver_still_completes() {
    let mock_server = MockServer::start().await;
    mount_stream(&mock_server, 1).await;

    let pipeline = setup_pipeline(&mock_server);
    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    let result = pipeline.stream_summarize(&request(), tx).await.unwrap();
    assert_eq!(result, expected_summary());
    assert_eq!(pipeline.cache_stats().size, 1);
}

#[tokio::test]
async fn test_language_is_sent_in_prompt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(sse_response(&[r#"{"title": "Titel"}"#]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = Config::for_testing(&mock_server.uri());
    config.language = Some("German".to_string());
    let pipeline = SummaryPipeline::new(&config, None).unwrap();

    let (tx, _rx) = mpsc::channel(64);
    pipeline.stream_summarize(&request(), tx).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["messages"][0]["role"], "system");
    assert!(body["messages"][0]["content"].as_str().unwrap().contains("German"));
    assert!(body["messages"][1]["content"].as_str().unwrap().contains("We make attention sparse."));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_missing_credential_sends_nothing() {
    let mock_server = MockServer::start().await;
    mount_stream(&mock_server, 0).await;

    let mut config = Config::for_testing(&mock_server.uri());
    config.provider.api_key = None;
    let pipeline = SummaryPipeline::new(&config, None).unwrap();

    let (tx, rx) = mpsc::channel(64);
    let err = pipeline.stream_summarize(&request(), tx).await.unwrap_err();
    assert!(matches!(err, SummaryError::MissingCredential { ref provider } if provider == "mock"));
    assert!(collect(rx).await.is_empty());
}

#[tokio::test]
async fn test_provider_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "Invalid API key"}})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let pipeline = setup_pipeline(&mock_server);
    let (tx, _rx) = mpsc::channel(64);
    let err = pipeline.stream_summarize(&request(), tx).await.unwrap_err();

    match err {
        SummaryError::Provider { status, message } => {
            assert_eq!(status, 401);
            assert!(message.contains("Invalid API key"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(pipeline.cache_stats().size, 0);
}

#[tokio::test]
async fn test_unparseable_stream_is_not_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(sse_response(&["I'm sorry, ", "I can't summarize that."]))
        .mount(&mock_server)
        .await;

    let pipeline = setup_pipeline(&mock_server);
    let (tx, _rx) = mpsc::channel(64);
    let err = pipeline.stream_summarize(&request(), tx).await.unwrap_err();

    assert!(matches!(err, SummaryError::ParseIncomplete));
    assert_eq!(pipeline.cache_stats().size, 0);
}

#[tokio::test]
async fn test_unreachable_provider_is_transport_error() {
    let config = Config::for_testing("http://127.0.0.1:1");
    let pipeline = SummaryPipeline::new(&config, None).unwrap();

    let (tx, _rx) = mpsc::channel(64);
    let err = pipeline.stream_summarize(&request(), tx).await.unwrap_err();
    assert_eq!(err.kind(), "transport");
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_summary_cache_survives_restart() {
    let mock_server = MockServer::start().await;
    mount_stream(&mock_server, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let config = Config::for_testing(&mock_server.uri());

    {
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(dir.path()).unwrap());
        let pipeline = SummaryPipeline::new(&config, Some(store)).unwrap();
        let (tx, _rx) = mpsc::channel(64);
        pipeline.stream_summarize(&request(), tx).await.unwrap();
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    let restarted = SummaryPipeline::new(&config, Some(store)).unwrap();
    assert_eq!(restarted.get_cached("2501.00001", "mock", "mock-model"), Some(expected_summary()));

    // Served from the restored cache: the mock expects exactly one call.
    let (tx, _rx) = mpsc::channel(64);
    restarted.stream_summarize(&request(), tx).await.unwrap();

    restarted.clear_cache();
    let store = JsonFileStore::open(dir.path()).unwrap();
    assert_eq!(store.load("summary-cache").unwrap(), None);
}

// =============================================================================
// Chunk timing
// =============================================================================

fn staged_pipeline(base_url: &str) -> SummaryPipeline {
    let mut config = Config::for_testing("http://unused.invalid");
    config.provider.base_url = format!("{base_url}/v1");
    SummaryPipeline::new(&config, None).unwrap()
}

#[tokio::test]
async fn test_partial_update_between_fragments() {
    let base_url = staged_server(
        vec![
            (Duration::ZERO, sse_frame(r#"{"title":"A","keyPoi"#)),
            (
                Duration::from_millis(300),
                format!("{}data: [DONE]\n\n", sse_frame(r#"nts":["x","y"]}"#)),
            ),
        ],
        None,
    )
    .await;

    let pipeline = staged_pipeline(&base_url);
    let (tx, rx) = mpsc::channel(64);
    let result = pipeline.stream_summarize(&request(), tx).await.unwrap();
    let events = collect(rx).await;

    let first_partial = SummaryResult { title: "A".to_string(), ..Default::default() };
    assert_eq!(events.first(), Some(&SummaryEvent::Update(first_partial)));

    let done = SummaryResult {
        title: "A".to_string(),
        key_points: vec!["x".to_string(), "y".to_string()],
        ..Default::default()
    };
    assert_eq!(result, done);
    assert_eq!(events.last(), Some(&SummaryEvent::Complete { result: done, from_cache: false }));

    for event in &events {
        if let SummaryEvent::Update(partial) = event {
            assert_eq!(partial.title, "A");
        }
    }
}

#[tokio::test]
async fn test_updates_are_coalesced() {
    // Every fragment arrives in one burst; parses follow the update clock.
    let fragments = summary_fragments();
    let burst: String = fragments.iter().map(|f| sse_frame(f)).collect();
    let base_url = staged_server(
        vec![(Duration::ZERO, burst), (Duration::from_millis(100), "data: [DONE]\n\n".to_string())],
        None,
    )
    .await;

    let pipeline = staged_pipeline(&base_url);
    let (tx, rx) = mpsc::channel(64);
    pipeline.stream_summarize(&request(), tx).await.unwrap();
    let events = collect(rx).await;

    let updates = events.iter().filter(|e| matches!(e, SummaryEvent::Update(_))).count();
    assert!(updates >= 1);
    assert!(updates < fragments.len(), "{updates} updates for {} fragments", fragments.len());
}

#[tokio::test]
async fn test_connection_lost_mid_stream() {
    let base_url = staged_server(
        vec![(Duration::ZERO, sse_frame(r#"{"title":"Cut"#))],
        Some(10_000),
    )
    .await;

    let pipeline = staged_pipeline(&base_url);
    let (tx, _rx) = mpsc::channel(64);
    let err = pipeline.stream_summarize(&request(), tx).await.unwrap_err();

    assert!(matches!(err, SummaryError::Transport(_)), "{err:?}");
    assert_eq!(pipeline.cache_stats().size, 0);
}
