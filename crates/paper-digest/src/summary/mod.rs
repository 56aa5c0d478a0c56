//! Streaming summary pipeline.
//!
//! A summary request first consults the summary cache. On a miss the paper is
//! sent to an OpenAI-compatible chat endpoint with `stream: true`; content
//! fragments accumulate in a buffer that is re-parsed at most once per update
//! interval, and each parse is published as a [`SummaryEvent::Update`]. When
//! the stream ends, one final parse produces the cached result.

pub mod prompt;
pub mod reconstruct;
pub mod sse;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::cache::{CacheEntry, CacheStats, TtlCache};
use crate::config::{Config, ProviderConfig, api};
use crate::error::{PipelineResult, SummaryError};
use crate::models::{SummaryRequest, SummaryResult};
use crate::store::KeyValueStore;

pub use reconstruct::reconstruct;
pub use sse::SseDecoder;

/// Store key holding the summary cache snapshot.
pub const SUMMARY_CACHE_KEY: &str = "summary-cache";

/// Progress published while a summary is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryEvent {
    /// Best partial summary reconstructed so far.
    Update(SummaryResult),

    /// Final summary.
    Complete {
        /// The summary.
        result: SummaryResult,
        /// True when served without contacting the provider.
        from_cache: bool,
    },
}

/// Streaming summary controller with its own summary cache.
pub struct SummaryPipeline {
    http: Client,
    provider: ProviderConfig,
    language: Option<String>,
    update_interval: Duration,
    cache: TtlCache<SummaryResult>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl SummaryPipeline {
    /// Create a pipeline. When a store is given, the summary cache is hydrated
    /// from it and written back after every change.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config, store: Option<Arc<dyn KeyValueStore>>) -> anyhow::Result<Self> {
        // Only connecting is timed; a stream has no overall deadline.
        let http = Client::builder()
            .user_agent(concat!("paper-digest/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .build()?;

        let pipeline = Self {
            http,
            provider: config.provider.clone(),
            language: config.language.clone(),
            update_interval: config.update_interval,
            cache: TtlCache::new(config.summary_cache_ttl, config.summary_cache_capacity),
            store,
        };
        pipeline.hydrate();
        Ok(pipeline)
    }

    /// Cache key for one paper under one provider and model.
    #[must_use]
    pub fn cache_key(paper_id: &str, provider: &str, model: &str) -> String {
        format!("{paper_id}:{provider}:{model}")
    }

    /// Default provider.
    #[must_use]
    pub const fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    /// Cached summary, if one is live.
    #[must_use]
    pub fn get_cached(&self, paper_id: &str, provider: &str, model: &str) -> Option<SummaryResult> {
        self.cache.get(&Self::cache_key(paper_id, provider, model))
    }

    /// Summary cache size.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop all cached summaries and the persisted snapshot.
    pub fn clear_cache(&self) {
        self.cache.clear();

        let Some(store) = &self.store else { return };
        if let Err(e) = store.remove(SUMMARY_CACHE_KEY) {
            tracing::warn!(error = %e, "Failed to remove persisted summary cache");
        }
    }

    /// Summarize a paper with the default provider.
    ///
    /// # Errors
    ///
    /// See [`Self::stream_summarize_with`].
    pub async fn stream_summarize(
        &self,
        request: &SummaryRequest,
        events: mpsc::Sender<SummaryEvent>,
    ) -> PipelineResult<SummaryResult> {
        self.stream_summarize_with(&self.provider, request, events).await
    }

    /// Summarize a paper, publishing partial results on `events`.
    ///
    /// A dropped receiver does not stop the request; the result is still
    /// cached and returned.
    ///
    /// # Errors
    ///
    /// Returns a precondition error when the provider has no credential or
    /// cannot stream, `Provider` for a non-success status, `Transport` when
    /// the connection fails, and `ParseIncomplete` when the finished stream
    /// holds no recognizable field.
    pub async fn stream_summarize_with(
        &self,
        provider: &ProviderConfig,
        request: &SummaryRequest,
        events: mpsc::Sender<SummaryEvent>,
    ) -> PipelineResult<SummaryResult> {
        let key = Self::cache_key(&request.paper_id, &provider.id, &provider.model);

        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(key = %key, "Summary cache hit");
            let hit = SummaryEvent::Complete { result: cached.clone(), from_cache: true };
            let _ = events.send(hit).await;
            return Ok(cached);
        }

        let Some(api_key) = provider.api_key.as_deref() else {
            return Err(SummaryError::MissingCredential { provider: provider.id.clone() });
        };
        if !provider.supports_streaming {
            return Err(SummaryError::StreamingUnsupported { provider: provider.id.clone() });
        }

        let buffer = self.stream_text(provider, api_key, request, &events).await?;

        let Some(result) = reconstruct(&buffer) else {
            tracing::warn!(
                key = %key,
                buffered = buffer.len(),
                "Stream ended without a recognizable summary"
            );
            return Err(SummaryError::ParseIncomplete);
        };

        self.cache.set(key.clone(), result.clone());
        self.persist();
        tracing::info!(key = %key, key_points = result.key_points.len(), "Summary complete");

        let done = SummaryEvent::Complete { result: result.clone(), from_cache: false };
        let _ = events.send(done).await;
        Ok(result)
    }

    /// Run the chat stream, publishing coalesced partial parses, and return
    /// the full accumulated text.
    async fn stream_text(
        &self,
        provider: &ProviderConfig,
        api_key: &str,
        request: &SummaryRequest,
        events: &mpsc::Sender<SummaryEvent>,
    ) -> PipelineResult<String> {
        let url = format!("{}/chat/completions", provider.base_url.trim_end_matches('/'));
        let body = json!({
            "model": provider.model,
            "messages": prompt::build_messages(request, self.language.as_deref()),
            "stream": true,
            "temperature": 0.3,
        });

        tracing::debug!(
            provider = %provider.id,
            model = %provider.model,
            paper = %request.paper_id,
            "Starting summary stream"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .header(ACCEPT, "text/event-stream")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SummaryError::Provider { status: status.as_u16(), message });
        }

        let mut chunks = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut buffer = String::new();
        let mut pending = false;

        let mut ticker = tokio::time::interval(self.update_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                chunk = chunks.next() => match chunk {
                    Some(Ok(bytes)) => {
                        for fragment in decoder.push(&bytes) {
                            buffer.push_str(&fragment);
                            pending = true;
                        }
                        if decoder.is_done() {
                            break;
                        }
                    }
                    Some(Err(e)) => return Err(SummaryError::Transport(e.to_string())),
                    None => break,
                },
                _ = ticker.tick(), if pending => {
                    pending = false;
                    if let Some(partial) = reconstruct(&buffer) {
                        let _ = events.send(SummaryEvent::Update(partial)).await;
                    }
                }
            }
        }

        for fragment in decoder.finish() {
            buffer.push_str(&fragment);
        }
        Ok(buffer)
    }

    fn hydrate(&self) {
        let Some(store) = &self.store else { return };

        let raw = match store.load(SUMMARY_CACHE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load summary cache");
                return;
            }
        };

        match serde_json::from_str::<Vec<CacheEntry<SummaryResult>>>(&raw) {
            Ok(entries) => {
                self.cache.restore(entries);
                tracing::debug!(size = self.cache.stats().size, "Summary cache restored");
            }
            Err(e) => tracing::warn!(error = %e, "Discarding unreadable summary cache snapshot"),
        }
    }

    fn persist(&self) {
        let Some(store) = &self.store else { return };

        let outcome = serde_json::to_string(&self.cache.snapshot())
            .map_err(crate::error::StoreError::from)
            .and_then(|raw| store.save(SUMMARY_CACHE_KEY, &raw));
        if let Err(e) = outcome {
            tracing::warn!(error = %e, "Failed to persist summary cache");
        }
    }
}

impl std::fmt::Debug for SummaryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryPipeline")
            .field("provider", &self.provider)
            .field("update_interval", &self.update_interval)
            .field("cache", &self.cache.stats())
            .field("persistent", &self.store.is_some())
            .finish_non_exhaustive()
    }
}
