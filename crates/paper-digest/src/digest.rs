//! One handle over retrieval and summarization.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::cache::CacheStats;
use crate::client::ArxivClient;
use crate::config::Config;
use crate::error::{PipelineResult, RetrievalResult};
use crate::models::{PaperPage, PaperRecord, SearchRequest, SummaryRequest, SummaryResult};
use crate::store::{JsonFileStore, KeyValueStore};
use crate::summary::{SummaryEvent, SummaryPipeline};

/// Sizes of both caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestCacheStats {
    /// Retrieval response cache.
    pub responses: CacheStats,

    /// Summary cache.
    pub summaries: CacheStats,
}

/// Retrieval gateway plus summary pipeline. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PaperDigest {
    client: Arc<ArxivClient>,
    pipeline: Arc<SummaryPipeline>,
}

impl PaperDigest {
    /// Build from configuration. When `cache_dir` is set the summary cache is
    /// persisted there.
    ///
    /// # Errors
    ///
    /// Returns error if a client cannot be built or the cache directory
    /// cannot be created.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let store: Option<Arc<dyn KeyValueStore>> = match &config.cache_dir {
            Some(dir) => Some(Arc::new(JsonFileStore::open(dir)?)),
            None => None,
        };
        Self::with_store(config, store)
    }

    /// Build with an explicit persistence store.
    ///
    /// # Errors
    ///
    /// Returns error if a client cannot be built.
    pub fn with_store(
        config: &Config,
        store: Option<Arc<dyn KeyValueStore>>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: Arc::new(ArxivClient::new(config)?),
            pipeline: Arc::new(SummaryPipeline::new(config, store)?),
        })
    }

    /// Retrieval gateway.
    #[must_use]
    pub fn client(&self) -> &ArxivClient {
        &self.client
    }

    /// Summary pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &SummaryPipeline {
        &self.pipeline
    }

    /// Latest submissions page.
    ///
    /// # Errors
    ///
    /// Returns error on retrieval failure.
    pub async fn fetch_latest(&self, offset: usize, limit: usize) -> RetrievalResult<PaperPage> {
        self.client.fetch_latest(offset, limit).await
    }

    /// Keyword search.
    ///
    /// # Errors
    ///
    /// Returns error on retrieval failure.
    pub async fn search(&self, request: &SearchRequest) -> RetrievalResult<PaperPage> {
        self.client.search(request).await
    }

    /// Single paper by id.
    ///
    /// # Errors
    ///
    /// Returns error on retrieval failure.
    pub async fn get_paper(&self, id: &str) -> RetrievalResult<Option<PaperRecord>> {
        self.client.get_paper(id).await
    }

    /// Stream a summary with the configured provider.
    ///
    /// # Errors
    ///
    /// Returns error on pipeline failure.
    pub async fn stream_summarize(
        &self,
        request: &SummaryRequest,
        events: mpsc::Sender<SummaryEvent>,
    ) -> PipelineResult<SummaryResult> {
        self.pipeline.stream_summarize(request, events).await
    }

    /// Cached summary for a paper under a provider and model.
    #[must_use]
    pub fn get_cached_summary(
        &self,
        paper_id: &str,
        provider: &str,
        model: &str,
    ) -> Option<SummaryResult> {
        self.pipeline.get_cached(paper_id, provider, model)
    }

    /// Sizes of both caches.
    #[must_use]
    pub fn cache_stats(&self) -> DigestCacheStats {
        DigestCacheStats {
            responses: self.client.cache_stats(),
            summaries: self.pipeline.cache_stats(),
        }
    }

    /// Drop every cached summary.
    pub fn clear_summary_cache(&self) {
        self.pipeline.clear_cache();
    }
}
