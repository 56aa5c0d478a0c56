//! arXiv retrieval gateway.
//!
//! Provides async HTTP client with:
//! - Process-wide request spacing (see [`Throttle`])
//! - Cooldown-and-retry on overload (503/429), bounded by a retry budget
//! - Fallback relay endpoints when the direct endpoint is unreachable
//! - Response caching with 5-minute TTL

pub mod feed;
pub mod query;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::Client;
use reqwest::header::ACCEPT;
use url::Url;

use crate::cache::{CacheStats, TtlCache};
use crate::config::{Config, api};
use crate::error::{RetrievalError, RetrievalResult};
use crate::models::{PageSource, PaperPage, PaperRecord, SearchRequest, SortBy, SortOrder};
use crate::throttle::Throttle;

use self::feed::Feed;

/// A network path to the arXiv query service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// The configured API URL itself.
    Direct,
    /// A relay prefix; the percent-encoded direct URL is appended to it.
    Relay(String),
}

impl Endpoint {
    /// URL to request for the given direct URL.
    #[must_use]
    pub fn request_url(&self, direct: &Url) -> String {
        match self {
            Self::Direct => direct.to_string(),
            Self::Relay(prefix) => {
                let encoded: String =
                    url::form_urlencoded::byte_serialize(direct.as_str().as_bytes()).collect();
                format!("{prefix}{encoded}")
            }
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Relay(prefix) => write!(f, "relay:{prefix}"),
        }
    }
}

/// arXiv API client.
///
/// Clones share the throttle, the response cache and the endpoint selection.
#[derive(Clone)]
pub struct ArxivClient {
    /// HTTP client.
    http: Client,

    /// Direct query endpoint.
    api_url: String,

    /// Direct endpoint followed by relays, in fallback order.
    endpoints: Arc<[Endpoint]>,

    /// Index into `endpoints` used by the next dispatch.
    endpoint_index: Arc<AtomicUsize>,

    /// Dispatch spacing.
    throttle: Arc<Throttle>,

    /// Parsed feeds keyed by request parameters.
    cache: Arc<TtlCache<Feed>>,

    /// Cooldown before a retry.
    retry_cooldown: Duration,

    /// Retries after the first attempt.
    max_retries: u32,

    /// Default classification set.
    categories: Vec<String>,

    /// Classification for the first "latest" page.
    latest_category: String,

    /// Relevance terms for the first "latest" page.
    relevance_keywords: Vec<String>,

    /// Minimum relevant papers before backfilling.
    min_relevant: usize,
}

impl ArxivClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("paper-digest/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .gzip(true)
            .build()?;

        // Validate once so every later request URL is known to parse.
        Url::parse(&config.api_url)?;

        let endpoints: Vec<Endpoint> = std::iter::once(Endpoint::Direct)
            .chain(config.relay_prefixes.iter().cloned().map(Endpoint::Relay))
            .collect();

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            endpoints: endpoints.into(),
            endpoint_index: Arc::new(AtomicUsize::new(0)),
            throttle: Arc::new(Throttle::new(config.min_request_interval)),
            cache: Arc::new(TtlCache::new(config.response_cache_ttl, config.response_cache_capacity)),
            retry_cooldown: config.retry_cooldown,
            max_retries: config.max_retries,
            categories: config.categories.clone(),
            latest_category: config.latest_category.clone(),
            relevance_keywords: config.relevance_keywords.clone(),
            min_relevant: config.min_relevant,
        })
    }

    /// Search for papers.
    ///
    /// Entries outside the requested classifications are dropped and the page
    /// is truncated to the (capped) limit, preserving feed order.
    ///
    /// # Errors
    ///
    /// Returns error on API failure after fallbacks and retries are exhausted.
    pub async fn search(&self, request: &SearchRequest) -> RetrievalResult<PaperPage> {
        let categories = query::effective_categories(request, &self.categories);
        let params = query::search_params(request, &categories);
        let limit = Config::page_size(request.limit);

        let (feed, source) = self.fetch_feed(&params).await?;
        let full_page = feed.entries.len() >= limit;

        let mut papers: Vec<PaperRecord> =
            feed.entries.into_iter().filter(|p| p.in_any_category(&categories)).collect();
        papers.truncate(limit);

        Ok(PaperPage { papers, has_more: full_page, total_results: feed.total_results, source })
    }

    /// Latest submissions.
    ///
    /// The first page queries only the "latest" classification and keeps
    /// papers mentioning a relevance keyword; when fewer than the minimum
    /// match, the unfiltered page is returned instead. Later pages search all
    /// default classifications by submission date.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn fetch_latest(&self, offset: usize, limit: usize) -> RetrievalResult<PaperPage> {
        let by_date = |req: SearchRequest| {
            req.page(offset, limit).sorted(SortBy::SubmittedDate, SortOrder::Descending)
        };

        if offset > 0 {
            return self.search(&by_date(SearchRequest::default())).await;
        }

        let request = by_date(SearchRequest::default().in_category(self.latest_category.clone()));
        let mut page = self.search(&request).await?;

        let relevant: Vec<PaperRecord> = page
            .papers
            .iter()
            .filter(|p| p.mentions_any(&self.relevance_keywords))
            .cloned()
            .collect();

        if relevant.len() >= self.min_relevant {
            page.papers = relevant;
        } else {
            tracing::debug!(
                relevant = relevant.len(),
                min_relevant = self.min_relevant,
                "Too few relevant papers, returning unfiltered page"
            );
        }

        Ok(page)
    }

    /// Get a single paper by arXiv id.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn get_paper(&self, id: &str) -> RetrievalResult<Option<PaperRecord>> {
        let params = query::id_params(id);
        let (feed, _) = self.fetch_feed(&params).await?;
        Ok(feed.entries.into_iter().next())
    }

    /// Response cache size.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop all cached responses.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Cached feed or a fresh one.
    async fn fetch_feed(&self, params: &[(String, String)]) -> RetrievalResult<(Feed, PageSource)> {
        let cache_key = query::cache_key(params);
        if let Some(cached) = self.cache.get(&cache_key) {
            tracing::debug!(key = %cache_key, "Response cache hit");
            return Ok((cached, PageSource::Cache));
        }

        let body = self.dispatch(params).await?;
        let feed = feed::parse_feed(&body)?;

        self.cache.set(cache_key, feed.clone());
        Ok((feed, PageSource::Network))
    }

    /// Throttled dispatch with fallback routing and bounded retry.
    ///
    /// Connectivity failures advance to the next endpoint immediately and do
    /// not consume the retry budget. Once no endpoint is left, connectivity
    /// failures and overloads share the cooldown-and-retry loop on the last
    /// reached endpoint.
    /// The next call starts from the direct endpoint whether this one
    /// succeeds or fails.
    async fn dispatch(&self, params: &[(String, String)]) -> RetrievalResult<String> {
        let direct = Url::parse_with_params(&self.api_url, params)
            .map_err(|e| RetrievalError::malformed(format!("invalid request URL: {e}")))?;

        let last = self.endpoints.len() - 1;
        let mut index = self.endpoint_index.load(Ordering::Relaxed).min(last);
        let mut retries = 0u32;

        loop {
            let endpoint = &self.endpoints[index];
            self.throttle.acquire().await;

            match self.send(endpoint, &direct).await {
                Ok(body) => {
                    self.endpoint_index.store(0, Ordering::Relaxed);
                    return Ok(body);
                }
                Err(err) if err.is_connectivity() && index < last => {
                    tracing::info!(
                        from = %endpoint,
                        to = %self.endpoints[index + 1],
                        error = %err,
                        "Endpoint unreachable, trying fallback"
                    );
                    index += 1;
                    self.endpoint_index.store(index, Ordering::Relaxed);
                }
                Err(err) if err.is_retryable() && retries < self.max_retries => {
                    retries += 1;
                    tracing::warn!(
                        endpoint = %endpoint,
                        attempt = retries,
                        max_retries = self.max_retries,
                        cooldown_ms = self.retry_cooldown.as_millis(),
                        error = %err,
                        "Retrying after cooldown"
                    );
                    tokio::time::sleep(self.retry_cooldown).await;
                }
                Err(err) => {
                    self.endpoint_index.store(0, Ordering::Relaxed);
                    return Err(err);
                }
            }
        }
    }

    /// One HTTP attempt against one endpoint.
    async fn send(&self, endpoint: &Endpoint, direct: &Url) -> RetrievalResult<String> {
        let url = endpoint.request_url(direct);
        tracing::debug!(endpoint = %endpoint, url = %url, "Dispatching query");

        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "application/atom+xml, application/xml;q=0.9, text/xml;q=0.8")
            .send()
            .await
            .map_err(RetrievalError::from_transport)?;

        let response = Self::handle_response(response).await?;
        response.text().await.map_err(RetrievalError::from_transport)
    }

    /// Handle API response status codes.
    async fn handle_response(response: reqwest::Response) -> RetrievalResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status.as_u16() {
            code @ (429 | 503) => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse().ok())
                    .map(Duration::from_secs);

                Err(RetrievalError::overloaded(code, retry_after))
            }
            code => {
                let text = response.text().await.unwrap_or_default();
                Err(RetrievalError::status(code, text))
            }
        }
    }
}

impl std::fmt::Debug for ArxivClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArxivClient")
            .field("api_url", &self.api_url)
            .field("endpoints", &self.endpoints.len())
            .field("max_retries", &self.max_retries)
            .finish()
    }
}
