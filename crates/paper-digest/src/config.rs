//! Configuration for the paper digest client.

use std::path::PathBuf;
use std::time::Duration;

/// API configuration constants.
pub mod api {
    use std::time::Duration;

    /// arXiv export API query endpoint.
    pub const ARXIV_API: &str = "https://export.arxiv.org/api/query";

    /// Relay prefixes tried, in order, when the direct endpoint is unreachable.
    /// The full direct URL is percent-encoded and appended to the prefix.
    pub const RELAY_PREFIXES: &[&str] =
        &["https://corsproxy.io/?url=", "https://api.allorigins.win/raw?url="];

    /// Request timeout for a single attempt.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Minimum spacing between two dispatches to arXiv (3s, per arXiv API terms).
    pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(3);

    /// Cooldown before retrying an overloaded or unreachable endpoint.
    pub const RETRY_COOLDOWN: Duration = Duration::from_secs(5);

    /// Retries after the first attempt before giving up.
    pub const MAX_RETRIES: u32 = 3;

    /// Page size cap for a single query.
    pub const MAX_RESULTS_CAP: usize = 10;

    /// Search result cache TTL (5 minutes).
    pub const RESPONSE_CACHE_TTL: Duration = Duration::from_secs(300);

    /// Maximum cached search responses.
    pub const RESPONSE_CACHE_CAPACITY: usize = 100;

    /// Summary cache TTL (30 days).
    pub const SUMMARY_CACHE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

    /// Maximum cached summaries.
    pub const SUMMARY_CACHE_CAPACITY: usize = 50;

    /// Minimum spacing between two live summary updates (one display frame).
    pub const UPDATE_INTERVAL: Duration = Duration::from_millis(50);

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);
}

/// Subject classifications and relevance terms used for browsing.
pub mod subjects {
    /// Classifications every keyword search is intersected with.
    pub const DEFAULT_CATEGORIES: &[&str] = &["cs.AI", "cs.CL", "cs.LG", "cs.CV"];

    /// Single classification queried for the first "latest" page.
    pub const LATEST_CATEGORY: &str = "cs.AI";

    /// Terms that mark a paper as relevant on the first "latest" page.
    pub const RELEVANCE_KEYWORDS: &[&str] = &[
        "language model",
        "llm",
        "large model",
        "transformer",
        "agent",
        "reasoning",
        "diffusion",
        "multimodal",
        "reinforcement learning",
        "neural",
        "deep learning",
        "generative",
    ];

    /// Minimum relevant papers before the first page falls back to the unfiltered feed.
    pub const MIN_RELEVANT: usize = 3;
}

/// Generative provider settings.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Provider identifier (part of the summary cache key).
    pub id: String,

    /// OpenAI-compatible base URL (without `/chat/completions`).
    pub base_url: String,

    /// Model identifier (part of the summary cache key).
    pub model: String,

    /// Bearer credential.
    pub api_key: Option<String>,

    /// Whether the provider can deliver an SSE token stream.
    pub supports_streaming: bool,
}

impl ProviderConfig {
    /// Look up a known provider by id with its default model.
    #[must_use]
    pub fn preset(id: &str) -> Option<Self> {
        let (base_url, model) = match id {
            "openai" => ("https://api.openai.com/v1", "gpt-4o-mini"),
            "deepseek" => ("https://api.deepseek.com/v1", "deepseek-chat"),
            "openrouter" => ("https://openrouter.ai/api/v1", "openai/gpt-4o-mini"),
            "ollama" => ("http://localhost:11434/v1", "llama3.1"),
            _ => return None,
        };

        Some(Self {
            id: id.to_string(),
            base_url: base_url.to_string(),
            model: model.to_string(),
            api_key: None,
            supports_streaming: true,
        })
    }

    /// Check if a credential is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            id: "openai".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            supports_streaming: true,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("has_api_key", &self.has_api_key())
            .field("supports_streaming", &self.supports_streaming)
            .finish()
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Direct arXiv query endpoint.
    pub api_url: String,

    /// Relay prefixes used as fallback endpoints, in order.
    pub relay_prefixes: Vec<String>,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Minimum spacing between arXiv dispatches.
    pub min_request_interval: Duration,

    /// Cooldown before an overload retry.
    pub retry_cooldown: Duration,

    /// Overload retries after the first attempt.
    pub max_retries: u32,

    /// Classifications keyword searches are intersected with.
    pub categories: Vec<String>,

    /// Classification used for the first "latest" page.
    pub latest_category: String,

    /// Relevance terms for the first "latest" page.
    pub relevance_keywords: Vec<String>,

    /// Minimum relevant papers before backfilling.
    pub min_relevant: usize,

    /// Search response cache TTL.
    pub response_cache_ttl: Duration,

    /// Maximum cached search responses.
    pub response_cache_capacity: usize,

    /// Summary cache TTL.
    pub summary_cache_ttl: Duration,

    /// Maximum cached summaries.
    pub summary_cache_capacity: usize,

    /// Minimum spacing between live summary updates.
    pub update_interval: Duration,

    /// Generative provider.
    pub provider: ProviderConfig,

    /// Language the summary should be written in (provider default when unset).
    pub language: Option<String>,

    /// Directory for the persisted summary cache (in-memory only when unset).
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    /// Create the default configuration for the given provider.
    #[must_use]
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            api_url: api::ARXIV_API.to_string(),
            relay_prefixes: api::RELAY_PREFIXES.iter().map(ToString::to_string).collect(),
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            min_request_interval: api::MIN_REQUEST_INTERVAL,
            retry_cooldown: api::RETRY_COOLDOWN,
            max_retries: api::MAX_RETRIES,
            categories: subjects::DEFAULT_CATEGORIES.iter().map(ToString::to_string).collect(),
            latest_category: subjects::LATEST_CATEGORY.to_string(),
            relevance_keywords: subjects::RELEVANCE_KEYWORDS
                .iter()
                .map(ToString::to_string)
                .collect(),
            min_relevant: subjects::MIN_RELEVANT,
            response_cache_ttl: api::RESPONSE_CACHE_TTL,
            response_cache_capacity: api::RESPONSE_CACHE_CAPACITY,
            summary_cache_ttl: api::SUMMARY_CACHE_TTL,
            summary_cache_capacity: api::SUMMARY_CACHE_CAPACITY,
            update_interval: api::UPDATE_INTERVAL,
            provider,
            language: None,
            cache_dir: None,
        }
    }

    /// Create a test configuration pointing at a mock server.
    ///
    /// The arXiv endpoint is `{base_url}/api/query` and the provider is an
    /// OpenAI-compatible mock at `{base_url}/v1`. No spacing, no cooldown, no
    /// relays, no response caching.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        let provider = ProviderConfig {
            id: "mock".to_string(),
            base_url: format!("{base_url}/v1"),
            model: "mock-model".to_string(),
            api_key: Some("test-key".to_string()),
            supports_streaming: true,
        };

        Self {
            api_url: format!("{base_url}/api/query"),
            relay_prefixes: Vec::new(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            min_request_interval: Duration::from_millis(0), // No spacing in tests
            retry_cooldown: Duration::from_millis(0),
            response_cache_ttl: Duration::from_secs(0), // No caching in tests
            response_cache_capacity: 0,
            update_interval: Duration::from_millis(10),
            ..Self::new(provider)
        }
    }

    /// Create configuration from environment variables (a `.env` file is honored).
    ///
    /// # Errors
    ///
    /// Returns error if environment variables are invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let provider_id = env_var("LLM_PROVIDER").unwrap_or_else(|| "openai".to_string());
        let mut provider = ProviderConfig::preset(&provider_id).unwrap_or_else(|| ProviderConfig {
            id: provider_id.clone(),
            ..ProviderConfig::default()
        });
        if let Some(model) = env_var("LLM_MODEL") {
            provider.model = model;
        }
        if let Some(base_url) = env_var("LLM_BASE_URL") {
            provider.base_url = base_url.trim_end_matches('/').to_string();
        }
        provider.api_key = env_var("LLM_API_KEY");

        let mut config = Self::new(provider);

        if let Some(url) = env_var("ARXIV_API_URL") {
            config.api_url = url;
        }
        if let Some(relays) = env_var("ARXIV_RELAY_URLS") {
            config.relay_prefixes = split_list(&relays);
        }
        if let Some(ms) = env_var("ARXIV_MIN_INTERVAL_MS") {
            let ms: u64 = ms
                .parse()
                .map_err(|e| anyhow::anyhow!("ARXIV_MIN_INTERVAL_MS must be an integer: {e}"))?;
            config.min_request_interval = Duration::from_millis(ms);
        }
        if let Some(categories) = env_var("PAPER_DIGEST_CATEGORIES") {
            let categories = split_list(&categories);
            if categories.is_empty() {
                anyhow::bail!("PAPER_DIGEST_CATEGORIES must name at least one category");
            }
            config.categories = categories;
        }
        config.language = env_var("PAPER_DIGEST_LANGUAGE");
        config.cache_dir = env_var("PAPER_DIGEST_CACHE_DIR").map(PathBuf::from);

        Ok(config)
    }

    /// Cap a requested page size to the per-query policy.
    #[must_use]
    pub fn page_size(limit: usize) -> usize {
        limit.clamp(1, api::MAX_RESULTS_CAP)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(ProviderConfig::default())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(ToString::to_string).collect()
}
