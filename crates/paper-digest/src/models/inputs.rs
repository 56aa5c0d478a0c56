//! Input models for search and summary operations.

use serde::{Deserialize, Serialize};

use super::{PaperRecord, SortBy, SortOrder};

/// Parameters of one search call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Keyword terms, combined with OR. Empty means "any".
    #[serde(default)]
    pub terms: Vec<String>,

    /// Pin a single classification instead of the default set.
    #[serde(default)]
    pub category: Option<String>,

    /// Result offset.
    #[serde(default)]
    pub offset: usize,

    /// Page size (capped at 10).
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Sort key.
    #[serde(default)]
    pub sort_by: SortBy,

    /// Sort direction.
    #[serde(default)]
    pub sort_order: SortOrder,
}

fn default_limit() -> usize {
    10
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            terms: Vec::new(),
            category: None,
            offset: 0,
            limit: default_limit(),
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl SearchRequest {
    /// Build a request from a free-text query: comma-separated parts become
    /// separate OR'ed terms.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let terms = query
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(ToString::to_string)
            .collect();

        Self { terms, sort_by: SortBy::Relevance, ..Default::default() }
    }

    /// Set offset and limit.
    #[must_use]
    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// Pin a single classification.
    #[must_use]
    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set sort key and direction.
    #[must_use]
    pub fn sorted(mut self, sort_by: SortBy, sort_order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
        self
    }
}

/// The paper fields a summary is generated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    /// Paper identifier (part of the cache key).
    pub paper_id: String,

    /// Paper title.
    pub title: String,

    /// Paper abstract.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

impl SummaryRequest {
    /// Create a summary request.
    #[must_use]
    pub fn new(
        paper_id: impl Into<String>,
        title: impl Into<String>,
        abstract_text: impl Into<String>,
    ) -> Self {
        Self { paper_id: paper_id.into(), title: title.into(), abstract_text: abstract_text.into() }
    }
}

impl From<&PaperRecord> for SummaryRequest {
    fn from(paper: &PaperRecord) -> Self {
        Self::new(paper.id.clone(), paper.title.clone(), paper.summary.clone())
    }
}
