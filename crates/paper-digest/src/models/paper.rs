//! Paper data model built from arXiv Atom entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PageSource;

/// A research paper parsed from one feed entry.
///
/// Absent fields are empty strings or lists, never missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaperRecord {
    /// Stable arXiv identifier including version (e.g., "2501.01234v1").
    pub id: String,

    /// Whitespace-normalized title.
    pub title: String,

    /// Whitespace-normalized abstract.
    pub summary: String,

    /// Author names in document order.
    pub authors: Vec<String>,

    /// First publication timestamp (RFC 3339).
    pub published: String,

    /// Last update timestamp (RFC 3339).
    pub updated: String,

    /// Primary classification (e.g., "cs.CL").
    pub primary_category: String,

    /// All classifications in document order.
    pub categories: Vec<String>,

    /// Resolved PDF link.
    pub pdf_url: String,

    /// Resolved canonical abstract page link.
    pub abs_url: String,
}

impl PaperRecord {
    /// Publication time, if the timestamp parses.
    #[must_use]
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.published)
    }

    /// Update time, if the timestamp parses.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.updated)
    }

    /// Get the paper title, falling back to "Untitled" if empty.
    #[must_use]
    pub fn title_or_default(&self) -> &str {
        if self.title.is_empty() { "Untitled" } else { &self.title }
    }

    /// Get author names as a comma-separated string.
    #[must_use]
    pub fn author_names(&self) -> String {
        self.authors.join(", ")
    }

    /// Identifier without the version suffix ("2501.01234v2" -> "2501.01234").
    #[must_use]
    pub fn base_id(&self) -> &str {
        match self.id.rsplit_once('v') {
            Some((base, version))
                if !base.is_empty()
                    && !version.is_empty()
                    && version.chars().all(|c| c.is_ascii_digit()) =>
            {
                base
            }
            _ => &self.id,
        }
    }

    /// True if any classification of this paper is in `categories`.
    #[must_use]
    pub fn in_any_category(&self, categories: &[String]) -> bool {
        self.categories.iter().chain(std::iter::once(&self.primary_category)).any(|c| {
            categories.iter().any(|wanted| wanted.eq_ignore_ascii_case(c))
        })
    }

    /// True if the title or abstract mentions any keyword (case-insensitive).
    #[must_use]
    pub fn mentions_any(&self, keywords: &[String]) -> bool {
        let haystack = format!("{} {}", self.title, self.summary).to_lowercase();
        keywords.iter().any(|k| haystack.contains(&k.to_lowercase()))
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperPage {
    /// Papers in feed order.
    pub papers: Vec<PaperRecord>,

    /// True when the page is full, so another page may exist.
    pub has_more: bool,

    /// Total matches reported by the feed, if present.
    #[serde(default)]
    pub total_results: Option<u64>,

    /// Network or cache.
    pub source: PageSource,
}

impl PaperPage {
    /// Check if the page holds no papers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok().map(|dt| dt.with_timezone(&Utc))
}
