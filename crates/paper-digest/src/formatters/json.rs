//! JSON output formatting.

use serde_json::{Value, json};

use crate::models::{PaperPage, PaperRecord};

/// Create a compact paper representation for JSON output.
#[must_use]
pub fn compact_paper(paper: &PaperRecord) -> Value {
    let mut obj = json!({
        "id": paper.id,
        "title": paper.title_or_default(),
        "published": paper.published,
        "category": paper.primary_category,
        "pdf": paper.pdf_url,
    });

    if !paper.authors.is_empty() {
        obj["authors"] = json!(paper.authors);
    }

    if paper.categories.len() > 1 {
        obj["categories"] = json!(paper.categories);
    }

    if !paper.summary.is_empty() {
        obj["abstract"] = json!(paper.summary);
    }

    obj
}

/// Create a compact page representation for JSON output.
#[must_use]
pub fn compact_page(page: &PaperPage) -> Value {
    let mut obj = json!({
        "papers": page.papers.iter().map(compact_paper).collect::<Vec<_>>(),
        "hasMore": page.has_more,
        "source": page.source,
    });

    if let Some(total) = page.total_results {
        obj["totalResults"] = json!(total);
    }

    obj
}
