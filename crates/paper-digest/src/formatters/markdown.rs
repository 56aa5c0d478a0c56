//! Markdown output formatting.

use crate::digest::DigestCacheStats;
use crate::models::{PaperPage, PaperRecord, PageSource, SummaryResult};

/// Abstract preview length, in characters.
const ABSTRACT_PREVIEW: usize = 300;

/// Format a page of papers as Markdown.
#[must_use]
pub fn format_page_markdown(page: &PaperPage, offset: usize) -> String {
    if page.is_empty() {
        return "No papers found.".to_string();
    }

    let mut output = format!("# Papers ({} results", page.papers.len());
    if let Some(total) = page.total_results {
        output.push_str(&format!(" of {total}"));
    }
    if page.source == PageSource::Cache {
        output.push_str(", cached");
    }
    output.push_str(")\n\n");

    for (i, paper) in page.papers.iter().enumerate() {
        output.push_str(&format_paper_markdown(paper, offset + i + 1));
        output.push_str("\n---\n\n");
    }

    if page.has_more {
        output.push_str(&format!("_More results from offset {}._\n", offset + page.papers.len()));
    }

    output
}

/// Format a single paper as Markdown.
#[must_use]
pub fn format_paper_markdown(paper: &PaperRecord, index: usize) -> String {
    let mut output = String::new();

    output.push_str(&format!("## {}. {}\n\n", index, paper.title_or_default()));

    if !paper.authors.is_empty() {
        output.push_str(&format!("**Authors**: {}\n\n", paper.author_names()));
    }

    let mut meta = vec![format!("**arXiv**: {}", paper.id)];
    let published = paper.published_at().map(|p| p.date_naive());
    if let Some(published) = published {
        meta.push(format!("**Published**: {}", published.format("%Y-%m-%d")));
    }
    if let Some(updated) = paper.updated_at().map(|u| u.date_naive()).filter(|u| Some(*u) != published) {
        meta.push(format!("**Updated**: {}", updated.format("%Y-%m-%d")));
    }
    if !paper.primary_category.is_empty() {
        meta.push(format!("**Category**: {}", paper.primary_category));
    }
    output.push_str(&format!("{}\n\n", meta.join(" | ")));

    output.push_str(&format!("**Links**: [Abstract]({}) | [PDF]({})\n\n", paper.abs_url, paper.pdf_url));

    if !paper.summary.is_empty() {
        output.push_str(&format!("**Abstract**: {}\n", preview(&paper.summary, ABSTRACT_PREVIEW)));
    }

    output
}

/// Format a structured summary as Markdown.
#[must_use]
pub fn format_summary_markdown(summary: &SummaryResult) -> String {
    let mut output = String::new();

    if !summary.title.is_empty() {
        output.push_str(&format!("# {}\n\n", summary.title));
    }

    if !summary.overall_summary.is_empty() {
        output.push_str(&format!("{}\n\n", summary.overall_summary));
    }

    if !summary.key_points.is_empty() {
        output.push_str("## Key Points\n\n");
        for point in &summary.key_points {
            output.push_str(&format!("- {point}\n"));
        }
        output.push('\n');
    }

    for (heading, body) in [
        ("Methodology", &summary.methodology),
        ("Findings", &summary.findings),
        ("Implications", &summary.implications),
    ] {
        if !body.is_empty() {
            output.push_str(&format!("## {heading}\n\n{body}\n\n"));
        }
    }

    output.trim_end().to_string()
}

/// Format cache sizes as Markdown.
#[must_use]
pub fn format_cache_stats_markdown(stats: &DigestCacheStats) -> String {
    format!(
        "# Cache\n\n| Cache | Entries | Capacity |\n|---|---|---|\n| Responses | {} | {} |\n| Summaries | {} | {} |\n",
        stats.responses.size, stats.responses.capacity, stats.summaries.size, stats.summaries.capacity
    )
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
