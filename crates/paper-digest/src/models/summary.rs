//! Structured summary produced by the generative provider.

use serde::{Deserialize, Serialize};

/// AI-generated structured summary of one paper.
///
/// Every field defaults to empty so a partially streamed document is still a
/// valid value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryResult {
    /// Title as restated by the model.
    pub title: String,

    /// Key points, in order.
    pub key_points: Vec<String>,

    /// Methodology description.
    pub methodology: String,

    /// Main findings.
    pub findings: String,

    /// Implications and significance.
    pub implications: String,

    /// One-paragraph overall summary.
    pub overall_summary: String,
}

impl SummaryResult {
    /// Check if no field holds any content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.key_points.is_empty()
            && self.methodology.is_empty()
            && self.findings.is_empty()
            && self.implications.is_empty()
            && self.overall_summary.is_empty()
    }
}
