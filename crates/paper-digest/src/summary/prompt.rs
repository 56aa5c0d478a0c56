//! Chat prompt for structured paper summaries.

use serde::Serialize;

use crate::models::SummaryRequest;

const SYSTEM_PROMPT: &str = "You are a research assistant who explains machine learning papers \
to busy engineers. Respond with a single JSON object and nothing else. Use exactly these keys:
{
  \"title\": string,
  \"keyPoints\": [string, ...],
  \"methodology\": string,
  \"findings\": string,
  \"implications\": string,
  \"overallSummary\": string
}
Give three to five key points. Keep every value plain text without markdown.";

/// One chat message in OpenAI wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// `system` or `user`.
    pub role: &'static str,

    /// Message text.
    pub content: String,
}

/// Build the system and user messages for one paper.
#[must_use]
pub fn build_messages(request: &SummaryRequest, language: Option<&str>) -> Vec<ChatMessage> {
    let mut system = SYSTEM_PROMPT.to_string();
    if let Some(lang) = language.map(str::trim).filter(|l| !l.is_empty()) {
        system.push_str(&format!(" Write all values in {lang}; keep the JSON keys in English."));
    }

    let user = format!(
        "Summarize this paper.\n\nTitle: {}\n\nAbstract:\n{}",
        request.title.trim(),
        request.abstract_text.trim()
    );

    vec![
        ChatMessage { role: "system", content: system },
        ChatMessage { role: "user", content: user },
    ]
}
