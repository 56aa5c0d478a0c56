//! Server-sent event decoding for OpenAI-compatible chat streams.
//!
//! Bytes are buffered until a full line is available, so multi-byte
//! characters split across network chunks decode correctly.

use serde_json::Value;

/// Terminal sentinel payload.
const DONE: &str = "[DONE]";

/// Incremental decoder yielding `choices[0].delta.content` fragments.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the text fragments completed by this chunk.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        if self.done {
            return Vec::new();
        }
        self.pending.extend_from_slice(chunk);

        let mut fragments = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(fragment) = self.handle_line(&String::from_utf8_lossy(&line)) {
                fragments.push(fragment);
            }
            if self.done {
                self.pending.clear();
                break;
            }
        }
        fragments
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Vec<String> {
        if self.done || self.pending.is_empty() {
            return Vec::new();
        }
        let line = std::mem::take(&mut self.pending);
        self.handle_line(&String::from_utf8_lossy(&line)).into_iter().collect()
    }

    /// True once the `[DONE]` sentinel was seen.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.done
    }

    fn handle_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() || line.starts_with(':') {
            return None;
        }

        let data = line.strip_prefix("data:")?;
        let data = data.strip_prefix(' ').unwrap_or(data).trim();
        if data == DONE {
            self.done = true;
            return None;
        }

        match serde_json::from_str::<Value>(data) {
            Ok(json) => delta_content(&json),
            Err(e) => {
                let preview: String = data.chars().take(200).collect();
                tracing::warn!(error = %e, data_preview = %preview, "Skipping unparseable SSE payload");
                None
            }
        }
    }
}

/// Extract `choices[0].delta.content` when it is a non-empty string.
#[must_use]
pub fn delta_content(json: &Value) -> Option<String> {
    json.get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}
