//! Best-effort recovery of a summary from a possibly truncated JSON document.
//!
//! The model streams a JSON object one fragment at a time. At any point the
//! accumulated text may be cut mid-string, mid-array or mid-key. A full parse
//! is attempted first; when it fails each field is pulled out individually,
//! accepting an unterminated trailing string as a partial value.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::models::SummaryResult;

const TITLE: &[&str] = &["title"];
const KEY_POINTS: &[&str] = &["keyPoints", "key_points", "keypoints", "highlights"];
const METHODOLOGY: &[&str] = &["methodology", "methods", "method"];
const FINDINGS: &[&str] = &["findings", "results", "keyFindings"];
const IMPLICATIONS: &[&str] = &["implications", "significance", "impact"];
const OVERALL: &[&str] = &["overallSummary", "overall_summary", "summary", "abstract"];

/// Compiled extraction patterns for one field, in synonym priority order.
struct FieldPatterns {
    scalar: Vec<Regex>,
    list: Vec<Regex>,
}

impl FieldPatterns {
    fn new(names: &[&str]) -> Self {
        let build = |tail: &str| -> Vec<Regex> {
            names
                .iter()
                .filter_map(|n| Regex::new(&format!(r#""{}"\s*:\s*{tail}"#, regex::escape(n))).ok())
                .collect()
        };
        Self { scalar: build(r#""((?s:[^"\\]|\\.)*)"#), list: build(r"\[") }
    }
}

static PATTERNS: LazyLock<[FieldPatterns; 6]> = LazyLock::new(|| {
    [TITLE, KEY_POINTS, METHODOLOGY, FINDINGS, IMPLICATIONS, OVERALL].map(FieldPatterns::new)
});

/// Reconstruct the best summary obtainable from `text`.
///
/// Returns `None` only when not a single recognizable field is present.
#[must_use]
pub fn reconstruct(text: &str) -> Option<SummaryResult> {
    if let Some(object) = outermost_object(text) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(object) {
            return from_object(&map);
        }
    }
    from_fragments(text)
}

/// The span from the first `{` to the last `}`, when both exist in order.
fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn from_object(map: &Map<String, Value>) -> Option<SummaryResult> {
    let present =
        move |names: &'static [&'static str]| names.iter().filter_map(move |n| map.get(*n));

    let fields = [TITLE, METHODOLOGY, FINDINGS, IMPLICATIONS, OVERALL]
        .map(|names| first_filled(present(names).map(value_text), String::is_empty));
    let key_points = first_filled(present(KEY_POINTS).map(value_list), Vec::is_empty);
    if key_points.is_none() && fields.iter().all(Option::is_none) {
        return None;
    }

    let [title, methodology, findings, implications, overall] =
        fields.map(Option::unwrap_or_default);
    Some(SummaryResult {
        title,
        key_points: key_points.unwrap_or_default(),
        methodology,
        findings,
        implications,
        overall_summary: overall,
    })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => {
            items.iter().map(value_text).filter(|s| !s.is_empty()).collect::<Vec<_>>().join("\n")
        }
        other => other.to_string(),
    }
}

fn value_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(value_text).filter(|s| !s.is_empty()).collect(),
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn from_fragments(text: &str) -> Option<SummaryResult> {
    let [title, key_points, methodology, findings, implications, overall] = &*PATTERNS;

    let scalars =
        [title, methodology, findings, implications, overall].map(|p| scalar_field(text, p));
    let points = list_field(text, key_points);
    if points.is_none() && scalars.iter().all(Option::is_none) {
        return None;
    }

    let [title, methodology, findings, implications, overall] =
        scalars.map(Option::unwrap_or_default);
    Some(SummaryResult {
        title,
        key_points: points.unwrap_or_default(),
        methodology,
        findings,
        implications,
        overall_summary: overall,
    })
}

/// The highest-priority synonym holding text wins; an empty value is only
/// reported when no synonym has any. The value runs to the closing quote or
/// to the end of text.
fn scalar_field(text: &str, patterns: &FieldPatterns) -> Option<String> {
    let values = patterns
        .scalar
        .iter()
        .filter_map(|re| re.captures(text))
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape(m.as_str()));
    first_filled(values, String::is_empty)
}

/// Like [`scalar_field`], over arrays: the highest-priority synonym with at
/// least one closed item wins.
fn list_field(text: &str, patterns: &FieldPatterns) -> Option<Vec<String>> {
    let lists = patterns
        .list
        .iter()
        .filter_map(|re| re.find(text))
        .map(|m| list_items(&text[m.end()..]));
    first_filled(lists, Vec::is_empty)
}

/// First non-empty value, else the first value.
fn first_filled<T>(values: impl Iterator<Item = T>, is_empty: fn(&T) -> bool) -> Option<T> {
    let mut fallback = None;
    for value in values {
        if !is_empty(&value) {
            return Some(value);
        }
        fallback.get_or_insert(value);
    }
    fallback
}

/// Only fully terminated string items are taken from a partial array.
fn list_items(mut rest: &str) -> Vec<String> {
    let mut items = Vec::new();

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        match rest.chars().next() {
            Some('"') => match closed_string(&rest[1..]) {
                Some((raw, consumed)) => {
                    let item = unescape(raw);
                    if !item.is_empty() {
                        items.push(item);
                    }
                    rest = &rest[1 + consumed..];
                }
                None => break,
            },
            Some(']') | None => break,
            Some(_) => match rest.find([',', ']']) {
                Some(ix) => rest = &rest[ix..],
                None => break,
            },
        }
    }

    items
}

/// Raw body of a string whose opening quote was already consumed, plus the
/// byte length including the closing quote. `None` when unterminated.
fn closed_string(s: &str) -> Option<(&str, usize)> {
    let mut escaped = false;
    for (ix, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some((&s[..ix], ix + 1)),
            _ => {}
        }
    }
    None
}

/// Decode JSON string escapes. A truncated escape at the end is dropped.
#[must_use]
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => match hex4(&mut chars) {
                Some(high @ 0xD800..=0xDBFF) => {
                    let mut lookahead = chars.clone();
                    let low = if lookahead.next() == Some('\\') && lookahead.next() == Some('u') {
                        hex4(&mut lookahead).filter(|low| (0xDC00..=0xDFFF).contains(low))
                    } else {
                        None
                    };
                    if let Some(low) = low {
                        chars = lookahead;
                        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                        out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                    } else if !awaiting_escape(&chars) {
                        out.push(char::REPLACEMENT_CHARACTER);
                    }
                }
                Some(code) => out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)),
                None => {}
            },
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// True when the remaining text could still grow into a `\uXXXX` escape.
fn awaiting_escape(rest: &std::iter::Peekable<std::str::Chars<'_>>) -> bool {
    let rest: String = rest.clone().collect();
    let head: String = rest.chars().take(2).collect();
    rest.len() < 6 && "\\u".starts_with(&head)
}

fn hex4(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<u32> {
    let mut code = 0;
    for _ in 0..4 {
        let digit = chars.next()?.to_digit(16)?;
        code = code * 16 + digit;
    }
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_fragment_stream() {
        let first = r#"{"title":"A","keyPoi"#;
        let partial = reconstruct(first).expect("title recognized");
        assert_eq!(partial.title, "A");
        assert!(partial.key_points.is_empty());

        let full = format!("{first}{}", r#"nts":["x","y"]}"#);
        let done = reconstruct(&full).expect("complete");
        assert_eq!(done.title, "A");
        assert_eq!(done.key_points, vec!["x", "y"]);
    }

    #[test]
    fn test_full_parse_with_synonyms_and_surrounding_prose() {
        let text = r#"Here you go:
```json
{"title": "T", "highlights": ["a"], "methods": "M", "results": "R", "impact": "I", "summary": "S"}
```"#;
        let s = reconstruct(text).unwrap();
        assert_eq!(s.title, "T");
        assert_eq!(s.key_points, vec!["a"]);
        assert_eq!(s.methodology, "M");
        assert_eq!(s.findings, "R");
        assert_eq!(s.implications, "I");
        assert_eq!(s.overall_summary, "S");
    }

    #[test]
    fn test_canonical_name_preferred_over_synonym() {
        let text = r#"{"abstract": "echoed", "overallSummary": "own words"}"#;
        assert_eq!(reconstruct(text).unwrap().overall_summary, "own words");

        let partial = r#"{"abstract": "echoed", "overallSummary": "own wo"#;
        assert_eq!(reconstruct(partial).unwrap().overall_summary, "own wo");
    }

    #[test]
    fn test_synonym_text_kept_until_canonical_value_has_text() {
        let text = r#"{"title":"T","abstract":"echo","overallSummary":"own words"}"#;
        let mut seen = false;
        for end in 1..=text.len() {
            let overall = reconstruct(&text[..end]).map(|s| s.overall_summary).unwrap_or_default();
            assert!(!seen || !overall.is_empty(), "emptied at {:?}", &text[..end]);
            seen |= !overall.is_empty();
        }

        let opened = r#"{"title":"T","abstract":"echo","overallSummary":""#;
        assert_eq!(reconstruct(opened).unwrap().overall_summary, "echo");
        assert_eq!(reconstruct(text).unwrap().overall_summary, "own words");

        // An empty canonical value in a complete document yields to the synonym.
        let empty = r#"{"abstract":"echo","overallSummary":""}"#;
        assert_eq!(reconstruct(empty).unwrap().overall_summary, "echo");
    }

    #[test]
    fn test_list_synonym_kept_until_canonical_list_has_items() {
        let open = r#"{"highlights":["h1"],"keyPoints":["#;
        assert_eq!(reconstruct(open).unwrap().key_points, vec!["h1"]);

        let filled = r#"{"highlights":["h1"],"keyPoints":["k1","#;
        assert_eq!(reconstruct(filled).unwrap().key_points, vec!["k1"]);
    }

    #[test]
    fn test_partial_string_value() {
        let s = reconstruct(r#"{"title": "Attention Is All"#).unwrap();
        assert_eq!(s.title, "Attention Is All");
    }

    #[test]
    fn test_partial_array_keeps_closed_items_only() {
        let s = reconstruct(r#"{"keyPoints": ["one", "tw"#).unwrap();
        assert_eq!(s.key_points, vec!["one"]);

        let s = reconstruct(r#"{"keyPoints": ["a]b", "c"], "methodology": "m"#).unwrap();
        assert_eq!(s.key_points, vec!["a]b", "c"]);
        assert_eq!(s.methodology, "m");
    }

    #[test]
    fn test_escapes_in_partial_values() {
        let s = reconstruct(r#"{"title": "say \"hi\"\nnow é\/\\"#).unwrap();
        assert_eq!(s.title, "say \"hi\"\nnow é/\\");
    }

    #[test]
    fn test_truncated_escape_dropped() {
        assert_eq!(reconstruct(r#"{"title": "ab\"#).unwrap().title, "ab");
        assert_eq!(reconstruct(r#"{"title": "ab\u00"#).unwrap().title, "ab");
    }

    #[test]
    fn test_surrogate_pair() {
        assert_eq!(unescape(r"\ud83d\ude00"), "😀");
        assert_eq!(unescape(r"a\ud83d"), "a");
        assert_eq!(unescape(r"a\ud83dz"), "a\u{FFFD}z");
    }

    #[test]
    fn test_nothing_recognizable() {
        assert!(reconstruct("").is_none());
        assert!(reconstruct("Sure, let me think").is_none());
        assert!(reconstruct(r#"{"other": 1}"#).is_none());
        assert!(reconstruct(r#"{"tit"#).is_none());
    }

    #[test]
    fn test_non_string_values_are_stringified() {
        let s = reconstruct(r#"{"findings": ["f1", "f2"], "keyPoints": "single", "impact": 3}"#).unwrap();
        assert_eq!(s.findings, "f1\nf2");
        assert_eq!(s.key_points, vec!["single"]);
        assert_eq!(s.implications, "3");
    }
}
