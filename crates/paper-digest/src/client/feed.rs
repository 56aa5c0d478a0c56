//! Atom feed parsing for arXiv query responses.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{RetrievalError, RetrievalResult};
use crate::models::PaperRecord;

/// Parsed feed: optional total count plus entries in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    /// `opensearch:totalResults`, when present.
    pub total_results: Option<u64>,

    /// One record per `<entry>`.
    pub entries: Vec<PaperRecord>,
}

/// Fields collected while inside one `<entry>`.
#[derive(Default)]
struct EntryBuilder {
    id_url: String,
    title: String,
    summary: String,
    published: String,
    updated: String,
    authors: Vec<String>,
    categories: Vec<String>,
    primary_category: Option<String>,
    typed_pdf: Option<String>,
    titled_pdf: Option<String>,
    abs_link: Option<String>,
    in_author: bool,
}

impl EntryBuilder {
    fn on_element(&mut self, e: &BytesStart<'_>) {
        match e.local_name().as_ref() {
            b"author" => self.in_author = true,
            b"category" => {
                if let Some(term) = attr(e, b"term").filter(|t| !t.trim().is_empty()) {
                    self.categories.push(term);
                }
            }
            b"primary_category" => {
                self.primary_category = attr(e, b"term").filter(|t| !t.trim().is_empty());
            }
            b"link" => self.on_link(e),
            _ => {}
        }
    }

    fn on_link(&mut self, e: &BytesStart<'_>) {
        let Some(href) = attr(e, b"href") else { return };
        let typ = attr(e, b"type").unwrap_or_default();
        let title = attr(e, b"title").unwrap_or_default();

        if typ.contains("pdf") && self.typed_pdf.is_none() {
            self.typed_pdf = Some(href);
        } else if title.eq_ignore_ascii_case("pdf") && self.titled_pdf.is_none() {
            self.titled_pdf = Some(href);
        } else if href.contains("/abs/") && self.abs_link.is_none() {
            self.abs_link = Some(href);
        }
    }

    fn on_text_end(&mut self, name: &[u8], text: String) {
        match name {
            b"id" => self.id_url = text,
            b"title" => self.title = text,
            b"summary" => self.summary = text,
            b"published" => self.published = text,
            b"updated" => self.updated = text,
            b"name" if self.in_author && !text.is_empty() => self.authors.push(text),
            b"author" => self.in_author = false,
            _ => {}
        }
    }

    fn build(self) -> PaperRecord {
        let id = arxiv_id_from_url(&self.id_url);
        let primary_category = self
            .primary_category
            .or_else(|| self.categories.first().cloned())
            .unwrap_or_default();
        let pdf_url =
            self.typed_pdf.or(self.titled_pdf).unwrap_or_else(|| format!("https://arxiv.org/pdf/{id}"));
        let abs_url = self.abs_link.unwrap_or_else(|| format!("https://arxiv.org/abs/{id}"));

        PaperRecord {
            id,
            title: self.title,
            summary: self.summary,
            authors: self.authors,
            published: self.published,
            updated: self.updated,
            primary_category,
            categories: self.categories,
            pdf_url,
            abs_url,
        }
    }
}

/// Parse an arXiv Atom response.
///
/// A document without a `<feed>` root, or one that is not well-formed XML,
/// is a malformed response. An arXiv error entry becomes a 400 status error.
pub fn parse_feed(xml: &str) -> RetrievalResult<Feed> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut feed = Feed::default();
    let mut saw_feed = false;
    let mut entry: Option<EntryBuilder> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                text.clear();
                match e.local_name().as_ref() {
                    b"feed" => saw_feed = true,
                    b"entry" => entry = Some(EntryBuilder::default()),
                    _ => {
                        if let Some(cur) = entry.as_mut() {
                            cur.on_element(&e);
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(cur) = entry.as_mut() {
                    cur.on_element(&e);
                }
            }
            Ok(Event::Text(t)) => {
                let piece = t
                    .unescape()
                    .map_err(|e| RetrievalError::malformed(format!("bad text node: {e}")))?;
                text.push_str(&piece);
            }
            Ok(Event::CData(t)) => {
                text.push_str(&String::from_utf8_lossy(&t.into_inner()));
            }
            Ok(Event::End(e)) => {
                let local = e.local_name();
                let name = local.as_ref();
                let value = normalize_ws(&text);
                text.clear();

                if name == b"entry" {
                    if let Some(done) = entry.take() {
                        if done.id_url.contains("/api/errors") {
                            return Err(RetrievalError::status(400, done.summary));
                        }
                        feed.entries.push(done.build());
                    }
                } else if let Some(cur) = entry.as_mut() {
                    cur.on_text_end(name, value);
                } else if name == b"totalResults" {
                    feed.total_results = value.parse().ok();
                }
            }
            Err(e) => {
                return Err(RetrievalError::malformed(format!(
                    "XML parse error at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_feed {
        return Err(RetrievalError::malformed("response is not an Atom feed"));
    }

    Ok(feed)
}

/// Collapse runs of whitespace (including newlines) to single spaces and trim.
#[must_use]
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract the identifier from an entry `<id>` URL.
///
/// `http://arxiv.org/abs/2501.01234v1` -> `2501.01234v1`,
/// `http://arxiv.org/abs/cs/9901001v1` -> `cs/9901001v1`.
#[must_use]
pub fn arxiv_id_from_url(url: &str) -> String {
    let u = url.trim();
    if let Some(ix) = u.rfind("/abs/") {
        return u[ix + "/abs/".len()..].trim_matches('/').to_string();
    }
    u.rsplit('/').next().unwrap_or(u).to_string()
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}
