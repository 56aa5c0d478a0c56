//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::ResponseTemplate;

/// One SSE `data:` frame carrying a content delta.
pub fn sse_frame(content: &str) -> String {
    let chunk = json!({
        "id": "chatcmpl-1",
        "object": "chat.completion.chunk",
        "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
    });
    format!("data: {chunk}\n\n")
}

/// Serve one HTTP response whose body is written in timed stages.
pub async fn staged_server(stages: Vec<(Duration, String)>, content_length: Option<usize>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;

        let mut head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n"
            .to_string();
        if let Some(len) = content_length {
            head.push_str(&format!("content-length: {len}\r\n"));
        }
        head.push_str("\r\n");
        socket.write_all(head.as_bytes()).await.unwrap();

        for (delay, data) in stages {
            tokio::time::sleep(delay).await;
            socket.write_all(data.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
        }
        let _ = socket.shutdown().await;
    });

    format!("http://{addr}")
}

/// Consume headers and a content-length body.
pub async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let body_len = text[..end]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse().ok())?
                })
                .unwrap_or(0usize);
            if buf.len() >= end + 4 + body_len {
                return;
            }
        }
    }
}

/// One Atom `<entry>` in arXiv's shape.
pub fn entry(id: &str, title: &str, summary: &str, category: &str) -> String {
    format!(
        r#"<entry>
    <id>http://arxiv.org/abs/{id}v1</id>
    <updated>2025-01-16T08:00:00Z</updated>
    <published>2025-01-15T12:00:00Z</published>
    <title>{title}</title>
    <summary>{summary}</summary>
    <author><name>Test Author</name></author>
    <link href="http://arxiv.org/abs/{id}v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/{id}v1" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="{category}"/>
    <category term="{category}"/>
  </entry>"#
    )
}

/// A feed document whose total equals the entry count.
pub fn feed(entries: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title>ArXiv Query</title>
  <opensearch:totalResults>{}</opensearch:totalResults>
  {}
</feed>"#,
        entries.len(),
        entries.join("\n  ")
    )
}

pub fn atom(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).insert_header("content-type", "application/atom+xml").set_body_string(body)
}
