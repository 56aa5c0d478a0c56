//! Line-delimited JSON-RPC over stdin/stdout.
//!
//! Requests are handled one at a time. While `summary/stream` runs, each
//! partial summary is written as a `summary/update` notification before the
//! final response.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::digest::PaperDigest;
use crate::error::{RetrievalError, SummaryError};
use crate::models::{SearchRequest, SummaryRequest};
use crate::summary::SummaryEvent;

use super::rpc::{
    INVALID_PARAMS, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND,
    OPERATION_FAILED, PARSE_ERROR,
};

/// Notification method carrying partial summaries.
pub const UPDATE_NOTIFICATION: &str = "summary/update";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LatestParams {
    offset: usize,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct GetParams {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedParams {
    paper_id: String,
    provider: Option<String>,
    model: Option<String>,
}

/// Serve stdin/stdout until stdin closes.
///
/// # Errors
///
/// Returns error on I/O failure.
pub async fn run_stdio(digest: PaperDigest) -> anyhow::Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();
    serve(&digest, reader, writer).await
}

/// Serve any line-oriented reader/writer pair.
///
/// # Errors
///
/// Returns error on I/O failure.
pub async fn serve<R, W>(digest: &PaperDigest, mut reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    tracing::info!("Stdio server ready, waiting for requests...");

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            tracing::info!("Stdin closed, shutting down");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
            Ok(req) => req,
            Err(e) => {
                let response =
                    JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}"));
                write_line(&mut writer, &response).await?;
                continue;
            }
        };

        tracing::debug!(method = %request.method, "Received request");

        let response = handle_request(digest, &request, &mut writer).await?;
        write_line(&mut writer, &response).await?;
    }

    Ok(())
}

/// Dispatch one request. Notifications, if any, are written to `writer`.
///
/// # Errors
///
/// Returns error only when writing a notification fails.
pub async fn handle_request<W>(
    digest: &PaperDigest,
    req: &JsonRpcRequest,
    writer: &mut W,
) -> anyhow::Result<JsonRpcResponse>
where
    W: AsyncWrite + Unpin,
{
    let id = req.id.clone();
    let response = match req.method.as_str() {
        "ping" => JsonRpcResponse::success(id, json!({})),
        "papers/latest" => match parse_params::<LatestParams>(&req.params) {
            Ok(p) => {
                let limit = p.limit.unwrap_or(crate::config::api::MAX_RESULTS_CAP);
                retrieval_response(id, digest.fetch_latest(p.offset, limit).await)
            }
            Err(resp) => resp.with_id(id),
        },
        "papers/search" => match parse_params::<SearchRequest>(&req.params) {
            Ok(search) => retrieval_response(id, digest.search(&search).await),
            Err(resp) => resp.with_id(id),
        },
        "papers/get" => match parse_params::<GetParams>(&req.params) {
            Ok(p) => retrieval_response(id, digest.get_paper(&p.id).await),
            Err(resp) => resp.with_id(id),
        },
        "summary/stream" => match parse_params::<SummaryRequest>(&req.params) {
            Ok(summary) => return stream_summary(digest, id, &summary, writer).await,
            Err(resp) => resp.with_id(id),
        },
        "summary/cached" => match parse_params::<CachedParams>(&req.params) {
            Ok(p) => {
                let provider = digest.pipeline().provider();
                let cached = digest.get_cached_summary(
                    &p.paper_id,
                    p.provider.as_deref().unwrap_or(&provider.id),
                    p.model.as_deref().unwrap_or(&provider.model),
                );
                JsonRpcResponse::success(id, json!({ "summary": cached }))
            }
            Err(resp) => resp.with_id(id),
        },
        "cache/stats" => JsonRpcResponse::success(id, json!(digest.cache_stats())),
        "cache/clear" => {
            digest.clear_summary_cache();
            digest.client().clear_cache();
            tracing::info!("Caches cleared");
            JsonRpcResponse::success(id, json!({ "cleared": true }))
        }
        _ => {
            JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", req.method))
        }
    };
    Ok(response)
}

async fn stream_summary<W>(
    digest: &PaperDigest,
    id: Option<Value>,
    request: &SummaryRequest,
    writer: &mut W,
) -> anyhow::Result<JsonRpcResponse>
where
    W: AsyncWrite + Unpin,
{
    let (tx, mut rx) = mpsc::channel(16);
    let paper_id = request.paper_id.clone();

    let forward = async {
        while let Some(event) = rx.recv().await {
            if let SummaryEvent::Update(partial) = event {
                let params = json!({ "paperId": paper_id, "summary": partial });
                write_line(writer, &JsonRpcNotification::new(UPDATE_NOTIFICATION, params)).await?;
            }
        }
        anyhow::Ok(())
    };

    let (outcome, forwarded) = tokio::join!(digest.stream_summarize(request, tx), forward);
    forwarded?;

    Ok(match outcome {
        Ok(summary) => JsonRpcResponse::success(id, json!({ "summary": summary })),
        Err(e) => summary_error(id, &e),
    })
}

fn retrieval_response<T: serde::Serialize>(
    id: Option<Value>,
    outcome: Result<T, RetrievalError>,
) -> JsonRpcResponse {
    match outcome {
        Ok(value) => match serde_json::to_value(value) {
            Ok(json) => JsonRpcResponse::success(id, json),
            Err(e) => {
                JsonRpcResponse::error(id, OPERATION_FAILED, format!("Serialization error: {e}"))
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "Retrieval failed");
            JsonRpcResponse::error_with_data(
                id,
                OPERATION_FAILED,
                e.to_string(),
                Some(json!({ "kind": e.kind(), "status": e.status_code() })),
            )
        }
    }
}

/// Precondition failures are flagged so a UI can ask for configuration
/// instead of offering a retry.
fn summary_error(id: Option<Value>, e: &SummaryError) -> JsonRpcResponse {
    if e.is_precondition() {
        tracing::warn!(error = %e, "Summary precondition unmet");
    } else {
        tracing::error!(error = %e, "Summary failed");
    }
    let data = json!({ "kind": e.kind(), "precondition": e.is_precondition() });
    JsonRpcResponse::error_with_data(id, OPERATION_FAILED, e.to_string(), Some(data))
}

/// Parse params; a missing params value is treated as `{}`.
fn parse_params<T: DeserializeOwned>(params: &Value) -> Result<T, JsonRpcResponse> {
    let params = if params.is_null() { json!({}) } else { params.clone() };
    serde_json::from_value(params)
        .map_err(|e| JsonRpcResponse::error(None, INVALID_PARAMS, format!("Invalid params: {e}")))
}

async fn write_line<W, T>(writer: &mut W, message: &T) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let json = serde_json::to_string(message)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
