//! Paper Digest
//!
//! Browse recent arXiv submissions and stream structured AI summaries of them.
//!
//! # Features
//!
//! - **Resilient retrieval**: request spacing, cooldown-and-retry on overload,
//!   relay fallback when arXiv is unreachable, 5-minute response cache
//! - **Streaming summaries**: OpenAI-compatible chat streams are re-parsed as
//!   they arrive, so partial summaries are available within milliseconds
//! - **Persistent summary cache**: keyed by paper, provider and model
//! - **Stdio JSON-RPC server** for a UI process
//!
//! # Example
//!
//! ```no_run
//! use paper_digest::{Config, PaperDigest, SummaryEvent, SummaryRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let digest = PaperDigest::new(&config)?;
//!
//!     let page = digest.fetch_latest(0, 10).await?;
//!     if let Some(paper) = page.papers.first() {
//!         let (tx, mut rx) = tokio::sync::mpsc::channel(16);
//!         let request = SummaryRequest::from(paper);
//!         let task = tokio::spawn(async move { digest.stream_summarize(&request, tx).await });
//!         while let Some(SummaryEvent::Update(partial)) = rx.recv().await {
//!             println!("{}", partial.title);
//!         }
//!         task.await??;
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod digest;
pub mod error;
pub mod formatters;
pub mod models;
pub mod server;
pub mod store;
pub mod summary;
pub mod throttle;

pub use client::ArxivClient;
pub use config::{Config, ProviderConfig};
pub use digest::PaperDigest;
pub use error::{RetrievalError, StoreError, SummaryError};
pub use models::{PaperPage, PaperRecord, SearchRequest, SummaryRequest, SummaryResult};
pub use summary::{SummaryEvent, SummaryPipeline};
