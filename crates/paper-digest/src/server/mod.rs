//! JSON-RPC server for a UI process.
//!
//! Methods: `papers/latest`, `papers/search`, `papers/get`, `summary/stream`,
//! `summary/cached`, `cache/stats`, `cache/clear`, `ping`.

pub mod rpc;
pub mod stdio;

use crate::digest::PaperDigest;

/// Stdio JSON-RPC server.
#[derive(Debug, Clone)]
pub struct DigestServer {
    digest: PaperDigest,
}

impl DigestServer {
    /// Create a server over a digest handle.
    #[must_use]
    pub const fn new(digest: PaperDigest) -> Self {
        Self { digest }
    }

    /// Run over stdin/stdout until stdin closes.
    ///
    /// # Errors
    ///
    /// Returns error on I/O failure.
    pub async fn run_stdio(self) -> anyhow::Result<()> {
        tracing::info!(
            provider = %self.digest.pipeline().provider().id,
            model = %self.digest.pipeline().provider().model,
            "Starting stdio server"
        );
        stdio::run_stdio(self.digest).await
    }

    /// Underlying digest handle.
    #[must_use]
    pub const fn digest(&self) -> &PaperDigest {
        &self.digest
    }
}
