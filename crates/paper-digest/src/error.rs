//! Error types for the paper digest client.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use std::time::Duration;

/// Errors from the retrieval gateway.
#[derive(thiserror::Error, Debug)]
pub enum RetrievalError {
    /// Service temporarily unable to serve the request (503/429).
    #[error("Service overloaded ({status}), retry after {retry_after:?}")]
    Overloaded {
        /// HTTP status code
        status: u16,
        /// Suggested wait time from `Retry-After`, if any
        retry_after: Option<Duration>,
    },

    /// Endpoint could not be reached at all (connect failure, DNS, timeout).
    #[error("Endpoint unreachable: {0}")]
    Connectivity(String),

    /// Response did not have the expected document shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Non-retryable HTTP status.
    #[error("Unexpected status {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },

    /// Other HTTP transport error (body decoding, request building).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl RetrievalError {
    /// Create an overload error.
    #[must_use]
    pub const fn overloaded(status: u16, retry_after: Option<Duration>) -> Self {
        Self::Overloaded { status, retry_after }
    }

    /// Create a malformed response error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Create a status error.
    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status { status, message: message.into() }
    }

    /// Classify a transport failure: connect and timeout errors mean the
    /// endpoint is unreachable, everything else is a plain HTTP error.
    #[must_use]
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Connectivity(err.to_string())
        } else {
            Self::Http(err)
        }
    }

    /// Returns true if the cooldown-and-retry policy applies.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Overloaded { .. } | Self::Connectivity(_))
    }

    /// Returns true if a fallback endpoint should be tried.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }

    /// HTTP status carried by this error, if any.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Overloaded { status, .. } | Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short machine-readable classification.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Overloaded { .. } => "overloaded",
            Self::Connectivity(_) => "connectivity",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Status { .. } => "status",
            Self::Http(_) => "http",
        }
    }
}

/// Errors from the streaming summary pipeline.
#[derive(thiserror::Error, Debug)]
pub enum SummaryError {
    /// No API key configured for the provider.
    #[error("No API key configured for provider '{provider}'")]
    MissingCredential {
        /// Provider identifier
        provider: String,
    },

    /// Provider cannot stream responses.
    #[error("Provider '{provider}' does not support streaming")]
    StreamingUnsupported {
        /// Provider identifier
        provider: String,
    },

    /// Provider rejected the request.
    #[error("Provider error ({status}): {message}")]
    Provider {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Transport failed before or during the stream.
    #[error("Stream transport failed: {0}")]
    Transport(String),

    /// The completed stream never yielded a recognizable field.
    #[error("Summary stream ended without any recognizable field")]
    ParseIncomplete,

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SummaryError {
    /// Returns true for failures detected before any request was sent.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(self, Self::MissingCredential { .. } | Self::StreamingUnsupported { .. })
    }

    /// Short machine-readable classification.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential { .. } | Self::StreamingUnsupported { .. } => {
                "precondition_unmet"
            }
            Self::Provider { .. } => "provider",
            Self::Transport(_) => "transport",
            Self::ParseIncomplete => "parse_incomplete",
            Self::Serialization(_) => "serialization",
        }
    }
}

impl From<reqwest::Error> for SummaryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Errors from the key-value persistence surface.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Filesystem error
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value could not be (de)serialized
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key contains characters that cannot be mapped to a file name
    #[error("Invalid store key: {0}")]
    InvalidKey(String),
}

/// Result type alias for retrieval operations.
pub type RetrievalResult<T> = Result<T, RetrievalError>;

/// Result type alias for summary pipeline operations.
pub type PipelineResult<T> = Result<T, SummaryError>;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_error_retryable() {
        assert!(RetrievalError::overloaded(503, None).is_retryable());
        assert!(RetrievalError::Connectivity("refused".into()).is_retryable());

        assert!(!RetrievalError::malformed("not a feed").is_retryable());
        assert!(!RetrievalError::status(400, "bad query").is_retryable());
    }

    #[test]
    fn test_only_connectivity_triggers_fallback() {
        assert!(RetrievalError::Connectivity("refused".into()).is_connectivity());
        assert!(!RetrievalError::overloaded(503, None).is_connectivity());
    }

    #[test]
    fn test_status_code() {
        assert_eq!(RetrievalError::overloaded(429, None).status_code(), Some(429));
        assert_eq!(RetrievalError::status(404, "gone").status_code(), Some(404));
        assert_eq!(RetrievalError::malformed("x").status_code(), None);
    }

    #[test]
    fn test_summary_error_kinds() {
        let err = SummaryError::MissingCredential { provider: "openai".into() };
        assert!(err.is_precondition());
        assert_eq!(err.kind(), "precondition_unmet");
        assert!(err.to_string().contains("openai"));

        assert!(!SummaryError::ParseIncomplete.is_precondition());
        assert_eq!(SummaryError::Transport("reset".into()).kind(), "transport");
    }
}
