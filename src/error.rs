//! Error types for batch image generation.

use std::time::Duration;

/// Errors that can occur while editing images or expanding prompts.
#[derive(Debug, thiserror::Error)]
pub enum MultiGenError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code returned by the service.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Server-suggested wait before the next request, if provided.
        retry_after: Option<Duration>,
    },

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// The remote call succeeded but the response carried no usable image.
    #[error("no image in response: {0}")]
    NoImage(String),

    /// The prompt list exceeds the configured maximum.
    #[error("too many prompts: {count} (maximum {max})")]
    TooManyPrompts {
        /// Number of non-empty prompts found in the input.
        count: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 or data-URI encoded image data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., reading the reference image, saving a result).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for batch image generation operations.
pub type Result<T> = std::result::Result<T, MultiGenError>;

/// Extracts a human-readable message from a raw error response body.
///
/// Services typically wrap the message in `{"error": {"message": ...}}`;
/// when the body is not JSON the raw text is kept. The result is collapsed
/// to a single line and truncated so it can be shown to the user directly.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    const MAX_LEN: usize = 300;

    let message = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| {
            v.get("error")?
                .get("message")?
                .as_str()
                .map(collapse_whitespace)
        })
        .unwrap_or_else(|| collapse_whitespace(text));

    if message.chars().count() > MAX_LEN {
        let truncated: String = message.chars().take(MAX_LEN).collect();
        format!("{truncated}...")
    } else {
        message
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses a `Retry-After` header value as whole seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
