//! Error types for the talk generation pipeline.

use thiserror::Error;

/// Talk pipeline error type.
#[derive(Debug, Error)]
pub enum TalkError {
    /// Required configuration is missing or invalid (e.g. no API key).
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Request input is outside its documented bounds.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The completion call failed, timed out, or returned a non-success status.
    #[error("generation failed: {0}")]
    Generation(String),
    /// The completion call succeeded but carried no content.
    #[error("generation returned empty content")]
    EmptyCompletion,
    /// The completion payload is not valid JSON.
    #[error("malformed response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
    /// The completion payload does not conform to the output schema.
    #[error("schema violation at {path}: {reason}")]
    SchemaViolation {
        /// JSON pointer of the offending node.
        path: String,
        /// What was wrong with it.
        reason: String,
    },
    /// HTTP client error.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl TalkError {
    /// Build a schema violation for `path`.
    #[must_use]
    pub fn schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience result alias for talk operations.
pub type TalkResult<T> = Result<T, TalkError>;
