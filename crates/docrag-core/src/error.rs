use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing identity or invalid settings. Fails the current document only.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// An index or the embedding service could not be reached, after retries.
    #[error("Upstream unavailable: {what}: {reason}")]
    UpstreamUnavailable { what: String, reason: String },

    /// An upstream answered with an unexpected shape.
    #[error("Malformed response from {0}")]
    MalformedResponse(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Lexical index error: {0}")]
    Lexical(String),

    #[error("Vector index error: {0}")]
    Vector(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn upstream(what: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::UpstreamUnavailable { what: what.into(), reason: reason.to_string() }
    }

    /// Whether a bounded retry may clear this error. Identity and shape
    /// problems repeat on every attempt, so they fail immediately.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Configuration(_) | Self::MalformedResponse(_) | Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
