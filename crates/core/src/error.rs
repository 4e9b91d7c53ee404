//! Unified error type for the bookshelf pipeline.
//!
//! Storage, broker, lookup, and blob failures all surface as an [`Error`]
//! so the nearest boundary (the HTTP error mapper for the web tier, the
//! worker's per-message dispatch for background work) can decide policy.

use thiserror::Error;

use crate::book::BookId;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the bookshelf pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// No book with this id exists in storage.
    #[error("book {0} not found")]
    BookNotFound(BookId),

    /// The volume lookup answered but returned no candidates.
    #[error("Not found")]
    NoVolumeMatch { query: String },

    /// The volume lookup answered with a non-200 status.
    #[error("Response returned {status}")]
    LookupStatus { status: u16 },

    /// The volume lookup could not be reached or decoded.
    #[error("lookup error: {0}")]
    Lookup(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("broker error: {0}")]
    Broker(String),

    /// Topic creation raced with another producer or worker.
    #[error("topic {0} already exists")]
    TopicExists(String),

    #[error("blob storage error: {0}")]
    Blob(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn broker(msg: impl Into<String>) -> Self {
        Self::Broker(msg.into())
    }

    pub fn blob(msg: impl Into<String>) -> Self {
        Self::Blob(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for both "no such book" and "the lookup found nothing".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BookNotFound(_) | Self::NoVolumeMatch { .. })
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::BookNotFound(_) => 404,
            Self::NoVolumeMatch { .. } => 404,
            Self::Validation(_) => 400,
            Self::Serialization(_) => 400,
            Self::LookupStatus { .. } => 502,
            Self::Lookup(_) => 502,
            Self::TopicExists(_) => 409,
            Self::Storage(_)
            | Self::Broker(_)
            | Self::Blob(_)
            | Self::Config(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for API error bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BookNotFound(_) | Self::NoVolumeMatch { .. } => "NOT_FOUND",
            Self::Validation(_) | Self::Serialization(_) => "INVALID",
            Self::LookupStatus { .. } | Self::Lookup(_) => "LOOKUP",
            Self::TopicExists(_) => "CONFLICT",
            Self::Storage(_) => "STORAGE",
            Self::Broker(_) => "BROKER",
            Self::Blob(_) => "BLOB",
            Self::Config(_) | Self::Internal(_) => "INTERNAL",
        }
    }
}
