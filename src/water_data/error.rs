use polars::error::PolarsError;
use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The request never produced an HTTP response (connection refused, DNS,
/// TLS, timeout, broken body stream).
#[derive(Debug, Error)]
#[error("Network request failed for {url}")]
pub struct TransportError {
    pub url: String,
    #[source]
    pub source: BoxError,
}

impl TransportError {
    pub fn new(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            url: url.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed JSON document")]
    Json(#[from] serde_json::Error),

    #[error("Malformed RDB table")]
    Rdb(#[source] PolarsError),

    #[error("Failed to encode JSON for the cache")]
    JsonEncode(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Network(#[from] TransportError),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus { url: String, status: StatusCode },

    #[error("Failed to read cache file '{0}'")]
    CacheRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write cache file '{0}'")]
    CacheWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to move finished cache file into place at '{0}'")]
    CachePersist(PathBuf, #[source] std::io::Error),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Response from {url} could not be decoded")]
    Decode {
        url: String,
        #[source]
        source: DecodeError,
    },

    #[error("Cache file '{0}' could not be decoded")]
    CacheDecode(PathBuf, #[source] DecodeError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
