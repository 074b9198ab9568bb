//! Manuscript content download.
//!
//! This module provides the `Downloader` trait and an HTTP implementation
//! that fetches a manuscript's bytes with:
//!
//! - Bounded retry with exponential backoff on connection errors and 5xx
//! - No retry on 4xx
//! - A response size ceiling enforced while streaming
//! - Content-type validation against the manuscript's declared type
//!
//! Dropping the future returned by [`Downloader::fetch`] aborts the transfer
//! and discards any partial body.

mod http;

pub use http::HttpDownloader;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::manuscript::Manuscript;
use crate::retry::Retryable;

/// Manuscript content fetched from its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub bytes: Vec<u8>,
    /// Content type to store the bytes under.
    pub content_type: String,
}

/// Coarse class of a download failure, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DownloadFailureKind {
    Transient,
    Permanent,
    TooLarge,
}

/// Errors that can occur while downloading a manuscript.
#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    /// Connection could not be established or broke mid-transfer.
    #[error("connection failed fetching {url}: {message}")]
    Connection { url: String, message: String },

    /// The server answered 5xx.
    #[error("server error {status} fetching {url}")]
    ServerError { status: u16, url: String },

    /// The server answered with a non-retryable status (4xx and others).
    #[error("request rejected with {status} fetching {url}")]
    Rejected { status: u16, url: String },

    /// Redirect limit exceeded.
    #[error("too many redirects fetching {0}")]
    TooManyRedirects(String),

    /// The location is not a fetchable URL.
    #[error("invalid manuscript location: {0}")]
    InvalidLocation(String),

    /// The response type does not match the manuscript's declared type.
    #[error("unexpected content type '{actual}', expected '{expected}'")]
    ContentTypeMismatch { expected: String, actual: String },

    /// The body exceeds the configured ceiling.
    #[error("response exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    /// The server did not answer in time.
    #[error("download timed out fetching {0}")]
    Timeout(String),
}

impl DownloadError {
    /// Failure class reported to callers. Timeouts are reported separately.
    pub fn failure_kind(&self) -> DownloadFailureKind {
        match self {
            Self::Connection { .. } | Self::ServerError { .. } | Self::Timeout(_) => {
                DownloadFailureKind::Transient
            }
            Self::TooLarge { .. } => DownloadFailureKind::TooLarge,
            Self::Rejected { .. }
            | Self::TooManyRedirects(_)
            | Self::InvalidLocation(_)
            | Self::ContentTypeMismatch { .. } => DownloadFailureKind::Permanent,
        }
    }
}

impl Retryable for DownloadError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::ServerError { .. })
    }
}

/// Fetches manuscript content.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Fetch the bytes at `manuscript.location()`.
    async fn fetch(&self, manuscript: &Manuscript) -> Result<Downloaded, DownloadError>;
}
