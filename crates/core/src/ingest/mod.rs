//! Repository ingestion.
//!
//! The repository is consumed only through [`RepositoryIngest::post_binary`]:
//! hand over bytes plus minimal metadata, get back the canonical URI of the
//! stored object.

mod pass;

pub use pass::PassRepositoryClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata sent along with an ingested binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestMetadata {
    /// File name for the stored binary.
    pub name: String,
    /// MIME type of the binary.
    pub content_type: String,
    /// DOI the binary was acquired for.
    pub doi: String,
    /// Location the binary was downloaded from.
    pub source_location: String,
    /// Hex SHA-256 digest of the bytes.
    pub sha256: String,
}

/// Errors that can occur while storing a binary.
#[derive(Debug, Clone, Error)]
pub enum IngestError {
    /// Could not reach the repository.
    #[error("repository unreachable: {0}")]
    Transport(String),

    /// The repository refused the binary.
    #[error("repository rejected binary: {status} - {message}")]
    Rejected { status: u16, message: String },

    /// The repository accepted the binary but did not say where it is.
    #[error("repository response has no Location header")]
    MissingLocation,

    /// The stored URI is outside the configured base URLs.
    #[error("stored URI '{0}' must start with the internal or external base URL")]
    UnexpectedLocation(String),

    /// The repository did not answer in time.
    #[error("repository request timed out")]
    Timeout,
}

impl From<reqwest::Error> for IngestError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            IngestError::Timeout
        } else {
            IngestError::Transport(e.to_string())
        }
    }
}

/// Persists downloaded binaries.
#[async_trait]
pub trait RepositoryIngest: Send + Sync {
    /// Store `bytes` and return the canonical URI of the stored object.
    async fn post_binary(
        &self,
        bytes: Vec<u8>,
        metadata: &IngestMetadata,
    ) -> Result<String, IngestError>;
}
