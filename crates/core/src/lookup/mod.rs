//! DOI lookup against an external bibliographic provider.
//!
//! A [`LookupClient`] turns a DOI into the provider's ordered list of
//! open-access manuscript candidates. The order returned is the provider's
//! preference and is never changed downstream.

mod unpaywall;

pub use unpaywall::{file_name_from_location, UnpaywallClient, UNPAYWALL_SOURCE};

use async_trait::async_trait;
use thiserror::Error;

use crate::doi::Doi;
use crate::manuscript::ManuscriptSet;
use crate::retry::Retryable;

/// Errors that can occur when looking up a DOI.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    /// The provider has no record for the DOI.
    #[error("DOI not found: {0}")]
    DoiNotFound(String),

    /// A record exists but carries no usable manuscript location.
    #[error("no open access location for DOI: {0}")]
    NoOpenAccessLocation(String),

    /// Could not reach the provider.
    #[error("lookup provider unreachable: {0}")]
    Transport(String),

    /// The provider answered with an error status.
    #[error("lookup provider error: {status} - {message}")]
    ProviderError { status: u16, message: String },

    /// The provider's response could not be parsed.
    #[error("failed to parse lookup response: {0}")]
    ParseError(String),

    /// The provider did not answer in time.
    #[error("lookup timed out")]
    Timeout,
}

impl Retryable for LookupError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::ProviderError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LookupError::Timeout
        } else if e.is_decode() {
            LookupError::ParseError(e.to_string())
        } else {
            LookupError::Transport(e.to_string())
        }
    }
}

/// Resolves a DOI to its open-access manuscript candidates.
#[async_trait]
pub trait LookupClient: Send + Sync {
    /// Name of the provider, recorded as each manuscript's source.
    fn name(&self) -> &str;

    /// Look up the candidates for a DOI, in provider order.
    ///
    /// Fails with [`LookupError::NoOpenAccessLocation`] rather than
    /// returning an empty set.
    async fn lookup(&self, doi: &Doi) -> Result<ManuscriptSet, LookupError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LookupError::Transport("reset".to_string()).is_transient());
        assert!(LookupError::ProviderError {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(!LookupError::ProviderError {
            status: 422,
            message: String::new()
        }
        .is_transient());
        assert!(!LookupError::DoiNotFound("10.1/x".to_string()).is_transient());
        assert!(!LookupError::Timeout.is_transient());
    }
}
