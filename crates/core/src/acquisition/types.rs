//! Types for the acquisition pipeline.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::doi::Doi;
use crate::download::{DownloadError, DownloadFailureKind};
use crate::ingest::IngestError;
use crate::lookup::LookupError;
use crate::manifest::Manifest;

/// Pipeline states, in the order a successful acquisition passes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineState {
    #[default]
    Init,
    LookedUp,
    Verified,
    Downloaded,
    Ingested,
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::LookedUp => "lookedUp",
            Self::Verified => "verified",
            Self::Downloaded => "downloaded",
            Self::Ingested => "ingested",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Why an acquisition failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FailureKind {
    DoiNotFound,
    NoOpenAccessLocation,
    LookupUnavailable,
    Mismatched,
    Ambiguous,
    DownloadFailed { reason: DownloadFailureKind },
    IngestFailed,
    Timeout,
    InvalidRequest,
    /// Every waiting caller went away, or the acquisition was cancelled.
    Cancelled,
}

impl FailureKind {
    /// HTTP status the service answers with for this failure.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest => 400,
            Self::DoiNotFound | Self::NoOpenAccessLocation => 404,
            Self::Mismatched | Self::Ambiguous => 409,
            Self::LookupUnavailable | Self::DownloadFailed { .. } | Self::IngestFailed => 502,
            Self::Cancelled => 503,
            Self::Timeout => 504,
        }
    }

    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DoiNotFound => "doi_not_found",
            Self::NoOpenAccessLocation => "no_open_access_location",
            Self::LookupUnavailable => "lookup_unavailable",
            Self::Mismatched => "mismatched",
            Self::Ambiguous => "ambiguous",
            Self::DownloadFailed { .. } => "download_failed",
            Self::IngestFailed => "ingest_failed",
            Self::Timeout => "timeout",
            Self::InvalidRequest => "invalid_request",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<&LookupError> for FailureKind {
    fn from(e: &LookupError) -> Self {
        match e {
            LookupError::DoiNotFound(_) => Self::DoiNotFound,
            LookupError::NoOpenAccessLocation(_) => Self::NoOpenAccessLocation,
            LookupError::Timeout => Self::Timeout,
            LookupError::Transport(_)
            | LookupError::ProviderError { .. }
            | LookupError::ParseError(_) => Self::LookupUnavailable,
        }
    }
}

impl From<&DownloadError> for FailureKind {
    fn from(e: &DownloadError) -> Self {
        match e {
            DownloadError::Timeout(_) => Self::Timeout,
            other => Self::DownloadFailed {
                reason: other.failure_kind(),
            },
        }
    }
}

impl From<&IngestError> for FailureKind {
    fn from(e: &IngestError) -> Self {
        match e {
            IngestError::Timeout => Self::Timeout,
            _ => Self::IngestFailed,
        }
    }
}

/// A failed acquisition, tagged with the DOI and the state reached.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("acquisition of {doi} failed in state {state}: {message}")]
pub struct AcquisitionError {
    pub kind: FailureKind,
    pub doi: String,
    pub state: PipelineState,
    pub message: String,
}

impl AcquisitionError {
    pub fn new(
        kind: FailureKind,
        doi: impl Into<String>,
        state: PipelineState,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            doi: doi.into(),
            state,
            message: message.into(),
        }
    }
}

/// A validated acquisition request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionRequest {
    pub doi: Doi,
    pub candidate_uri: Option<String>,
}

impl AcquisitionRequest {
    /// Validate raw request input. A malformed DOI is rejected here, before
    /// any network call.
    pub fn parse(doi: &str, candidate_uri: Option<String>) -> Result<Self, AcquisitionError> {
        let parsed = Doi::parse(doi).map_err(|e| {
            AcquisitionError::new(
                FailureKind::InvalidRequest,
                doi.trim(),
                PipelineState::Init,
                e.to_string(),
            )
        })?;

        Ok(Self {
            doi: parsed,
            candidate_uri: candidate_uri
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
        })
    }
}

/// Terminal status of an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AcquisitionStatus {
    Done,
    Failed,
}

/// Serializable failure description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(flatten)]
    pub kind: FailureKind,
    pub doi: String,
    pub state: PipelineState,
    pub message: String,
}

impl From<&AcquisitionError> for ErrorDetail {
    fn from(e: &AcquisitionError) -> Self {
        Self {
            kind: e.kind,
            doi: e.doi.clone(),
            state: e.state,
            message: e.message.clone(),
        }
    }
}

/// Result returned to callers once a pipeline reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquisitionResult {
    pub status: AcquisitionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Manifest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl AcquisitionResult {
    pub fn done(stored_uri: impl Into<String>, manifest: Manifest) -> Self {
        Self {
            status: AcquisitionStatus::Done,
            stored_uri: Some(stored_uri.into()),
            manifest: Some(manifest),
            error: None,
        }
    }

    pub fn failed(error: &AcquisitionError, manifest: Manifest) -> Self {
        Self {
            status: AcquisitionStatus::Failed,
            stored_uri: None,
            manifest: Some(manifest),
            error: Some(ErrorDetail::from(error)),
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == AcquisitionStatus::Done
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// HTTP status for this result.
    pub fn http_status(&self) -> u16 {
        match &self.error {
            None => 200,
            Some(detail) => detail.kind.http_status(),
        }
    }
}

/// An acquisition currently executing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InFlightAcquisition {
    /// Case-folded DOI the execution is keyed by.
    pub doi: String,
    pub started_at: DateTime<Utc>,
    /// Callers currently waiting on the result.
    pub waiters: usize,
}
