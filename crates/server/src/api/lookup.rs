//! DOI lookup API handler.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::warn;

use pass_download_core::{
    build_manifest, AcquisitionError, AcquisitionResult, Doi, FailureKind, Manifest,
    PipelineState,
};

use super::acquisition::DoiQuery;
use crate::state::AppState;

/// Resolve a DOI to its open-access locations without downloading anything.
///
/// Returns the manifest document of candidates. Failures use the same body
/// and status mapping as acquisitions.
pub async fn lookup(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DoiQuery>,
) -> Response {
    let raw = query.doi.unwrap_or_default();
    let doi = match Doi::parse(&raw) {
        Ok(doi) => doi,
        Err(e) => return failure(FailureKind::InvalidRequest, &raw, e.to_string()),
    };

    match state.lookup().lookup(&doi).await {
        Ok(manuscripts) if manuscripts.is_empty() => failure(
            FailureKind::NoOpenAccessLocation,
            doi.as_str(),
            format!("no open-access location for {}", doi),
        ),
        Ok(manuscripts) => Json(build_manifest(&manuscripts)).into_response(),
        Err(e) => {
            warn!(doi = %doi, "Lookup failed: {}", e);
            failure(FailureKind::from(&e), doi.as_str(), e.to_string())
        }
    }
}

fn failure(kind: FailureKind, doi: &str, message: String) -> Response {
    let error = AcquisitionError::new(kind, doi, PipelineState::Init, message);
    let result = AcquisitionResult::failed(&error, Manifest::empty());
    let status = StatusCode::from_u16(result.http_status()).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(result)).into_response()
}
