//! Acquisition API handlers.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use pass_download_core::{
    AcquisitionError, AcquisitionRequest, AcquisitionResult, Doi, FailureKind,
    InFlightAcquisition, Manifest, PipelineState,
};

use crate::state::AppState;

/// Request body for starting an acquisition.
#[derive(Debug, Deserialize)]
pub struct AcquisitionRequestBody {
    pub doi: String,
    #[serde(default, rename = "candidateUri")]
    pub candidate_uri: Option<String>,
}

/// Run (or join) the acquisition of a DOI and wait for its result.
///
/// The status code follows the result: 200 when done, otherwise the failure
/// kind's mapping. Dropping the connection withdraws this caller; the
/// pipeline stops once no caller is left.
pub async fn acquire(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AcquisitionRequestBody>, JsonRejection>,
) -> impl IntoResponse {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            debug!("Rejected acquisition request: {}", rejection.body_text());
            return invalid_request("", rejection.body_text());
        }
    };

    let request = match AcquisitionRequest::parse(&body.doi, body.candidate_uri) {
        Ok(request) => request,
        Err(e) => return result_response(AcquisitionResult::failed(&e, Manifest::empty())),
    };

    let result = state.acquisitions().handle(request).await;
    result_response(result)
}

/// Response for the in-flight listing.
#[derive(Debug, Serialize)]
pub struct InFlightResponse {
    pub acquisitions: Vec<InFlightAcquisition>,
    pub count: usize,
}

/// List executing pipelines.
pub async fn list_in_flight(State(state): State<Arc<AppState>>) -> Json<InFlightResponse> {
    let acquisitions = state.orchestrator().in_flight();
    Json(InFlightResponse {
        count: acquisitions.len(),
        acquisitions,
    })
}

/// Query parameters identifying an acquisition.
#[derive(Debug, Deserialize)]
pub struct DoiQuery {
    pub doi: Option<String>,
}

/// Cancel the executing pipeline for a DOI.
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DoiQuery>,
) -> impl IntoResponse {
    let raw = query.doi.unwrap_or_default();
    let doi = match Doi::parse(&raw) {
        Ok(doi) => doi,
        Err(e) => return invalid_request(&raw, e.to_string()).into_response(),
    };

    if state.orchestrator().cancel(&doi) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": format!("no acquisition in flight for {}", doi)
            })),
        )
            .into_response()
    }
}

fn invalid_request(
    doi: &str,
    message: impl Into<String>,
) -> (StatusCode, HeaderMap, Json<AcquisitionResult>) {
    let error = AcquisitionError::new(
        FailureKind::InvalidRequest,
        doi,
        PipelineState::Init,
        message,
    );
    result_response(AcquisitionResult::failed(&error, Manifest::empty()))
}

fn result_response(result: AcquisitionResult) -> (StatusCode, HeaderMap, Json<AcquisitionResult>) {
    let status = StatusCode::from_u16(result.http_status()).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut headers = HeaderMap::new();
    if let Some(uri) = result.stored_uri.as_deref() {
        match HeaderValue::from_str(uri) {
            Ok(value) => {
                headers.insert(header::LOCATION, value);
            }
            Err(_) => warn!(stored_uri = %uri, "Stored URI is not a valid header value"),
        }
    }

    (status, headers, Json(result))
}
