//! Acquisition orchestrator implementation.
//!
//! Drives a DOI through the pipeline:
//! Init -> LookedUp -> Verified -> Downloaded -> Ingested -> Done
//!
//! Any step may instead end the pipeline in Failed. Requests for the same
//! DOI (case-insensitive) share one execution.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::AcquisitionConfig;
use crate::doi::Doi;
use crate::download::Downloader;
use crate::ingest::{IngestMetadata, RepositoryIngest};
use crate::lookup::{file_name_from_location, LookupClient};
use crate::manifest::{Manifest, ManifestBuilder};
use crate::manuscript::{Manuscript, ManuscriptSet};
use crate::metrics::{ACQUISITIONS, ACQUISITION_DURATION, SINGLE_FLIGHT_JOINS};
use crate::verify::{verify, MatchResult};

use super::single_flight::{CancelSignal, SingleFlight};
use super::types::{
    AcquisitionError, AcquisitionRequest, AcquisitionResult, FailureKind, InFlightAcquisition,
    PipelineState,
};

/// Handles acquisition requests.
#[async_trait]
pub trait AcquisitionHandler: Send + Sync {
    /// Run (or join) the acquisition for a request and wait for its result.
    async fn handle(&self, request: AcquisitionRequest) -> AcquisitionResult;
}

/// The acquisition orchestrator.
pub struct AcquisitionOrchestrator {
    config: AcquisitionConfig,
    lookup: Arc<dyn LookupClient>,
    downloader: Arc<dyn Downloader>,
    repository: Arc<dyn RepositoryIngest>,
    flights: SingleFlight<Outcome>,
}

impl AcquisitionOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: AcquisitionConfig,
        lookup: Arc<dyn LookupClient>,
        downloader: Arc<dyn Downloader>,
        repository: Arc<dyn RepositoryIngest>,
    ) -> Self {
        Self {
            config,
            lookup,
            downloader,
            repository,
            flights: SingleFlight::new(),
        }
    }

    /// Acquire the manuscript for a request.
    ///
    /// Joins the running execution if one exists for the same DOI. A joiner's
    /// candidate URI is verified against that execution's candidates and
    /// must select the same location it downloads.
    pub async fn acquire(&self, request: AcquisitionRequest) -> AcquisitionResult {
        let key = request.doi.key();

        loop {
            let pipeline = Pipeline {
                lookup: Arc::clone(&self.lookup),
                downloader: Arc::clone(&self.downloader),
                repository: Arc::clone(&self.repository),
                timeout: self.config.pipeline_timeout(),
                request: request.clone(),
            };

            let flight = self
                .flights
                .run(&key, move |cancel| pipeline.execute(cancel))
                .await;

            let Some(outcome) = flight.value else {
                warn!(doi = %request.doi, "Acquisition ended without a result");
                let error = AcquisitionError::new(
                    FailureKind::Cancelled,
                    request.doi.as_str(),
                    PipelineState::Init,
                    "acquisition aborted",
                );
                return AcquisitionResult::failed(&error, Manifest::empty());
            };

            if !flight.joined {
                return outcome.result;
            }

            SINGLE_FLIGHT_JOINS.inc();
            debug!(doi = %request.doi, "Joined in-flight acquisition");

            match reconcile(&request, outcome) {
                Joined::Shared(result) => return result,
                Joined::Rerun => {
                    debug!(
                        doi = %request.doi,
                        "Joined execution rejected its candidate URI, starting a new one"
                    );
                }
            }
        }
    }

    /// Cancel the running acquisition for a DOI.
    ///
    /// Waiters receive a `Cancelled` failure. Returns false if nothing was
    /// running.
    pub fn cancel(&self, doi: &Doi) -> bool {
        let cancelled = self.flights.cancel(&doi.key());
        if cancelled {
            info!(doi = %doi, "Cancelled in-flight acquisition");
        }
        cancelled
    }

    /// Snapshot of running acquisitions.
    pub fn in_flight(&self) -> Vec<InFlightAcquisition> {
        self.flights
            .in_flight()
            .into_iter()
            .map(|f| InFlightAcquisition {
                doi: f.key,
                started_at: f.started_at,
                waiters: f.waiters,
            })
            .collect()
    }
}

#[async_trait]
impl AcquisitionHandler for AcquisitionOrchestrator {
    async fn handle(&self, request: AcquisitionRequest) -> AcquisitionResult {
        self.acquire(request).await
    }
}

// =============================================================================
// Joining
// =============================================================================

/// What one execution produced, shared with every caller that waited on it.
#[derive(Clone)]
struct Outcome {
    result: AcquisitionResult,
    /// Candidates resolved by lookup, if it completed.
    candidates: Option<ManuscriptSet>,
    /// Location chosen by verification, if it passed.
    selected: Option<Manuscript>,
}

enum Joined {
    Shared(AcquisitionResult),
    /// The shared execution failed verification on its own candidate URI
    /// while this caller's URI selects a location.
    Rerun,
}

/// Apply a joiner's own verification to a shared outcome.
///
/// A joiner without a candidate URI accepts whichever location the execution
/// chose.
fn reconcile(request: &AcquisitionRequest, outcome: Outcome) -> Joined {
    let Some(candidates) = outcome.candidates else {
        return Joined::Shared(outcome.result);
    };

    let uri = request.candidate_uri.as_deref();
    let own = verify(uri, &candidates);

    match (own, outcome.selected.as_ref()) {
        (MatchResult::NoCandidateUri(_), Some(_)) => Joined::Shared(outcome.result),
        (MatchResult::Matched(mine), Some(chosen)) if mine.location() == chosen.location() => {
            Joined::Shared(outcome.result)
        }
        (MatchResult::Matched(_), Some(chosen)) => Joined::Shared(joiner_failure(
            request,
            &candidates,
            FailureKind::Mismatched,
            format!(
                "{} does not match {}, already being acquired",
                uri.unwrap_or("-"),
                chosen.location()
            ),
        )),
        (MatchResult::Matched(_) | MatchResult::NoCandidateUri(_), None) => {
            match outcome.result.failure_kind() {
                Some(FailureKind::Mismatched | FailureKind::Ambiguous) => Joined::Rerun,
                _ => Joined::Shared(outcome.result),
            }
        }
        (MatchResult::Mismatched, _) => Joined::Shared(joiner_failure(
            request,
            &candidates,
            FailureKind::Mismatched,
            format!("no resolved location matches {}", uri.unwrap_or("-")),
        )),
        (MatchResult::Ambiguous, _) => Joined::Shared(joiner_failure(
            request,
            &candidates,
            FailureKind::Ambiguous,
            format!("several resolved locations match {}", uri.unwrap_or("-")),
        )),
    }
}

fn joiner_failure(
    request: &AcquisitionRequest,
    candidates: &ManuscriptSet,
    kind: FailureKind,
    message: String,
) -> AcquisitionResult {
    warn!(doi = %request.doi, kind = kind.label(), "Joined acquisition rejected: {}", message);
    ACQUISITIONS.with_label_values(&[kind.label()]).inc();
    let error = AcquisitionError::new(kind, request.doi.as_str(), PipelineState::LookedUp, message);
    let manifest = ManifestBuilder::new().with_manuscripts(candidates).build();
    AcquisitionResult::failed(&error, manifest)
}

// =============================================================================
// Pipeline
// =============================================================================

/// State reached so far, readable after the pipeline future is dropped.
#[derive(Default)]
struct Progress {
    inner: Mutex<ProgressInner>,
}

#[derive(Default)]
struct ProgressInner {
    state: PipelineState,
    manuscripts: Option<ManuscriptSet>,
    selected: Option<Manuscript>,
}

impl Progress {
    fn state(&self) -> PipelineState {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    fn advance(&self, state: PipelineState) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).state = state;
        debug!(state = %state, "Pipeline advanced");
    }

    fn looked_up(&self, manuscripts: ManuscriptSet) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.manuscripts = Some(manuscripts);
        inner.state = PipelineState::LookedUp;
    }

    fn verified(&self, manuscript: Manuscript) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.selected = Some(manuscript);
        inner.state = PipelineState::Verified;
        debug!(state = %PipelineState::Verified, "Pipeline advanced");
    }

    fn into_parts(self) -> (Option<ManuscriptSet>, Option<Manuscript>) {
        let inner = self.inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        (inner.manuscripts, inner.selected)
    }

    /// Manifest reported with a failure: resolved candidates, or empty if
    /// lookup never completed.
    fn partial_manifest(&self) -> Manifest {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match &inner.manuscripts {
            Some(set) => ManifestBuilder::new().with_manuscripts(set).build(),
            None => Manifest::empty(),
        }
    }
}

struct Pipeline {
    lookup: Arc<dyn LookupClient>,
    downloader: Arc<dyn Downloader>,
    repository: Arc<dyn RepositoryIngest>,
    timeout: std::time::Duration,
    request: AcquisitionRequest,
}

impl Pipeline {
    async fn execute(self, cancel: CancelSignal) -> Outcome {
        let execution_id = Uuid::new_v4();
        let span = info_span!(
            "acquisition",
            doi = %self.request.doi,
            execution_id = %execution_id,
        );

        async move {
            info!(
                candidate_uri = self.request.candidate_uri.as_deref().unwrap_or("-"),
                "Starting acquisition"
            );
            let started = Instant::now();
            let progress = Progress::default();

            let outcome = tokio::select! {
                outcome = tokio::time::timeout(self.timeout, self.run(&progress)) => match outcome {
                    Ok(outcome) => outcome,
                    Err(_) => Err(self.failure(
                        &progress,
                        FailureKind::Timeout,
                        format!("pipeline exceeded {}s", self.timeout.as_secs()),
                    )),
                },
                _ = cancel.cancelled() => Err(self.failure(
                    &progress,
                    FailureKind::Cancelled,
                    "acquisition cancelled",
                )),
            };

            let (result, label) = match outcome {
                Ok((stored_uri, manifest)) => {
                    info!(stored_uri = %stored_uri, "Acquisition done");
                    (AcquisitionResult::done(stored_uri, manifest), "done")
                }
                Err(error) => {
                    warn!(
                        kind = error.kind.label(),
                        state = %error.state,
                        "Acquisition failed: {}",
                        error.message
                    );
                    (
                        AcquisitionResult::failed(&error, progress.partial_manifest()),
                        error.kind.label(),
                    )
                }
            };

            ACQUISITIONS.with_label_values(&[label]).inc();
            ACQUISITION_DURATION
                .with_label_values(&[label])
                .observe(started.elapsed().as_secs_f64());

            let (candidates, selected) = progress.into_parts();
            Outcome {
                result,
                candidates,
                selected,
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, progress: &Progress) -> Result<(String, Manifest), AcquisitionError> {
        let doi = &self.request.doi;

        // Init -> LookedUp
        let manuscripts = self
            .lookup
            .lookup(doi)
            .await
            .map_err(|e| self.failure(progress, FailureKind::from(&e), e.to_string()))?;
        if manuscripts.is_empty() {
            return Err(self.failure(
                progress,
                FailureKind::NoOpenAccessLocation,
                format!("no open-access location for {}", doi),
            ));
        }
        info!(
            provider = self.lookup.name(),
            candidates = manuscripts.len(),
            "DOI resolved"
        );
        progress.looked_up(manuscripts.clone());

        // LookedUp -> Verified
        let candidate_uri = self.request.candidate_uri.as_deref();
        let manuscript = match verify(candidate_uri, &manuscripts) {
            MatchResult::Matched(m) => m,
            MatchResult::NoCandidateUri(m) => {
                debug!(location = %m.location(), "No candidate URI, using first location");
                m
            }
            MatchResult::Mismatched => {
                return Err(self.failure(
                    progress,
                    FailureKind::Mismatched,
                    format!(
                        "no resolved location matches {}",
                        candidate_uri.unwrap_or("-")
                    ),
                ));
            }
            MatchResult::Ambiguous => {
                return Err(self.failure(
                    progress,
                    FailureKind::Ambiguous,
                    format!(
                        "several resolved locations match {}",
                        candidate_uri.unwrap_or("-")
                    ),
                ));
            }
        };
        progress.verified(manuscript.clone());

        // Verified -> Downloaded
        let downloaded = self
            .downloader
            .fetch(&manuscript)
            .await
            .map_err(|e| self.failure(progress, FailureKind::from(&e), e.to_string()))?;
        progress.advance(PipelineState::Downloaded);

        // Downloaded -> Ingested
        let name = if manuscript.name().is_empty() {
            file_name_from_location(manuscript.location())
        } else {
            manuscript.name().to_string()
        };
        let sha256 = format!("{:x}", Sha256::digest(&downloaded.bytes));
        info!(
            location = %manuscript.location(),
            bytes = downloaded.bytes.len(),
            sha256 = %sha256,
            "Manuscript downloaded"
        );
        let metadata = IngestMetadata {
            name,
            content_type: downloaded.content_type,
            doi: doi.to_string(),
            source_location: manuscript.location().to_string(),
            sha256,
        };
        let stored_uri = self
            .repository
            .post_binary(downloaded.bytes, &metadata)
            .await
            .map_err(|e| self.failure(progress, FailureKind::from(&e), e.to_string()))?;
        progress.advance(PipelineState::Ingested);

        // Ingested -> Done
        let manifest = ManifestBuilder::new()
            .with_manuscripts(&manuscripts)
            .with_stored_uri(&stored_uri)
            .build();
        progress.advance(PipelineState::Done);

        Ok((stored_uri, manifest))
    }

    fn failure(
        &self,
        progress: &Progress,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> AcquisitionError {
        AcquisitionError::new(kind, self.request.doi.as_str(), progress.state(), message)
    }
}
