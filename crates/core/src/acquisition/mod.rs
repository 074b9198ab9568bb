//! DOI acquisition pipeline.
//!
//! The orchestrator drives each request through lookup, verification,
//! download and ingest. Requests for the same DOI share one execution:
//! - **Lookup**: resolve the DOI to its open-access manuscript candidates
//! - **Verify**: match the caller's URI against the candidates
//! - **Download**: fetch the selected manuscript's bytes
//! - **Ingest**: store the bytes in the repository and build the manifest

mod runner;
mod single_flight;
mod types;

pub use runner::{AcquisitionHandler, AcquisitionOrchestrator};
pub use single_flight::{CancelSignal, Flight, FlightInfo, SingleFlight};
pub use types::{
    AcquisitionError, AcquisitionRequest, AcquisitionResult, AcquisitionStatus, ErrorDetail,
    FailureKind, InFlightAcquisition, PipelineState,
};
