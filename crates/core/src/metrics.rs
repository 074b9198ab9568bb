//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Acquisition pipeline outcomes and durations
//! - Retries of lookup and download calls
//! - Downloaded volume
//! - Single-flight coalescing

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

// =============================================================================
// Acquisition Metrics
// =============================================================================

/// Acquisitions total by result.
pub static ACQUISITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pass_download_acquisitions_total",
            "Total acquisition pipelines that reached a terminal state",
        ),
        &["result"], // "done" or a failure kind
    )
    .unwrap()
});

/// Acquisition duration in seconds.
pub static ACQUISITION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pass_download_acquisition_duration_seconds",
            "Duration of acquisition pipelines",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["result"],
    )
    .unwrap()
});

/// Callers that joined an already running pipeline.
pub static SINGLE_FLIGHT_JOINS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pass_download_single_flight_joins_total",
        "Requests coalesced into an in-flight pipeline for the same DOI",
    )
    .unwrap()
});

// =============================================================================
// Network Metrics
// =============================================================================

/// Retries of transient failures by operation.
pub static RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pass_download_retries_total",
            "Retries after transient network failures",
        ),
        &["operation"], // "lookup", "download"
    )
    .unwrap()
});

/// Bytes of manuscript content downloaded.
pub static DOWNLOADED_BYTES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pass_download_downloaded_bytes_total",
        "Total bytes of manuscript content downloaded",
    )
    .unwrap()
});

/// Register all core metrics with a registry.
pub fn register_core_metrics(registry: &Registry) {
    registry.register(Box::new(ACQUISITIONS.clone())).ok();
    registry.register(Box::new(ACQUISITION_DURATION.clone())).ok();
    registry.register(Box::new(SINGLE_FLIGHT_JOINS.clone())).ok();
    registry.register(Box::new(RETRIES.clone())).ok();
    registry.register(Box::new(DOWNLOADED_BYTES.clone())).ok();
}
