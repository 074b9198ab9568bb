//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the lookup, download and
//! repository traits, so the acquisition pipeline can be exercised without
//! real infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use pass_download_core::testing::{fixtures, MockDownloader, MockLookupClient, MockRepository};
//!
//! let lookup = MockLookupClient::new();
//! let downloader = MockDownloader::new();
//! let repository = MockRepository::new();
//!
//! // Configure mock responses
//! lookup.set_manuscripts(fixtures::DOI, fixtures::manuscripts(&[fixtures::LOCATION])).await;
//! downloader.set_delay(Duration::from_millis(100)).await;
//!
//! // Use in AcquisitionOrchestrator::new(...)
//! ```

mod mock_downloader;
mod mock_lookup;
mod mock_repository;

pub use mock_downloader::MockDownloader;
pub use mock_lookup::{MockLookupClient, RecordedLookup};
pub use mock_repository::{MockRepository, RecordedIngest, MOCK_REPOSITORY_BASE};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::config::AcquisitionConfig;
    use crate::manuscript::{Manuscript, ManuscriptSet, PDF_MIME_TYPE};

    /// A well-formed DOI.
    pub const DOI: &str = "10.1234/abcd.5678";

    /// A manuscript location for [`DOI`].
    pub const LOCATION: &str = "http://repo.example.org/papers/abcd.pdf";

    /// Create a PDF manuscript record for a location.
    pub fn manuscript(location: &str) -> Manuscript {
        let name = location
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("manuscript.pdf");
        Manuscript::new(location, "Example Repository", PDF_MIME_TYPE, "Unpaywall", name)
            .unwrap()
    }

    /// Create an ordered set of PDF manuscripts.
    pub fn manuscripts(locations: &[&str]) -> ManuscriptSet {
        locations.iter().map(|l| manuscript(l)).collect()
    }

    /// Bytes of a minimal PDF document.
    pub fn pdf_bytes() -> Vec<u8> {
        b"%PDF-1.4\n1 0 obj << /Type /Catalog >> endobj\ntrailer << /Root 1 0 R >>\n%%EOF\n"
            .to_vec()
    }

    /// Acquisition settings with the given pipeline deadline.
    pub fn acquisition_config(pipeline_timeout_secs: u64) -> AcquisitionConfig {
        AcquisitionConfig {
            pipeline_timeout_secs,
        }
    }
}
