pub mod acquisition;
pub mod config;
pub mod doi;
pub mod download;
pub mod ingest;
pub mod lookup;
pub mod manifest;
pub mod manuscript;
pub mod metrics;
pub mod retry;
pub mod testing;
pub mod verify;

pub use acquisition::{
    AcquisitionError, AcquisitionHandler, AcquisitionOrchestrator, AcquisitionRequest,
    AcquisitionResult, AcquisitionStatus, ErrorDetail, FailureKind, InFlightAcquisition,
    PipelineState,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use doi::{Doi, DoiError};
pub use download::{
    DownloadError, DownloadFailureKind, Downloaded, Downloader, HttpDownloader,
};
pub use ingest::{IngestError, IngestMetadata, PassRepositoryClient, RepositoryIngest};
pub use lookup::{LookupClient, LookupError, UnpaywallClient};
pub use manifest::{build_manifest, Manifest, ManifestBuilder};
pub use manuscript::{Manuscript, ManuscriptError, ManuscriptSet};
pub use retry::RetryPolicy;
pub use verify::{normalize_uri, verify, MatchResult};
