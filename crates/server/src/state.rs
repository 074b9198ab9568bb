use std::sync::Arc;

use pass_download_core::{
    AcquisitionHandler, AcquisitionOrchestrator, Config, LookupClient, SanitizedConfig,
};

/// Shared application state
pub struct AppState {
    config: Config,
    lookup: Arc<dyn LookupClient>,
    orchestrator: Arc<AcquisitionOrchestrator>,
}

impl AppState {
    pub fn new(
        config: Config,
        lookup: Arc<dyn LookupClient>,
        orchestrator: Arc<AcquisitionOrchestrator>,
    ) -> Self {
        Self {
            config,
            lookup,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn lookup(&self) -> &dyn LookupClient {
        self.lookup.as_ref()
    }

    pub fn acquisitions(&self) -> &dyn AcquisitionHandler {
        self.orchestrator.as_ref()
    }

    pub fn orchestrator(&self) -> &AcquisitionOrchestrator {
        &self.orchestrator
    }
}
