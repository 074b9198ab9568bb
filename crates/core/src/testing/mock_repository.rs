//! Mock repository for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::ingest::{IngestError, IngestMetadata, RepositoryIngest};

/// Base URI of objects stored by [`MockRepository`].
pub const MOCK_REPOSITORY_BASE: &str = "https://pass.example.org/fcrepo/rest/files";

/// A recorded ingest for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedIngest {
    /// Metadata sent with the binary.
    pub metadata: IngestMetadata,
    /// Size of the binary.
    pub size: usize,
    /// URI the binary was stored under.
    pub stored_uri: String,
}

/// Mock implementation of the RepositoryIngest trait.
///
/// The n-th successful ingest is stored under `{MOCK_REPOSITORY_BASE}/{n}`.
#[derive(Debug)]
pub struct MockRepository {
    ingests: Arc<RwLock<Vec<RecordedIngest>>>,
    /// If set, the next ingest will fail with this error.
    next_error: Arc<RwLock<Option<IngestError>>>,
    /// Simulated ingest duration.
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRepository {
    pub fn new() -> Self {
        Self {
            ingests: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Get all recorded ingests.
    pub async fn recorded_ingests(&self) -> Vec<RecordedIngest> {
        self.ingests.read().await.clone()
    }

    /// Get the number of successful ingests.
    pub async fn ingest_count(&self) -> usize {
        self.ingests.read().await.len()
    }

    /// Configure the next ingest to fail with the given error.
    pub async fn set_next_error(&self, error: IngestError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated ingest duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }
}

#[async_trait]
impl RepositoryIngest for MockRepository {
    async fn post_binary(
        &self,
        bytes: Vec<u8>,
        metadata: &IngestMetadata,
    ) -> Result<String, IngestError> {
        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let mut ingests = self.ingests.write().await;
        let stored_uri = format!("{}/{}", MOCK_REPOSITORY_BASE, ingests.len() + 1);
        ingests.push(RecordedIngest {
            metadata: metadata.clone(),
            size: bytes.len(),
            stored_uri: stored_uri.clone(),
        });

        Ok(stored_uri)
    }
}
