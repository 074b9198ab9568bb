//! Mock lookup client for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::doi::Doi;
use crate::lookup::{LookupClient, LookupError};
use crate::manuscript::ManuscriptSet;

/// A recorded lookup for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedLookup {
    /// The DOI that was looked up.
    pub doi: String,
    /// When the lookup was made.
    pub timestamp: Instant,
}

/// Mock implementation of the LookupClient trait.
///
/// Provides controllable behavior for testing:
/// - Return configured manuscripts per DOI
/// - Track lookups for assertions
/// - Simulate failures and slow providers
///
/// Unknown DOIs fail with `DoiNotFound`; DOIs configured with an empty set
/// fail with `NoOpenAccessLocation`.
///
/// # Example
///
/// ```rust,ignore
/// use pass_download_core::testing::{MockLookupClient, fixtures};
///
/// let lookup = MockLookupClient::new();
/// lookup
///     .set_manuscripts("10.1234/abcd", fixtures::manuscripts(&["http://repo.example.org/a.pdf"]))
///     .await;
///
/// let set = lookup.lookup(&Doi::parse("10.1234/ABCD")?).await?;
/// assert_eq!(set.len(), 1);
/// assert_eq!(lookup.lookup_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockLookupClient {
    /// Configured manuscripts by case-folded DOI.
    manuscripts: Arc<RwLock<HashMap<String, ManuscriptSet>>>,
    /// Recorded lookups.
    lookups: Arc<RwLock<Vec<RecordedLookup>>>,
    /// If set, the next lookup will fail with this error.
    next_error: Arc<RwLock<Option<LookupError>>>,
    /// Simulated lookup latency.
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockLookupClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLookupClient {
    /// Create a new mock lookup client with no known DOIs.
    pub fn new() -> Self {
        Self {
            manuscripts: Arc::new(RwLock::new(HashMap::new())),
            lookups: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Set the manuscripts returned for a DOI.
    pub async fn set_manuscripts(&self, doi: &str, manuscripts: ManuscriptSet) {
        self.manuscripts
            .write()
            .await
            .insert(doi.to_lowercase(), manuscripts);
    }

    /// Get recorded lookups.
    pub async fn recorded_lookups(&self) -> Vec<RecordedLookup> {
        self.lookups.read().await.clone()
    }

    /// Get the number of lookups performed.
    pub async fn lookup_count(&self) -> usize {
        self.lookups.read().await.len()
    }

    /// Configure the next lookup to fail with the given error.
    pub async fn set_next_error(&self, error: LookupError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated lookup latency.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }
}

#[async_trait]
impl LookupClient for MockLookupClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn lookup(&self, doi: &Doi) -> Result<ManuscriptSet, LookupError> {
        self.lookups.write().await.push(RecordedLookup {
            doi: doi.to_string(),
            timestamp: Instant::now(),
        });

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        match self.manuscripts.read().await.get(&doi.key()) {
            None => Err(LookupError::DoiNotFound(doi.to_string())),
            Some(set) if set.is_empty() => Err(LookupError::NoOpenAccessLocation(doi.to_string())),
            Some(set) => Ok(set.clone()),
        }
    }
}
