//! Mock downloader for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::download::{Downloaded, DownloadError, Downloader};
use crate::manuscript::Manuscript;

use super::fixtures;

/// Mock implementation of the Downloader trait.
///
/// Locations without configured content return a small PDF. Fetches are
/// recorded when they start, so aborted transfers are counted too.
#[derive(Debug)]
pub struct MockDownloader {
    /// Content by manuscript location.
    contents: Arc<RwLock<HashMap<String, Downloaded>>>,
    /// Persistent failures by manuscript location.
    failures: Arc<RwLock<HashMap<String, DownloadError>>>,
    /// Locations fetched, in order.
    fetches: Arc<RwLock<Vec<String>>>,
    /// Fetches that ran to completion.
    completed: Arc<RwLock<usize>>,
    /// If set, the next fetch will fail with this error.
    next_error: Arc<RwLock<Option<DownloadError>>>,
    /// Simulated transfer duration.
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDownloader {
    pub fn new() -> Self {
        Self {
            contents: Arc::new(RwLock::new(HashMap::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            fetches: Arc::new(RwLock::new(Vec::new())),
            completed: Arc::new(RwLock::new(0)),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Set the content served for a location.
    pub async fn set_content(&self, location: &str, bytes: Vec<u8>, content_type: &str) {
        self.contents.write().await.insert(
            location.to_string(),
            Downloaded {
                bytes,
                content_type: content_type.to_string(),
            },
        );
    }

    /// Make every fetch of a location fail.
    pub async fn set_failure(&self, location: &str, error: DownloadError) {
        self.failures
            .write()
            .await
            .insert(location.to_string(), error);
    }

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_error(&self, error: DownloadError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated transfer duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Locations fetched, in order.
    pub async fn recorded_fetches(&self) -> Vec<String> {
        self.fetches.read().await.clone()
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }

    /// Number of fetches that were not aborted.
    pub async fn completed_count(&self) -> usize {
        *self.completed.read().await
    }
}

#[async_trait]
impl Downloader for MockDownloader {
    async fn fetch(&self, manuscript: &Manuscript) -> Result<Downloaded, DownloadError> {
        let location = manuscript.location().to_string();
        self.fetches.write().await.push(location.clone());

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        *self.completed.write().await += 1;

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if let Some(err) = self.failures.read().await.get(&location) {
            return Err(err.clone());
        }

        Ok(self
            .contents
            .read()
            .await
            .get(&location)
            .cloned()
            .unwrap_or_else(|| Downloaded {
                bytes: fixtures::pdf_bytes(),
                content_type: manuscript.mime_type().to_string(),
            }))
    }
}
