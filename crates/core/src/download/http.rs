//! HTTP manuscript downloader.

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, redirect, Client};
use tracing::debug;

use crate::config::DownloadConfig;
use crate::manuscript::Manuscript;
use crate::metrics::DOWNLOADED_BYTES;
use crate::retry::{classify_status, RetryPolicy, StatusClass};

use super::{Downloaded, DownloadError, Downloader};

/// Content types accepted for any manuscript.
const GENERIC_BINARY_TYPES: &[&str] = &["application/octet-stream", "binary/octet-stream"];

/// Downloads manuscripts over HTTP(S) with bounded retry.
pub struct HttpDownloader {
    client: Client,
    retry: RetryPolicy,
    max_bytes: u64,
}

impl HttpDownloader {
    /// Create a new downloader.
    pub fn new(config: &DownloadConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| DownloadError::Connection {
                url: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            retry: config.retry_policy(),
            max_bytes: config.max_bytes,
        })
    }

    async fn attempt(
        &self,
        manuscript: &Manuscript,
        attempt: u32,
    ) -> Result<Downloaded, DownloadError> {
        let url = manuscript.location();
        debug!(url, attempt, "Downloading manuscript");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_transport_error(url, e))?;

        let status = response.status();
        match classify_status(status) {
            StatusClass::Success => {}
            StatusClass::Transient => {
                return Err(DownloadError::ServerError {
                    status: status.as_u16(),
                    url: url.to_string(),
                })
            }
            StatusClass::Permanent => {
                return Err(DownloadError::Rejected {
                    status: status.as_u16(),
                    url: url.to_string(),
                })
            }
        }

        let header_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if !content_type_matches(manuscript.mime_type(), header_type.as_deref()) {
            return Err(DownloadError::ContentTypeMismatch {
                expected: manuscript.mime_type().to_string(),
                actual: header_type.unwrap_or_default(),
            });
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(DownloadError::TooLarge {
                    limit: self.max_bytes,
                });
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| map_transport_error(url, e))?
        {
            if (bytes.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(DownloadError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        DOWNLOADED_BYTES.inc_by(bytes.len() as u64);
        debug!(url, bytes = bytes.len(), "Manuscript downloaded");

        Ok(Downloaded {
            bytes,
            content_type: manuscript.mime_type().to_string(),
        })
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(&self, manuscript: &Manuscript) -> Result<Downloaded, DownloadError> {
        if reqwest::Url::parse(manuscript.location()).is_err() {
            return Err(DownloadError::InvalidLocation(
                manuscript.location().to_string(),
            ));
        }

        self.retry
            .run("download", |attempt| self.attempt(manuscript, attempt))
            .await
    }
}

fn map_transport_error(url: &str, e: reqwest::Error) -> DownloadError {
    if e.is_timeout() {
        DownloadError::Timeout(url.to_string())
    } else if e.is_redirect() {
        DownloadError::TooManyRedirects(url.to_string())
    } else {
        DownloadError::Connection {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

/// Whether a response `Content-Type` is acceptable for the expected type.
///
/// A missing header and generic binary types are accepted.
fn content_type_matches(expected: &str, header: Option<&str>) -> bool {
    let Some(header) = header else {
        return true;
    };
    let essence = header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence.is_empty()
        || essence.eq_ignore_ascii_case(expected.trim())
        || GENERIC_BINARY_TYPES.contains(&essence.as_str())
}
