//! PASS/Fedora repository client.
//!
//! Binaries are POSTed into a container; Fedora answers with the new
//! resource's URI in `Location`. The service talks to Fedora over a private
//! base URL, so returned URIs are translated to the public one.

use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, LOCATION};
use reqwest::Client;
use tracing::debug;

use crate::config::RepositoryConfig;

use super::{IngestError, IngestMetadata, RepositoryIngest};

const USER_AGENT: &str = "pass-download-service";

/// Repository client for a PASS Fedora instance.
pub struct PassRepositoryClient {
    client: Client,
    dest: String,
    internal_base_url: String,
    external_base_url: String,
    credentials: Option<(String, Option<String>)>,
}

impl PassRepositoryClient {
    /// Create a new repository client.
    pub fn new(config: &RepositoryConfig) -> Result<Self, IngestError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()?;

        let credentials = config
            .username
            .as_ref()
            .filter(|u| !u.is_empty())
            .map(|u| (u.clone(), config.password.clone()));

        Ok(Self {
            client,
            dest: config.dest.clone(),
            internal_base_url: config.internal_base_url.clone(),
            external_base_url: config.external_base_url.clone(),
            credentials,
        })
    }

    /// Rewrite an internal repository URI to its public form.
    fn translate_to_public(&self, uri: &str) -> Result<String, IngestError> {
        if let Some(rest) = uri
            .strip_prefix(self.internal_base_url.as_str())
            .filter(|_| !self.internal_base_url.is_empty())
        {
            return Ok(format!("{}{}", self.external_base_url, rest));
        }
        if uri.starts_with(self.external_base_url.as_str()) {
            return Ok(uri.to_string());
        }
        Err(IngestError::UnexpectedLocation(uri.to_string()))
    }
}

#[async_trait]
impl RepositoryIngest for PassRepositoryClient {
    async fn post_binary(
        &self,
        bytes: Vec<u8>,
        metadata: &IngestMetadata,
    ) -> Result<String, IngestError> {
        debug!(
            dest = %self.dest,
            name = %metadata.name,
            bytes = bytes.len(),
            "Posting binary to repository"
        );

        let mut request = self
            .client
            .post(&self.dest)
            .header(CONTENT_TYPE, &metadata.content_type)
            .header(
                CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    metadata.name.replace('"', "")
                ),
            )
            .header("Digest", format!("sha256={}", metadata.sha256))
            .body(bytes);

        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::Rejected {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(IngestError::MissingLocation)?;

        self.translate_to_public(&location)
    }
}
