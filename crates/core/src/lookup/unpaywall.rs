//! Unpaywall API client.
//!
//! Unpaywall requires:
//! - A contact email on every request (`?email=`)
//! - The DOI as the trailing path of `/v2/{doi}`

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::UnpaywallConfig;
use crate::doi::Doi;
use crate::manuscript::{Manuscript, ManuscriptSet, PDF_MIME_TYPE};
use crate::retry::RetryPolicy;

use super::{LookupClient, LookupError};

/// Source label recorded on manuscripts found through Unpaywall.
pub const UNPAYWALL_SOURCE: &str = "Unpaywall";

const FALLBACK_FILE_NAME: &str = "manuscript.pdf";

/// Unpaywall API client.
pub struct UnpaywallClient {
    client: Client,
    base_url: String,
    email: String,
    retry: RetryPolicy,
}

impl UnpaywallClient {
    /// Create a new Unpaywall client.
    pub fn new(config: &UnpaywallConfig, retry: RetryPolicy) -> Result<Self, LookupError> {
        let client = Client::builder()
            .user_agent(format!(
                "pass-download-service/{}",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            email: config.email.clone(),
            retry,
        })
    }

    /// Build the lookup URL; each DOI path segment is percent-encoded.
    fn request_url(&self, doi: &Doi) -> String {
        let path = doi
            .as_str()
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.base_url, path)
    }

    async fn fetch(&self, doi: &Doi) -> Result<UnpaywallResponse, LookupError> {
        let url = self.request_url(doi);
        debug!(doi = %doi, url = %url, "Unpaywall lookup");

        let response = self
            .client
            .get(&url)
            .query(&[("email", self.email.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LookupError::DoiNotFound(doi.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::ProviderError {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout
            } else {
                LookupError::ParseError(e.to_string())
            }
        })
    }
}

#[async_trait]
impl LookupClient for UnpaywallClient {
    fn name(&self) -> &str {
        UNPAYWALL_SOURCE
    }

    async fn lookup(&self, doi: &Doi) -> Result<ManuscriptSet, LookupError> {
        let response = self.retry.run("lookup", |_| self.fetch(doi)).await?;

        let manuscripts = manuscripts_from_response(response);
        if manuscripts.is_empty() {
            return Err(LookupError::NoOpenAccessLocation(doi.to_string()));
        }

        debug!(
            doi = %doi,
            candidates = manuscripts.len(),
            "Unpaywall lookup resolved candidates"
        );
        Ok(manuscripts)
    }
}

/// Derive a file name from the last path segment of a location.
///
/// The segment is query-unescaped (`+` becomes a space, then percent
/// decoding); if decoding fails the raw segment is used.
pub fn file_name_from_location(location: &str) -> String {
    let without_query = location
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let segment = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    let plus_as_space = segment.replace('+', " ");
    let name = match urlencoding::decode(&plus_as_space) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            warn!("File name decoding failed for {}: {}", location, e);
            segment.to_string()
        }
    };

    let is_host = without_query.trim_end_matches('/').ends_with(&format!("//{}", segment));
    if name.is_empty() || is_host {
        FALLBACK_FILE_NAME.to_string()
    } else {
        name
    }
}

fn manuscripts_from_response(response: UnpaywallResponse) -> ManuscriptSet {
    response
        .best_oa_location
        .into_iter()
        .chain(response.oa_locations.unwrap_or_default())
        .filter_map(|location| {
            let url = location.url_for_pdf.filter(|u| !u.trim().is_empty())?;
            let name = file_name_from_location(&url);
            match Manuscript::new(
                url,
                location.repository_institution.unwrap_or_default(),
                PDF_MIME_TYPE,
                UNPAYWALL_SOURCE,
                name,
            ) {
                Ok(manuscript) => Some(manuscript),
                Err(e) => {
                    warn!("Skipping unusable Unpaywall location: {}", e);
                    None
                }
            }
        })
        .collect()
}

// ============================================================================
// Unpaywall API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct UnpaywallResponse {
    #[serde(default)]
    best_oa_location: Option<UnpaywallLocation>,
    #[serde(default)]
    oa_locations: Option<Vec<UnpaywallLocation>>,
}

#[derive(Debug, Deserialize)]
struct UnpaywallLocation {
    #[serde(default)]
    url_for_pdf: Option<String>,
    #[serde(default)]
    repository_institution: Option<String>,
}
