use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub unpaywall: UnpaywallConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8091
}

fn default_timeout_secs() -> u64 {
    20
}

/// Unpaywall lookup provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UnpaywallConfig {
    /// API base URL (default: https://api.unpaywall.org/v2)
    #[serde(default = "default_unpaywall_base_url")]
    pub base_url: String,
    /// Contact email sent with every request, required by Unpaywall
    pub email: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries after a transient lookup failure, independent of downloads
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_unpaywall_base_url() -> String {
    "https://api.unpaywall.org/v2".to_string()
}

impl UnpaywallConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Manuscript download configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    /// Retries after a transient failure (connection error, 5xx)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each subsequent one
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound on the retry delay
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Largest response body accepted
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    /// Redirects followed before giving up
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_max_retries() -> u32 {
    4
}

fn default_initial_backoff_ms() -> u64 {
    250
}

fn default_max_backoff_ms() -> u64 {
    5000
}

fn default_max_bytes() -> u64 {
    100 * 1024 * 1024 // 100 MiB
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    format!("pass-download-service/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl DownloadConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Repository (PASS/Fedora) ingestion configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepositoryConfig {
    /// Container URI binaries are POSTed into
    pub dest: String,
    /// Private base URL the service talks to
    #[serde(default)]
    pub internal_base_url: String,
    /// Public base URL handed back to callers
    #[serde(default)]
    pub external_base_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl RepositoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Acquisition pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcquisitionConfig {
    /// Deadline for a whole pipeline execution, in seconds
    #[serde(default = "default_pipeline_timeout")]
    pub pipeline_timeout_secs: u64,
}

fn default_pipeline_timeout() -> u64 {
    120
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            pipeline_timeout_secs: default_pipeline_timeout(),
        }
    }
}

impl AcquisitionConfig {
    pub fn pipeline_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline_timeout_secs)
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub unpaywall: UnpaywallConfig,
    pub download: DownloadConfig,
    pub repository: SanitizedRepositoryConfig,
    pub acquisition: AcquisitionConfig,
}

/// Sanitized repository config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedRepositoryConfig {
    pub dest: String,
    pub internal_base_url: String,
    pub external_base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub password_configured: bool,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            unpaywall: config.unpaywall.clone(),
            download: config.download.clone(),
            repository: SanitizedRepositoryConfig {
                dest: config.repository.dest.clone(),
                internal_base_url: config.repository.internal_base_url.clone(),
                external_base_url: config.repository.external_base_url.clone(),
                username: config.repository.username.clone(),
                password_configured: config
                    .repository
                    .password
                    .as_ref()
                    .is_some_and(|p| !p.is_empty()),
                timeout_secs: config.repository.timeout_secs,
            },
            acquisition: config.acquisition.clone(),
        }
    }
}
