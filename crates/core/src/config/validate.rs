use super::{types::Config, ConfigError};

/// Upper bound on retries accepted from configuration.
const MAX_CONFIGURED_RETRIES: u32 = 10;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Unpaywall email and repository dest are set
/// - Retry bound, size ceiling and timeouts are usable
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.unpaywall.email.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "unpaywall.email is required".to_string(),
        ));
    }

    if config.repository.dest.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "repository.dest is required".to_string(),
        ));
    }

    let retries = [
        ("unpaywall.max_retries", config.unpaywall.max_retries),
        ("download.max_retries", config.download.max_retries),
    ];
    for (name, value) in retries {
        if value > MAX_CONFIGURED_RETRIES {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot exceed {}",
                name, MAX_CONFIGURED_RETRIES
            )));
        }
    }

    if config.download.max_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "download.max_bytes cannot be 0".to_string(),
        ));
    }

    let timeouts = [
        ("unpaywall.timeout_secs", config.unpaywall.timeout_secs),
        ("download.timeout_secs", config.download.timeout_secs),
        ("repository.timeout_secs", config.repository.timeout_secs),
        (
            "acquisition.pipeline_timeout_secs",
            config.acquisition.pipeline_timeout_secs,
        ),
    ];
    for (name, value) in timeouts {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be 0",
                name
            )));
        }
    }

    Ok(())
}
