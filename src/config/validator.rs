//! Config validation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::RunConfig;
use crate::error::ConfigError;
use crate::models::ClusterMetadata;

/// Infra ids become part of cloud resource names, which cap the length.
pub const MAX_INFRA_ID_LEN: usize = 27;

static INFRA_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid infra id regex"));

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Validate the full run config.
pub fn validate_run_config(config: &RunConfig) -> Result<(), ConfigError> {
    if config.provider.trim().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Provider cannot be empty".to_string(),
        ));
    }

    validate_cluster_metadata(&config.cluster)?;
    validate_log_level(&config.log_level)?;

    for (name, resource) in &config.resources {
        if name.is_empty() || resource.kind.is_empty() || resource.id.is_empty() {
            return Err(ConfigError::ValidationFailed(format!(
                "Resource '{}' must have a name, kind and id",
                name
            )));
        }
    }

    Ok(())
}

/// Validate cluster identity fields.
pub fn validate_cluster_metadata(metadata: &ClusterMetadata) -> Result<(), ConfigError> {
    if metadata.cluster_name.trim().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Cluster name cannot be empty".to_string(),
        ));
    }

    validate_infra_id(&metadata.infra_id)?;

    let domain = &metadata.base_domain;
    if domain.starts_with('.') || domain.ends_with('.') {
        return Err(ConfigError::ValidationFailed(format!(
            "Base domain must not start or end with '.', got: {}",
            domain
        )));
    }

    Ok(())
}

/// Validate infra id (lowercase alphanumerics and '-', at most 27 chars).
pub fn validate_infra_id(infra_id: &str) -> Result<(), ConfigError> {
    if infra_id.is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Infra id cannot be empty".to_string(),
        ));
    }

    if infra_id.len() > MAX_INFRA_ID_LEN {
        return Err(ConfigError::ValidationFailed(format!(
            "Infra id must be at most {} characters, got {}: {}",
            MAX_INFRA_ID_LEN,
            infra_id.len(),
            infra_id
        )));
    }

    if !INFRA_ID_RE.is_match(infra_id) {
        return Err(ConfigError::ValidationFailed(format!(
            "Infra id must be lowercase alphanumerics and '-', starting and ending with an alphanumeric: {}",
            infra_id
        )));
    }

    Ok(())
}

/// Validate log level name (case-insensitive).
pub fn validate_log_level(level: &str) -> Result<(), ConfigError> {
    if LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ConfigError::ValidationFailed(format!(
            "Unknown log level '{}', expected one of: {}",
            level,
            LOG_LEVELS.join(", ")
        )))
    }
}
