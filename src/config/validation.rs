use crate::config::types::{CheckerConfig, ClassifierConfig, Config, OutputConfig};
use crate::ConfigError;
use std::collections::HashSet;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_checker_config(&config.checker)?;
    validate_output_config(&config.output)?;
    validate_classifier_config(&config.classifier)?;
    Ok(())
}

/// Validates worker pool and client settings
fn validate_checker_config(config: &CheckerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "timeout-ms must be greater than 0".to_string(),
        ));
    }

    if config.max_redirects < 1 || config.max_redirects > 50 {
        return Err(ConfigError::Validation(format!(
            "max-redirects must be between 1 and 50, got {}",
            config.max_redirects
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation("output path cannot be empty".to_string()));
    }

    if matches!(config.summary_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "summary-path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates keyword tables
fn validate_classifier_config(config: &ClassifierConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&config.min_confidence) {
        return Err(ConfigError::Validation(format!(
            "min-confidence must be within 0.0..=1.0, got {}",
            config.min_confidence
        )));
    }

    if config.dummy_keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "dummy-keywords cannot contain empty entries".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for sector in &config.sectors {
        if sector.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "sector name cannot be empty".to_string(),
            ));
        }

        if !seen.insert(sector.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate sector '{}'",
                sector.name
            )));
        }

        if sector.keywords.is_empty() {
            return Err(ConfigError::Validation(format!(
                "sector '{}' must have at least one keyword",
                sector.name
            )));
        }

        if sector.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "sector '{}' contains an empty keyword",
                sector.name
            )));
        }
    }

    Ok(())
}
