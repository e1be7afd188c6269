// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Every problem is collected before reporting, so one run shows them all.

use crate::{ConfigError, ConfigResult, RevealConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    MustBePositive { field: String },
    InvalidRange { low: String, high: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MustBePositive { field } => write!(f, "{} must be greater than zero", field),
            Self::InvalidRange { low, high } => {
                write!(f, "{} must not exceed {}", low, high)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &RevealConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// All validation problems, in section order
pub fn collect_errors(config: &RevealConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_timings(config, &mut errors);
    validate_route(config, &mut errors);
    validate_polling(config, &mut errors);
    validate_logging(config, &mut errors);
    errors
}

fn positive(field: &str, value: u64, errors: &mut Vec<ConfigValidationError>) {
    if value == 0 {
        errors.push(ConfigValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
}

fn finite_positive(field: &str, value: f64, errors: &mut Vec<ConfigValidationError>) {
    if !value.is_finite() || value <= 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: field.to_string(),
            reason: format!("{} is not a positive number", value),
        });
    }
}

fn validate_timings(config: &RevealConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.queue.event_capacity == 0 {
        errors.push(ConfigValidationError::MustBePositive {
            field: "queue.event_capacity".to_string(),
        });
    }
    positive("pipeline.stage_timeout_ms", config.pipeline.stage_timeout_ms, errors);
    positive("pipeline.expansion_timeout_ms", config.pipeline.expansion_timeout_ms, errors);
    positive("idle.idle_timeout_ms", config.idle.idle_timeout_ms, errors);
    positive("idle.attract_max_ms", config.idle.attract_max_ms, errors);
}

fn validate_route(config: &RevealConfig, errors: &mut Vec<ConfigValidationError>) {
    let route = &config.route;
    finite_positive("route.target_km", route.target_km, errors);
    finite_positive("route.km_per_sec", route.km_per_sec, errors);
    finite_positive("route.stub_offset_deg", route.stub_offset_deg, errors);
    if !route.min_km.is_finite() || route.min_km < 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "route.min_km".to_string(),
            reason: format!("{} is negative", route.min_km),
        });
    }
    positive("route.max_attempts", u64::from(route.max_attempts), errors);
    positive("route.attempt_timeout_ms", route.attempt_timeout_ms, errors);
    if route.min_duration_ms > route.max_duration_ms {
        errors.push(ConfigValidationError::InvalidRange {
            low: "route.min_duration_ms".to_string(),
            high: "route.max_duration_ms".to_string(),
        });
    }
}

fn validate_polling(config: &RevealConfig, errors: &mut Vec<ConfigValidationError>) {
    let polling = &config.polling;
    positive("polling.interval_ms", polling.interval_ms, errors);
    if polling.mock_counts.is_empty() && polling.mock_pool.is_empty() {
        errors.push(ConfigValidationError::InvalidValue {
            field: "polling.mock_pool".to_string(),
            reason: "mock_counts and mock_pool are both empty".to_string(),
        });
    }
    if polling.mock_pool.contains(&0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "polling.mock_pool".to_string(),
            reason: "batch sizes must be at least 1".to_string(),
        });
    }
}

fn validate_logging(config: &RevealConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("'{}' is not one of {}", config.logging.level, LOG_LEVELS.join(", ")),
        });
    }
    if config.logging.file_logging && config.logging.max_runs == 0 {
        errors.push(ConfigValidationError::MustBePositive {
            field: "logging.max_runs".to_string(),
        });
    }
    if config.data.universe_path.as_os_str().is_empty() {
        errors.push(ConfigValidationError::InvalidValue {
            field: "data.universe_path".to_string(),
            reason: "path is empty".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_all_problems_reported() {
        let mut config = RevealConfig::default();
        config.polling.interval_ms = 0;
        config.route.km_per_sec = f64::NAN;
        config.route.min_duration_ms = 9000;
        config.logging.level = "verbose".to_string();

        let errors = collect_errors(&config);
        assert_eq!(errors.len(), 4);

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("polling.interval_ms"));
        assert!(message.contains("route.km_per_sec"));
        assert!(message.contains("route.min_duration_ms must not exceed route.max_duration_ms"));
        assert!(message.contains("logging.level"));
    }

    #[test]
    fn test_log_level_case_insensitive() {
        let mut config = RevealConfig::default();
        config.logging.level = "WARN".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_cooldown_allowed() {
        let mut config = RevealConfig::default();
        config.queue.cooldown_ms = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_universe_path_rejected() {
        let mut config = RevealConfig::default();
        config.data.universe_path = PathBuf::new();
        assert_eq!(collect_errors(&config).len(), 1);
    }
}
