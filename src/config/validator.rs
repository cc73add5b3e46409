//! Configuration validation for analyzer settings.
//!
//! Limits must be usable and policy entries well formed before an analysis
//! run starts; the engine itself assumes a validated configuration.

use crate::error::{ConfigError, PlanLensError, Result};
use std::collections::BTreeSet;
use tracing::debug;

use super::spec::{AnalyzerConfig, DangerPolicy, GroupingConfig, PerformanceLimits};

/// Validator for analyzer configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates an analyzer configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any were found.
    pub fn validate(&self, config: &AnalyzerConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_limits(&config.limits, &mut result);
        Self::validate_grouping(&config.grouping, &mut result);
        Self::validate_policy(&config.danger, &mut result);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(PlanLensError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Validates performance limits.
    fn validate_limits(limits: &PerformanceLimits, result: &mut ValidationResult) {
        let checks = [
            ("limits.max_properties_per_resource", limits.max_properties_per_resource),
            ("limits.max_property_value_bytes", limits.max_property_value_bytes),
            ("limits.max_total_bytes", limits.max_total_bytes),
        ];

        for (field, value) in checks {
            if value == 0 {
                result.errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("{field} must be greater than zero"),
                });
            }
        }

        if limits.max_property_value_bytes > limits.max_total_bytes {
            result.errors.push(ValidationError {
                field: String::from("limits.max_property_value_bytes"),
                message: format!(
                    "max_property_value_bytes ({}) cannot exceed max_total_bytes ({})",
                    limits.max_property_value_bytes, limits.max_total_bytes
                ),
            });
        }
    }

    /// Validates grouping settings.
    fn validate_grouping(grouping: &GroupingConfig, result: &mut ValidationResult) {
        if grouping.threshold == 0 {
            result.errors.push(ValidationError {
                field: String::from("grouping.threshold"),
                message: String::from("Grouping threshold must be at least 1"),
            });
        }

        if !grouping.enabled {
            result
                .warnings
                .push(String::from("Provider grouping is disabled"));
        }
    }

    /// Validates the danger policy.
    fn validate_policy(policy: &DangerPolicy, result: &mut ValidationResult) {
        if policy
            .sensitive_resources
            .iter()
            .any(|resource_type| resource_type.trim().is_empty())
        {
            result.errors.push(ValidationError {
                field: String::from("danger.sensitive_resources"),
                message: String::from("Sensitive resource types cannot be empty"),
            });
        }

        let mut seen = BTreeSet::new();
        for (i, rule) in policy.sensitive_properties.iter().enumerate() {
            if rule.resource_type.trim().is_empty() {
                result.errors.push(ValidationError {
                    field: format!("danger.sensitive_properties[{i}].resource_type"),
                    message: String::from("Resource type cannot be empty (use \"*\" for all types)"),
                });
            }

            if !seen.insert((rule.resource_type.as_str(), rule.property.as_str())) {
                result.warnings.push(format!(
                    "Duplicate sensitive property rule: {} {}",
                    rule.resource_type, rule.property
                ));
            }
        }
    }
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
