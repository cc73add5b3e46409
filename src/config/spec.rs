//! Configuration specification types for the analyzer.
//!
//! These structs map to `planlens.yaml`. Every section is optional; missing
//! sections take the defaults documented on each field.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::analysis::PathPattern;

/// Resource types treated as sensitive when no policy is configured.
const DEFAULT_SENSITIVE_RESOURCES: &[&str] = &[
    "aws_db_instance",
    "aws_dynamodb_table",
    "aws_efs_file_system",
    "aws_elasticache_cluster",
    "aws_kms_key",
    "aws_rds_cluster",
    "aws_s3_bucket",
    "azurerm_key_vault",
    "azurerm_mssql_database",
    "azurerm_storage_account",
    "google_sql_database_instance",
    "google_storage_bucket",
];

/// Resource type / property pairs treated as sensitive by default.
const DEFAULT_SENSITIVE_PROPERTIES: &[(&str, &str)] = &[
    ("aws_instance", "user_data"),
    ("aws_launch_configuration", "user_data"),
    ("aws_launch_template", "user_data"),
];

/// The root analyzer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// What counts as dangerous.
    pub danger: DangerPolicy,
    /// Per-resource capture limits.
    pub limits: PerformanceLimits,
    /// Provider grouping settings.
    pub grouping: GroupingConfig,
    /// Whether presentation should expand dangerous resources by default.
    /// Passed through to the result untouched.
    pub auto_expand_dangerous: bool,
}

/// Sensitivity policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DangerPolicy {
    /// Resource types whose replacement or deletion is dangerous.
    #[serde(default)]
    pub sensitive_resources: BTreeSet<String>,
    /// Properties whose change is dangerous.
    #[serde(default)]
    pub sensitive_properties: Vec<SensitivePropertyRule>,
}

/// A sensitive property on one resource type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct SensitivePropertyRule {
    /// Resource type, or `*` for every type.
    pub resource_type: String,
    /// Property path pattern.
    pub property: PathPattern,
}

/// Limits bounding how much diff detail is captured per resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PerformanceLimits {
    /// Changes kept per resource before truncating.
    #[serde(default = "default_max_properties")]
    pub max_properties_per_resource: usize,
    /// Serialized size cap for one displayed value.
    #[serde(default = "default_max_value_bytes")]
    pub max_property_value_bytes: usize,
    /// Total captured bytes per resource before analysis stops.
    #[serde(default = "default_max_total_bytes")]
    pub max_total_bytes: usize,
}

/// Provider grouping settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupingConfig {
    /// Whether grouping may activate at all.
    #[serde(default = "default_grouping_enabled")]
    pub enabled: bool,
    /// Minimum number of changed resources before grouping.
    #[serde(default = "default_grouping_threshold")]
    pub threshold: usize,
}

// Default value functions

const fn default_max_properties() -> usize {
    100
}

const fn default_max_value_bytes() -> usize {
    10 * 1024
}

const fn default_max_total_bytes() -> usize {
    10 * 1024 * 1024
}

const fn default_grouping_enabled() -> bool {
    true
}

const fn default_grouping_threshold() -> usize {
    10
}

impl Default for DangerPolicy {
    fn default() -> Self {
        let sensitive_properties = DEFAULT_SENSITIVE_PROPERTIES
            .iter()
            .filter_map(|(resource_type, property)| {
                PathPattern::parse(property)
                    .ok()
                    .map(|property| SensitivePropertyRule::new(*resource_type, property))
            })
            .collect();

        Self {
            sensitive_resources: DEFAULT_SENSITIVE_RESOURCES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            sensitive_properties,
        }
    }
}

impl Default for PerformanceLimits {
    fn default() -> Self {
        Self {
            max_properties_per_resource: default_max_properties(),
            max_property_value_bytes: default_max_value_bytes(),
            max_total_bytes: default_max_total_bytes(),
        }
    }
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            enabled: default_grouping_enabled(),
            threshold: default_grouping_threshold(),
        }
    }
}

impl DangerPolicy {
    /// A policy with no sensitive resources or properties.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            sensitive_resources: BTreeSet::new(),
            sensitive_properties: Vec::new(),
        }
    }

    /// Adds a sensitive resource type.
    #[must_use]
    pub fn with_sensitive_resource(mut self, resource_type: impl Into<String>) -> Self {
        self.sensitive_resources.insert(resource_type.into());
        self
    }

    /// Adds a sensitive property rule.
    #[must_use]
    pub fn with_sensitive_property(mut self, rule: SensitivePropertyRule) -> Self {
        self.sensitive_properties.push(rule);
        self
    }

    /// True if the resource type is configured as sensitive.
    #[must_use]
    pub fn is_sensitive_resource(&self, resource_type: &str) -> bool {
        self.sensitive_resources.contains(resource_type)
    }

    /// Property rules that apply to a resource type.
    pub fn rules_for<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a SensitivePropertyRule> + 'a {
        self.sensitive_properties
            .iter()
            .filter(move |rule| rule.applies_to(resource_type))
    }
}

impl SensitivePropertyRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, property: PathPattern) -> Self {
        Self {
            resource_type: resource_type.into(),
            property,
        }
    }

    /// True if the rule applies to the resource type.
    #[must_use]
    pub fn applies_to(&self, resource_type: &str) -> bool {
        self.resource_type == "*" || self.resource_type == resource_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.limits.max_properties_per_resource, 100);
        assert_eq!(config.limits.max_property_value_bytes, 10 * 1024);
        assert_eq!(config.limits.max_total_bytes, 10 * 1024 * 1024);
        assert!(config.grouping.enabled);
        assert_eq!(config.grouping.threshold, 10);
        assert!(!config.auto_expand_dangerous);
        assert!(config.danger.is_sensitive_resource("aws_db_instance"));
        assert_eq!(config.danger.rules_for("aws_instance").count(), 1);
    }

    #[test]
    fn test_wildcard_rule_applies_everywhere() {
        let rule = SensitivePropertyRule::new("*", PathPattern::parse("password").unwrap());
        assert!(rule.applies_to("aws_db_instance"));
        assert!(rule.applies_to("google_sql_user"));
    }
}
