//! Analysis driver: `(PlanData, AnalyzerConfig) -> AnalysisResult`.

use tracing::{debug, info, warn};

use crate::config::AnalyzerConfig;
use crate::error::AnalysisWarning;
use crate::plan::{provider_short_name, Action, PlanData, ResourceChangeInput};

use super::aggregator::{Aggregator, AnalysisResult, ResourceAnalysis};
use super::comparator::{DiffInput, ValueComparator};
use super::danger::{DangerEvaluator, SensitivityMatcher};
use super::replacement::ReplacementClassifier;
use super::value::Path;

/// Runs the full analysis over a plan.
///
/// The engine is a pure function of the plan and the configuration. It never
/// fails: malformed resources are skipped and reported as warnings.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisEngine<'a> {
    config: &'a AnalyzerConfig,
}

impl<'a> AnalysisEngine<'a> {
    /// Creates an engine bound to a configuration.
    #[must_use]
    pub const fn new(config: &'a AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Analyzes every resource change in the plan.
    #[must_use]
    pub fn analyze(&self, plan: &PlanData) -> AnalysisResult {
        info!("Analyzing {} resource changes", plan.resource_changes.len());

        let mut warnings = Vec::new();
        let mut resources = Vec::with_capacity(plan.resource_changes.len());

        for change in &plan.resource_changes {
            match Self::required_fields(change) {
                Ok((resource_type, action)) => {
                    resources.push(self.analyze_resource(change, resource_type, action));
                }
                Err(warning) => {
                    warn!("{warning}");
                    warnings.push(warning);
                }
            }
        }

        let result = Aggregator::new(&self.config.grouping)
            .aggregate(resources)
            .with_warnings(warnings)
            .with_auto_expand(self.config.auto_expand_dangerous);

        info!(
            "Analysis complete: {} resources, {} dangerous, {} skipped",
            result.statistics.total,
            result.statistics.high_risk,
            result.warnings.len()
        );

        result
    }

    fn required_fields(change: &ResourceChangeInput) -> Result<(&str, Action), AnalysisWarning> {
        let missing = |field: &str| AnalysisWarning::MalformedResource {
            address: change.address.clone(),
            missing: field.to_string(),
        };

        let resource_type = change
            .resource_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| missing("resource_type"))?;
        let action = change.action.ok_or_else(|| missing("action"))?;

        Ok((resource_type, action))
    }

    fn analyze_resource(
        &self,
        change: &ResourceChangeInput,
        resource_type: &str,
        action: Action,
    ) -> ResourceAnalysis {
        let policy = &self.config.danger;

        let input = DiffInput::new(&change.before, &change.after)
            .after_unknown(&change.after_unknown)
            .before_unknown(&change.before_unknown)
            .sensitive(&change.before_sensitive, &change.after_sensitive);
        let property_changes = ValueComparator::new(&self.config.limits)
            .with_matcher(SensitivityMatcher::new(policy, resource_type))
            .compare(&input, &Path::root());

        let classifier = ReplacementClassifier::new();
        let computed = classifier.computed_flags(&change.replace_paths, &change.after_unknown);
        let replacement_type = classifier.classify(action, &change.replace_paths, &computed);

        let assessment = DangerEvaluator::new(policy).evaluate(resource_type, action, &property_changes);

        debug!(
            "{}: {action}, {} changes{}, replacement {replacement_type}, risk {}",
            change.address,
            property_changes.count,
            if property_changes.truncated { " (truncated)" } else { "" },
            assessment.risk_level
        );

        ResourceAnalysis {
            address: change.address.clone(),
            resource_type: resource_type.to_string(),
            name: change.name.clone(),
            provider: provider_short_name(change.provider_name.as_deref(), resource_type),
            action,
            property_changes,
            replacement_type,
            is_dangerous: assessment.is_dangerous,
            danger_reason: assessment.reason,
            risk_level: assessment.risk_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{PathPattern, ReplacementType, RiskLevel, Value, SENSITIVE_PLACEHOLDER};
    use crate::config::{DangerPolicy, SensitivePropertyRule};
    use serde_json::json;

    fn v(value: serde_json::Value) -> Value {
        Value::from(value)
    }

    #[test]
    fn test_empty_plan_yields_empty_result() {
        let config = AnalyzerConfig::default();
        let result = AnalysisEngine::new(&config).analyze(&PlanData::default());

        assert!(result.is_empty());
        assert_eq!(result.statistics.total, 0);
        assert!(!result.group_by_provider);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_malformed_resources_are_skipped() {
        let config = AnalyzerConfig::default();
        let mut no_action = ResourceChangeInput::new("aws_instance.a", "aws_instance", Action::Create);
        no_action.action = None;
        let mut no_type = ResourceChangeInput::new("aws_instance.b", "aws_instance", Action::Create);
        no_type.resource_type = None;
        let good = ResourceChangeInput::new("aws_instance.c", "aws_instance", Action::Create);

        let plan = PlanData::new(vec![no_action, no_type, good]);
        let result = AnalysisEngine::new(&config).analyze(&plan);

        assert_eq!(result.per_resource.len(), 1);
        assert_eq!(result.per_resource[0].address, "aws_instance.c");
        assert_eq!(
            result.warnings,
            vec![
                AnalysisWarning::MalformedResource {
                    address: String::from("aws_instance.a"),
                    missing: String::from("action"),
                },
                AnalysisWarning::MalformedResource {
                    address: String::from("aws_instance.b"),
                    missing: String::from("resource_type"),
                },
            ]
        );
    }

    #[test]
    fn test_sensitive_user_data_update() {
        let mut config = AnalyzerConfig::default();
        config.danger = DangerPolicy::empty().with_sensitive_property(SensitivePropertyRule::new(
            "aws_instance",
            PathPattern::parse("user_data").unwrap(),
        ));
        let change = ResourceChangeInput::new("aws_instance.web", "aws_instance", Action::Update)
            .with_values(v(json!({"user_data": "foo"})), v(json!({"user_data": "bar"})));

        let result = AnalysisEngine::new(&config).analyze(&PlanData::new(vec![change]));
        let resource = &result.per_resource[0];

        assert!(resource.is_dangerous);
        assert_eq!(resource.risk_level, RiskLevel::High);
        assert_eq!(resource.danger_reason, "sensitive property changed: user_data");
        let diff = &resource.property_changes.changes[0];
        assert_eq!(diff.before, Value::from(SENSITIVE_PLACEHOLDER));
        assert_eq!(diff.after, Value::from(SENSITIVE_PLACEHOLDER));
        assert_eq!(result.statistics.high_risk, 1);
    }

    #[test]
    fn test_block_without_sensitive_property_is_low_risk() {
        let mut config = AnalyzerConfig::default();
        config.danger = DangerPolicy::empty().with_sensitive_property(SensitivePropertyRule::new(
            "aws_instance",
            PathPattern::parse("tags.secret").unwrap(),
        ));
        let change = ResourceChangeInput::new("aws_instance.web", "aws_instance", Action::Update)
            .with_values(v(json!({"ami": "a"})), v(json!({"ami": "a", "tags": {"Name": "web"}})));

        let result = AnalysisEngine::new(&config).analyze(&PlanData::new(vec![change]));
        let resource = &result.per_resource[0];

        assert!(!resource.is_dangerous);
        assert_eq!(resource.risk_level, RiskLevel::Low);
        assert!(resource.danger_reason.is_empty());
        assert_eq!(resource.property_changes.sensitive_count, 0);
        assert_eq!(resource.property_changes.changes[0].after, v(json!({"Name": "web"})));
    }

    #[test]
    fn test_sensitive_change_past_count_cap_is_dangerous() {
        let mut config = AnalyzerConfig::default();
        config.limits.max_properties_per_resource = 1;
        config.danger = DangerPolicy::empty().with_sensitive_property(SensitivePropertyRule::new(
            "aws_instance",
            PathPattern::parse("user_data").unwrap(),
        ));
        let change = ResourceChangeInput::new("aws_instance.web", "aws_instance", Action::Update).with_values(
            v(json!({"ami": "a", "user_data": "foo"})),
            v(json!({"ami": "b", "user_data": "bar"})),
        );

        let result = AnalysisEngine::new(&config).analyze(&PlanData::new(vec![change]));
        let resource = &result.per_resource[0];
        let changes = &resource.property_changes;

        assert_eq!(changes.count, 2);
        assert_eq!(changes.changes.len(), 1);
        assert!(changes.truncated);
        assert!(!changes.changes[0].sensitive);
        assert_eq!(changes.sensitive_count, 1);
        assert!(resource.is_dangerous);
        assert_eq!(resource.danger_reason, "sensitive property changed");
        assert_eq!(resource.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_database_replacement_is_critical_and_conditional() {
        let config = AnalyzerConfig::default();
        let change = ResourceChangeInput::new("aws_db_instance.main", "aws_db_instance", Action::Replace)
            .with_values(
                v(json!({"engine_version": "14", "availability_zone": "a"})),
                v(json!({"engine_version": "15"})),
            )
            .with_after_unknown(v(json!({"availability_zone": true})))
            .with_replace_paths(vec![Path::root().key("availability_zone")])
            .with_provider("registry.terraform.io/hashicorp/aws");

        let result = AnalysisEngine::new(&config).analyze(&PlanData::new(vec![change]));
        let resource = &result.per_resource[0];

        assert_eq!(resource.provider, "aws");
        assert_eq!(resource.replacement_type, ReplacementType::Conditional);
        assert_eq!(resource.risk_level, RiskLevel::Critical);
        assert!(resource.danger_reason.starts_with("sensitive resource replacement"));
        assert_eq!(result.statistics.replacements, 1);
        assert_eq!(result.statistics.conditionals, 1);
    }

    #[test]
    fn test_auto_expand_is_passed_through() {
        let mut config = AnalyzerConfig::default();
        config.auto_expand_dangerous = true;
        let result = AnalysisEngine::new(&config).analyze(&PlanData::default());
        assert!(result.auto_expand_dangerous);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let config = AnalyzerConfig::default();
        let plan = PlanData::new(vec![
            ResourceChangeInput::new("google_storage_bucket.b", "google_storage_bucket", Action::Delete),
            ResourceChangeInput::new("aws_instance.a", "aws_instance", Action::Update)
                .with_values(v(json!({"tags": {"b": 1, "a": 2}})), v(json!({"tags": {"a": 3}}))),
        ]);

        let engine = AnalysisEngine::new(&config);
        let first = serde_json::to_string(&engine.analyze(&plan)).unwrap();
        let second = serde_json::to_string(&engine.analyze(&plan)).unwrap();
        assert_eq!(first, second);
    }
}
