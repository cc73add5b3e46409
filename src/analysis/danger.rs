//! Sensitivity and danger evaluation.
//!
//! [`SensitivityMatcher`] answers "is this property path sensitive for this
//! resource type" and is consulted by the comparator while it produces
//! changes. [`DangerEvaluator`] looks at a finished resource diff and decides
//! whether the resource is dangerous and how risky it is.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::config::DangerPolicy;
use crate::plan::Action;

use super::comparator::PropertyChangeAnalysis;
use super::value::{Path, Value};

/// Risk classification, ordered `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Creations, plain updates, no-ops.
    #[default]
    Low,
    /// Replacement without a danger trigger.
    Medium,
    /// Deletions and other dangerous changes.
    High,
    /// Replacement of a sensitive resource type.
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Matches property paths against the policy rules for one resource type.
#[derive(Debug, Clone, Copy)]
pub struct SensitivityMatcher<'a> {
    policy: &'a DangerPolicy,
    resource_type: &'a str,
}

impl<'a> SensitivityMatcher<'a> {
    /// Creates a matcher for one resource type.
    #[must_use]
    pub const fn new(policy: &'a DangerPolicy, resource_type: &'a str) -> Self {
        Self {
            policy,
            resource_type,
        }
    }

    /// True if a change at `path` touches a sensitive property.
    ///
    /// Either `path` lies at or under a rule's location, or one of the values
    /// found at `path` contains that location. Rules that match nothing are
    /// silently ignored.
    #[must_use]
    pub fn matches(&self, path: &Path, before: Option<&Value>, after: Option<&Value>) -> bool {
        self.policy.rules_for(self.resource_type).any(|rule| {
            rule.property.covers(path)
                || [before, after]
                    .into_iter()
                    .flatten()
                    .any(|value| rule.property.reaches(path, value))
        })
    }
}

/// Outcome of a danger evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DangerAssessment {
    /// Whether any danger trigger fired.
    pub is_dangerous: bool,
    /// Human-readable triggers, empty when not dangerous.
    pub reason: String,
    /// Overall risk.
    pub risk_level: RiskLevel,
}

/// Evaluates resource changes against a danger policy.
#[derive(Debug, Clone, Copy)]
pub struct DangerEvaluator<'a> {
    policy: &'a DangerPolicy,
}

impl<'a> DangerEvaluator<'a> {
    /// Creates an evaluator.
    #[must_use]
    pub const fn new(policy: &'a DangerPolicy) -> Self {
        Self { policy }
    }

    /// Evaluates one resource change.
    ///
    /// Dangerous when a sensitive resource type is replaced or deleted, or
    /// when an update or replacement touches a sensitive property. Risk:
    /// critical for a dangerous replacement of a sensitive type, high for
    /// other dangerous changes and every deletion, medium for other
    /// replacements, low otherwise.
    #[must_use]
    pub fn evaluate(
        &self,
        resource_type: &str,
        action: Action,
        changes: &PropertyChangeAnalysis,
    ) -> DangerAssessment {
        let sensitive_type = self.policy.is_sensitive_resource(resource_type);
        let mut reasons = Vec::new();

        let resource_trigger = sensitive_type && matches!(action, Action::Replace | Action::Delete);
        if resource_trigger {
            reasons.push(if action == Action::Replace {
                String::from("sensitive resource replacement")
            } else {
                String::from("sensitive resource deletion")
            });
        }

        let property_trigger =
            matches!(action, Action::Update | Action::Replace) && changes.sensitive_count > 0;
        if property_trigger {
            reasons.push(Self::property_reason(changes));
        }

        let is_dangerous = resource_trigger || property_trigger;
        let risk_level = if is_dangerous && sensitive_type && action == Action::Replace {
            RiskLevel::Critical
        } else if is_dangerous || action == Action::Delete {
            RiskLevel::High
        } else if action == Action::Replace {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        DangerAssessment {
            is_dangerous,
            reason: reasons.join("; "),
            risk_level,
        }
    }

    /// Names the sensitive properties that changed, in diff order.
    fn property_reason(changes: &PropertyChangeAnalysis) -> String {
        let mut seen = BTreeSet::new();
        let names: Vec<String> = changes
            .changes
            .iter()
            .filter(|change| change.sensitive)
            .map(|change| change.path.to_string())
            .filter(|name| seen.insert(name.clone()))
            .collect();

        if names.is_empty() {
            // Every sensitive change fell past the truncation point.
            String::from("sensitive property changed")
        } else {
            format!("sensitive property changed: {}", names.join(", "))
        }
    }
}
