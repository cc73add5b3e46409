//! Aggregation of per-resource results.
//!
//! Tallies statistics, sorts resources (removals first, dangerous first within
//! a tier, then by address), and decides whether output is grouped by
//! provider.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::GroupingConfig;
use crate::error::AnalysisWarning;
use crate::plan::Action;

use super::comparator::PropertyChangeAnalysis;
use super::danger::RiskLevel;
use super::replacement::ReplacementType;

/// Analysis of a single resource change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceAnalysis {
    /// Full resource address.
    pub address: String,
    /// Resource type.
    pub resource_type: String,
    /// Resource name within its module.
    pub name: String,
    /// Short provider name, e.g. `aws`.
    pub provider: String,
    /// Planned action.
    pub action: Action,
    /// Property-level diff.
    pub property_changes: PropertyChangeAnalysis,
    /// Replacement classification.
    pub replacement_type: ReplacementType,
    /// Whether a danger trigger fired.
    pub is_dangerous: bool,
    /// Triggers, empty when not dangerous.
    pub danger_reason: String,
    /// Overall risk.
    pub risk_level: RiskLevel,
}

/// Counters over one analysis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeStatistics {
    /// Resources analyzed.
    pub total: usize,
    /// Resources created.
    pub added: usize,
    /// Resources deleted.
    pub removed: usize,
    /// Resources updated or replaced.
    pub modified: usize,
    /// No-op and read resources.
    pub unmodified: usize,
    /// Replaced resources.
    pub replacements: usize,
    /// Replacements that depend on values known after apply.
    pub conditionals: usize,
    /// Dangerous resources, whatever their risk level.
    pub high_risk: usize,
}

impl ChangeStatistics {
    /// Tallies statistics over resource analyses.
    #[must_use]
    pub fn from_resources(resources: &[ResourceAnalysis]) -> Self {
        let mut stats = Self {
            total: resources.len(),
            ..Self::default()
        };

        for resource in resources {
            match resource.action {
                Action::Create => stats.added += 1,
                Action::Delete => stats.removed += 1,
                Action::Update | Action::Replace => stats.modified += 1,
                Action::Read | Action::NoOp => stats.unmodified += 1,
            }
            if resource.action == Action::Replace && resource.replacement_type != ReplacementType::Never {
                stats.replacements += 1;
            }
            if resource.replacement_type == ReplacementType::Conditional {
                stats.conditionals += 1;
            }
            if resource.is_dangerous {
                stats.high_risk += 1;
            }
        }

        stats
    }

    /// Resources that actually change.
    #[must_use]
    pub const fn changed(&self) -> usize {
        self.total - self.unmodified
    }
}

/// Changed resources of one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderGroup {
    /// Short provider name.
    pub provider: String,
    /// Positions in [`AnalysisResult::per_resource`], in sort order.
    pub indices: Vec<usize>,
}

/// Complete output of one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// Resource analyses in display order.
    pub per_resource: Vec<ResourceAnalysis>,
    /// Aggregate counters.
    pub statistics: ChangeStatistics,
    /// Whether output should be grouped by provider.
    pub group_by_provider: bool,
    /// Provider groups, empty unless grouping is active.
    pub provider_groups: Vec<ProviderGroup>,
    /// Passed through from configuration for the presentation layer.
    pub auto_expand_dangerous: bool,
    /// Resources skipped during analysis.
    pub warnings: Vec<AnalysisWarning>,
}

impl AnalysisResult {
    /// Attaches analysis warnings.
    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<AnalysisWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Sets the auto-expand flag.
    #[must_use]
    pub const fn with_auto_expand(mut self, auto_expand_dangerous: bool) -> Self {
        self.auto_expand_dangerous = auto_expand_dangerous;
        self
    }

    /// True if no resources were analyzed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.per_resource.is_empty()
    }

    /// Resources flagged dangerous, in display order.
    pub fn dangerous(&self) -> impl Iterator<Item = &ResourceAnalysis> {
        self.per_resource.iter().filter(|r| r.is_dangerous)
    }
}

/// Combines resource analyses into an [`AnalysisResult`].
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    grouping: &'a GroupingConfig,
}

impl<'a> Aggregator<'a> {
    /// Creates an aggregator.
    #[must_use]
    pub const fn new(grouping: &'a GroupingConfig) -> Self {
        Self { grouping }
    }

    /// Sorts, tallies and groups the resources.
    #[must_use]
    pub fn aggregate(&self, mut resources: Vec<ResourceAnalysis>) -> AnalysisResult {
        resources.sort_by(|a, b| {
            a.action
                .sort_tier()
                .cmp(&b.action.sort_tier())
                .then_with(|| b.is_dangerous.cmp(&a.is_dangerous))
                .then_with(|| a.address.cmp(&b.address))
        });

        let statistics = ChangeStatistics::from_resources(&resources);
        let groups = Self::provider_groups(&resources);

        let group_by_provider = self.grouping.enabled
            && statistics.changed() >= self.grouping.threshold
            && groups.len() > 1;

        debug!(
            "Aggregated {} resources ({} changed, {} providers, grouped: {group_by_provider})",
            statistics.total,
            statistics.changed(),
            groups.len()
        );

        AnalysisResult {
            per_resource: resources,
            statistics,
            group_by_provider,
            provider_groups: if group_by_provider { groups } else { Vec::new() },
            ..AnalysisResult::default()
        }
    }

    /// Groups changed resources by provider, in provider-name order.
    ///
    /// Input is already sorted, so each group keeps the global order.
    fn provider_groups(resources: &[ResourceAnalysis]) -> Vec<ProviderGroup> {
        let mut by_provider: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, resource) in resources.iter().enumerate() {
            if resource.action.is_change() {
                by_provider.entry(resource.provider.as_str()).or_default().push(idx);
            }
        }

        by_provider
            .into_iter()
            .map(|(provider, indices)| ProviderGroup {
                provider: provider.to_string(),
                indices,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(address: &str, provider: &str, action: Action) -> ResourceAnalysis {
        ResourceAnalysis {
            address: address.to_string(),
            resource_type: format!("{provider}_thing"),
            name: address.rsplit('.').next().unwrap_or_default().to_string(),
            provider: provider.to_string(),
            action,
            property_changes: PropertyChangeAnalysis::default(),
            replacement_type: if action == Action::Replace {
                ReplacementType::Always
            } else {
                ReplacementType::Never
            },
            is_dangerous: false,
            danger_reason: String::new(),
            risk_level: RiskLevel::Low,
        }
    }

    fn dangerous(mut r: ResourceAnalysis) -> ResourceAnalysis {
        r.is_dangerous = true;
        r.danger_reason = String::from("sensitive resource replacement");
        r.risk_level = RiskLevel::Critical;
        r
    }

    #[test]
    fn test_empty_input() {
        let grouping = GroupingConfig::default();
        let result = Aggregator::new(&grouping).aggregate(Vec::new());

        assert!(result.is_empty());
        assert_eq!(result.statistics, ChangeStatistics::default());
        assert!(!result.group_by_provider);
    }

    #[test]
    fn test_dangerous_replace_sorts_before_create() {
        let grouping = GroupingConfig::default();
        let resources = vec![
            resource("aws_instance.a", "aws", Action::Create),
            dangerous(resource("aws_db_instance.z", "aws", Action::Replace)),
        ];

        let result = Aggregator::new(&grouping).aggregate(resources);
        assert_eq!(result.per_resource[0].address, "aws_db_instance.z");
        assert_eq!(result.per_resource[1].address, "aws_instance.a");
    }

    #[test]
    fn test_sort_tiers_then_danger_then_address() {
        let grouping = GroupingConfig::default();
        let resources = vec![
            resource("x.noop", "aws", Action::NoOp),
            resource("x.create", "aws", Action::Create),
            resource("x.update_b", "aws", Action::Update),
            dangerous(resource("x.update_z", "aws", Action::Update)),
            resource("x.update_a", "aws", Action::Update),
            resource("x.replace", "aws", Action::Replace),
            resource("x.delete", "aws", Action::Delete),
        ];

        let result = Aggregator::new(&grouping).aggregate(resources);
        let order: Vec<&str> = result.per_resource.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "x.delete",
                "x.replace",
                "x.update_z",
                "x.update_a",
                "x.update_b",
                "x.create",
                "x.noop"
            ]
        );
    }

    #[test]
    fn test_statistics() {
        let grouping = GroupingConfig::default();
        let mut conditional = resource("aws_instance.c", "aws", Action::Replace);
        conditional.replacement_type = ReplacementType::Conditional;
        let resources = vec![
            resource("aws_instance.a", "aws", Action::Create),
            resource("aws_instance.b", "aws", Action::Delete),
            resource("aws_instance.u", "aws", Action::Update),
            dangerous(resource("aws_db_instance.r", "aws", Action::Replace)),
            conditional,
            resource("aws_instance.n", "aws", Action::NoOp),
            resource("data.aws_ami.x", "aws", Action::Read),
        ];

        let stats = Aggregator::new(&grouping).aggregate(resources).statistics;
        assert_eq!(stats.total, 7);
        assert_eq!(stats.added, 1);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.modified, 3);
        assert_eq!(stats.unmodified, 2);
        assert_eq!(stats.replacements, 2);
        assert_eq!(stats.conditionals, 1);
        assert_eq!(stats.high_risk, 1);
        assert_eq!(stats.changed(), 5);
    }

    #[test]
    fn test_grouping_activates_across_providers() {
        let grouping = GroupingConfig::default();
        let resources: Vec<_> = (0..12)
            .map(|i| {
                let provider = if i % 2 == 0 { "aws" } else { "google" };
                resource(&format!("{provider}_thing.r{i:02}"), provider, Action::Update)
            })
            .collect();

        let result = Aggregator::new(&grouping).aggregate(resources);
        assert!(result.group_by_provider);
        assert_eq!(result.provider_groups.len(), 2);
        assert_eq!(result.provider_groups[0].provider, "aws");
        assert_eq!(result.provider_groups[0].indices.len(), 6);
        assert_eq!(result.provider_groups[1].provider, "google");
    }

    #[test]
    fn test_single_provider_is_not_grouped() {
        let grouping = GroupingConfig::default();
        let resources: Vec<_> = (0..12)
            .map(|i| resource(&format!("aws_thing.r{i:02}"), "aws", Action::Update))
            .collect();

        let result = Aggregator::new(&grouping).aggregate(resources);
        assert!(!result.group_by_provider);
        assert!(result.provider_groups.is_empty());
    }

    #[test]
    fn test_noop_resources_do_not_count_toward_threshold() {
        let grouping = GroupingConfig::default();
        let mut resources: Vec<_> = (0..9)
            .map(|i| {
                let provider = if i % 2 == 0 { "aws" } else { "google" };
                resource(&format!("{provider}_thing.r{i}"), provider, Action::Update)
            })
            .collect();
        resources.extend((0..5).map(|i| resource(&format!("azurerm_thing.n{i}"), "azurerm", Action::NoOp)));

        let result = Aggregator::new(&grouping).aggregate(resources);
        assert_eq!(result.statistics.changed(), 9);
        assert!(!result.group_by_provider);
    }

    #[test]
    fn test_groups_exclude_noop() {
        let grouping = GroupingConfig {
            enabled: true,
            threshold: 2,
        };
        let resources = vec![
            resource("aws_thing.a", "aws", Action::Create),
            resource("google_thing.b", "google", Action::Delete),
            resource("azurerm_thing.c", "azurerm", Action::NoOp),
        ];

        let result = Aggregator::new(&grouping).aggregate(resources);
        assert!(result.group_by_provider);
        let providers: Vec<&str> = result.provider_groups.iter().map(|g| g.provider.as_str()).collect();
        assert_eq!(providers, vec!["aws", "google"]);
        // Delete sorts first.
        assert_eq!(result.provider_groups[1].indices, vec![0]);
    }

    #[test]
    fn test_grouping_disabled() {
        let grouping = GroupingConfig {
            enabled: false,
            threshold: 1,
        };
        let resources = vec![
            resource("aws_thing.a", "aws", Action::Create),
            resource("google_thing.b", "google", Action::Create),
        ];

        assert!(!Aggregator::new(&grouping).aggregate(resources).group_by_provider);
    }
}
