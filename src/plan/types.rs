//! Plan input types consumed by the analysis engine.
//!
//! These mirror one entry of a decoded plan's `resource_changes` list. Fields
//! the engine requires (`action`, `resource_type`) are optional here so a
//! malformed entry can still reach the engine and be skipped with a warning.

use serde::{Deserialize, Serialize};

use crate::analysis::{Path, Value};

/// Action planned for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Resource will be created.
    Create,
    /// Data source will be read.
    Read,
    /// Resource will be updated in place.
    Update,
    /// Resource will be destroyed and recreated.
    Replace,
    /// Resource will be destroyed.
    Delete,
    /// Nothing to do.
    NoOp,
}

impl Action {
    /// Maps a Terraform action list (`["delete", "create"]`, `["no-op"]`, ...)
    /// to a single action. Returns `None` for empty or unrecognized lists.
    #[must_use]
    pub fn from_actions<S: AsRef<str>>(actions: &[S]) -> Option<Self> {
        let actions: Vec<&str> = actions.iter().map(AsRef::as_ref).collect();
        match actions.as_slice() {
            ["delete", "create"] | ["create", "delete"] => Some(Self::Replace),
            ["create"] => Some(Self::Create),
            ["read"] => Some(Self::Read),
            ["update"] => Some(Self::Update),
            ["delete"] => Some(Self::Delete),
            ["no-op"] => Some(Self::NoOp),
            _ => None,
        }
    }

    /// Sort tier: removals first, then replacements, modifications,
    /// additions, and finally resources that do not change.
    #[must_use]
    pub const fn sort_tier(self) -> u8 {
        match self {
            Self::Delete => 0,
            Self::Replace => 1,
            Self::Update => 2,
            Self::Create => 3,
            Self::Read | Self::NoOp => 4,
        }
    }

    /// True if the resource actually changes.
    #[must_use]
    pub const fn is_change(self) -> bool {
        !matches!(self, Self::Read | Self::NoOp)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
            Self::NoOp => "no-op",
        };
        write!(f, "{s}")
    }
}

/// One resource change as supplied by the plan loader.
///
/// `after_unknown`, `before_unknown` and the sensitivity masks mirror the
/// shape of `before`/`after` with boolean leaves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceChangeInput {
    /// Full resource address, e.g. `module.db.aws_db_instance.main`.
    pub address: String,
    /// Resource type, e.g. `aws_db_instance`.
    pub resource_type: Option<String>,
    /// Resource name within its module.
    pub name: String,
    /// Provider source, e.g. `registry.terraform.io/hashicorp/aws`.
    pub provider_name: Option<String>,
    /// Planned action.
    pub action: Option<Action>,
    /// Value before the change.
    pub before: Value,
    /// Value after the change.
    pub after: Value,
    /// Mask of values only known after apply.
    pub after_unknown: Value,
    /// Mask of values that were already unknown in the prior state.
    pub before_unknown: Value,
    /// Mask of sensitive values before the change.
    pub before_sensitive: Value,
    /// Mask of sensitive values after the change.
    pub after_sensitive: Value,
    /// Paths whose change forces replacement.
    pub replace_paths: Vec<Path>,
}

impl ResourceChangeInput {
    /// Creates a change with empty values and masks.
    ///
    /// The name defaults to the last dotted component of the address.
    #[must_use]
    pub fn new(address: impl Into<String>, resource_type: impl Into<String>, action: Action) -> Self {
        let address = address.into();
        let name = address.rsplit('.').next().unwrap_or_default().to_string();
        Self {
            address,
            resource_type: Some(resource_type.into()),
            name,
            action: Some(action),
            ..Self::default()
        }
    }

    /// Sets the before and after values.
    #[must_use]
    pub fn with_values(mut self, before: Value, after: Value) -> Self {
        self.before = before;
        self.after = after;
        self
    }

    /// Sets the after-unknown mask.
    #[must_use]
    pub fn with_after_unknown(mut self, mask: Value) -> Self {
        self.after_unknown = mask;
        self
    }

    /// Sets the before-unknown mask.
    #[must_use]
    pub fn with_before_unknown(mut self, mask: Value) -> Self {
        self.before_unknown = mask;
        self
    }

    /// Sets both sensitivity masks.
    #[must_use]
    pub fn with_sensitive(mut self, before: Value, after: Value) -> Self {
        self.before_sensitive = before;
        self.after_sensitive = after;
        self
    }

    /// Sets the replace-triggering paths.
    #[must_use]
    pub fn with_replace_paths(mut self, paths: Vec<Path>) -> Self {
        self.replace_paths = paths;
        self
    }

    /// Sets the provider source.
    #[must_use]
    pub fn with_provider(mut self, provider_name: impl Into<String>) -> Self {
        self.provider_name = Some(provider_name.into());
        self
    }
}

/// A decoded plan.
///
/// The default value is the empty plan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanData {
    /// Plan document format version.
    pub format_version: Option<String>,
    /// Terraform version that produced the plan.
    pub terraform_version: Option<String>,
    /// All resource changes in plan order.
    pub resource_changes: Vec<ResourceChangeInput>,
}

impl PlanData {
    /// Creates a plan from resource changes.
    #[must_use]
    pub const fn new(resource_changes: Vec<ResourceChangeInput>) -> Self {
        Self {
            format_version: None,
            terraform_version: None,
            resource_changes,
        }
    }

    /// True if the plan has no resource changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resource_changes.is_empty()
    }
}

/// Short provider name for grouping.
///
/// Uses the last component of the provider source
/// (`registry.terraform.io/hashicorp/aws` gives `aws`), falling back to the
/// resource type prefix (`google_sql_database_instance` gives `google`).
#[must_use]
pub fn provider_short_name(provider_name: Option<&str>, resource_type: &str) -> String {
    provider_name
        .and_then(|p| p.rsplit('/').next())
        .filter(|p| !p.is_empty())
        .or_else(|| resource_type.split('_').next())
        .filter(|p| !p.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_terraform_lists() {
        assert_eq!(Action::from_actions(&["delete", "create"]), Some(Action::Replace));
        assert_eq!(Action::from_actions(&["create", "delete"]), Some(Action::Replace));
        assert_eq!(Action::from_actions(&["no-op"]), Some(Action::NoOp));
        assert_eq!(Action::from_actions(&["read"]), Some(Action::Read));
        assert_eq!(Action::from_actions::<&str>(&[]), None);
        assert_eq!(Action::from_actions(&["forget"]), None);
    }

    #[test]
    fn test_sort_tiers() {
        assert!(Action::Delete.sort_tier() < Action::Replace.sort_tier());
        assert!(Action::Replace.sort_tier() < Action::Update.sort_tier());
        assert!(Action::Update.sort_tier() < Action::Create.sort_tier());
        assert!(Action::Create.sort_tier() < Action::NoOp.sort_tier());
        assert_eq!(Action::Read.sort_tier(), Action::NoOp.sort_tier());
    }

    #[test]
    fn test_provider_short_name() {
        assert_eq!(
            provider_short_name(Some("registry.terraform.io/hashicorp/aws"), "aws_instance"),
            "aws"
        );
        assert_eq!(provider_short_name(None, "google_sql_database_instance"), "google");
        assert_eq!(provider_short_name(Some(""), "random_id"), "random");
        assert_eq!(provider_short_name(None, ""), "unknown");
    }

    #[test]
    fn test_new_derives_name() {
        let change = ResourceChangeInput::new("module.db.aws_db_instance.main", "aws_db_instance", Action::Update);
        assert_eq!(change.name, "main");
        assert_eq!(change.action, Some(Action::Update));
    }
}
