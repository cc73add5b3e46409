//! Replacement classification.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::plan::Action;

use super::value::{Path, Value};

/// Whether a resource change destroys and recreates the resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacementType {
    /// Changed in place, or not changed.
    #[default]
    Never,
    /// Replaced only if a value resolved during apply actually differs.
    Conditional,
    /// Definitely replaced.
    Always,
}

impl std::fmt::Display for ReplacementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Never => "never",
            Self::Conditional => "conditional",
            Self::Always => "always",
        };
        write!(f, "{s}")
    }
}

/// Classifies replacements from the action and the replace-triggering paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplacementClassifier;

impl ReplacementClassifier {
    /// Creates a new classifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Classifies one resource change.
    ///
    /// `computed_flags` marks the replace paths whose triggering value is
    /// unknown at plan time. Paths missing from the map count as known.
    #[must_use]
    pub fn classify(
        &self,
        action: Action,
        replace_paths: &[Path],
        computed_flags: &BTreeMap<Path, bool>,
    ) -> ReplacementType {
        if action != Action::Replace {
            return ReplacementType::Never;
        }

        let conditional = replace_paths
            .iter()
            .any(|path| computed_flags.get(path).copied().unwrap_or(false));

        if conditional {
            ReplacementType::Conditional
        } else {
            ReplacementType::Always
        }
    }

    /// Derives the computed flag of each replace path from an after-unknown
    /// mask.
    ///
    /// A path is computed when the mask marks it, one of its ancestors, or
    /// anything nested below it.
    #[must_use]
    pub fn computed_flags(&self, replace_paths: &[Path], after_unknown: &Value) -> BTreeMap<Path, bool> {
        replace_paths
            .iter()
            .map(|path| (path.clone(), Self::is_computed(path, after_unknown)))
            .collect()
    }

    fn is_computed(path: &Path, mask: &Value) -> bool {
        let mut node = mask;
        for segment in path.segments() {
            if node.is_true() {
                return true;
            }
            match node.get(segment) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.contains_true()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths(raw: &[&str]) -> Vec<Path> {
        raw.iter().map(|p| p.parse().unwrap()).collect()
    }

    #[test]
    fn test_non_replace_is_never() {
        let classifier = ReplacementClassifier::new();
        let replace_paths = paths(&["ami"]);
        let flags = BTreeMap::from([(replace_paths[0].clone(), true)]);

        for action in [Action::Create, Action::Update, Action::Delete, Action::NoOp] {
            assert_eq!(
                classifier.classify(action, &replace_paths, &flags),
                ReplacementType::Never
            );
        }
    }

    #[test]
    fn test_known_trigger_is_always() {
        let classifier = ReplacementClassifier::new();
        let replace_paths = paths(&["ami"]);
        let flags = classifier.computed_flags(&replace_paths, &Value::from(json!({})));

        assert_eq!(
            classifier.classify(Action::Replace, &replace_paths, &flags),
            ReplacementType::Always
        );
    }

    #[test]
    fn test_replace_without_paths_is_always() {
        let classifier = ReplacementClassifier::new();
        assert_eq!(
            classifier.classify(Action::Replace, &[], &BTreeMap::new()),
            ReplacementType::Always
        );
    }

    #[test]
    fn test_unknown_trigger_is_conditional() {
        let classifier = ReplacementClassifier::new();
        let replace_paths = paths(&["ami", "subnet_id"]);
        let mask = Value::from(json!({"subnet_id": true}));
        let flags = classifier.computed_flags(&replace_paths, &mask);

        assert_eq!(flags.get(&replace_paths[0]), Some(&false));
        assert_eq!(flags.get(&replace_paths[1]), Some(&true));
        assert_eq!(
            classifier.classify(Action::Replace, &replace_paths, &flags),
            ReplacementType::Conditional
        );
    }

    #[test]
    fn test_computed_ancestor_and_descendant() {
        let classifier = ReplacementClassifier::new();
        let mask = Value::from(json!({"network": true, "disk": [{"size": true}]}));
        let replace_paths = paths(&["network[0].id", "disk", "tags"]);
        let flags = classifier.computed_flags(&replace_paths, &mask);

        assert!(flags[&replace_paths[0]]);
        assert!(flags[&replace_paths[1]]);
        assert!(!flags[&replace_paths[2]]);
    }

    #[test]
    fn test_key_and_index_do_not_collide() {
        let classifier = ReplacementClassifier::new();
        let mask = Value::from(json!({"tags": {"1": true}}));
        let by_index = Path::root().key("tags").index(1);
        let by_key = Path::root().key("tags").key("1");
        let flags = classifier.computed_flags(&[by_index.clone(), by_key.clone()], &mask);

        assert!(!flags[&by_index]);
        assert!(flags[&by_key]);
    }
}
