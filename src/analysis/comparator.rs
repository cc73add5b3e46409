//! Recursive value comparator.
//!
//! Walks a resource's before/after value trees in a fixed order (map keys
//! sorted, list indices ascending) and emits one [`PropertyChange`] per
//! differing location. Unknown and sensitive masks are applied while walking,
//! so no raw sensitive value ever lands in the output.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::config::PerformanceLimits;

use super::danger::SensitivityMatcher;
use super::value::{Path, PathSegment, Value};

/// Display value for anything masked as sensitive.
pub const SENSITIVE_PLACEHOLDER: &str = "(sensitive value)";

/// Display value for anything only known after apply.
pub const UNKNOWN_PLACEHOLDER: &str = "(known after apply)";

/// Appended to values cut at the per-value size cap.
const TRUNCATION_MARKER: &str = "...";

/// Kind of property change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    /// Present only after.
    Add,
    /// Present only before.
    Remove,
    /// Present on both sides with different values, or unknown.
    Update,
}

/// Which side of an unknown change is unresolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownKind {
    /// Both sides are known.
    #[default]
    None,
    /// Only the prior value was unknown.
    Before,
    /// Only the planned value is unknown.
    After,
    /// Unknown on both sides.
    Both,
}

/// One field-level difference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyChange {
    /// Location within the resource.
    pub path: Path,
    /// Kind of change.
    pub action: ChangeAction,
    /// Display value before (masked and size-capped).
    pub before: Value,
    /// Display value after (masked and size-capped).
    pub after: Value,
    /// Whether the values were masked as sensitive.
    pub sensitive: bool,
    /// Whether either side is only known after apply.
    pub unknown: bool,
    /// Which side is unknown.
    pub unknown_kind: UnknownKind,
    /// Captured display bytes for this change.
    pub size_bytes: usize,
}

/// All property changes captured for one resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertyChangeAnalysis {
    /// Captured changes in traversal order.
    pub changes: Vec<PropertyChange>,
    /// Every candidate change encountered, including ones not captured.
    pub count: usize,
    /// Sum of `size_bytes` over `changes`.
    pub total_size_bytes: usize,
    /// Whether any limit cut the capture short.
    pub truncated: bool,
    /// Candidate changes that were sensitive, including ones not captured.
    pub sensitive_count: usize,
}

impl PropertyChangeAnalysis {
    /// True if no differences were found.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Inputs for one comparison.
///
/// Masks mirror the value shapes with boolean leaves; a missing mask marks
/// nothing.
#[derive(Debug, Clone, Copy)]
pub struct DiffInput<'v> {
    before: &'v Value,
    after: &'v Value,
    after_unknown: Option<&'v Value>,
    before_unknown: Option<&'v Value>,
    before_sensitive: Option<&'v Value>,
    after_sensitive: Option<&'v Value>,
}

impl<'v> DiffInput<'v> {
    /// Compares `before` against `after` with no masks.
    #[must_use]
    pub const fn new(before: &'v Value, after: &'v Value) -> Self {
        Self {
            before,
            after,
            after_unknown: None,
            before_unknown: None,
            before_sensitive: None,
            after_sensitive: None,
        }
    }

    /// Sets the after-unknown mask.
    #[must_use]
    pub const fn after_unknown(mut self, mask: &'v Value) -> Self {
        self.after_unknown = Some(mask);
        self
    }

    /// Sets the before-unknown mask.
    #[must_use]
    pub const fn before_unknown(mut self, mask: &'v Value) -> Self {
        self.before_unknown = Some(mask);
        self
    }

    /// Sets both sensitivity masks.
    #[must_use]
    pub const fn sensitive(mut self, before: &'v Value, after: &'v Value) -> Self {
        self.before_sensitive = Some(before);
        self.after_sensitive = Some(after);
        self
    }
}

/// Recursive comparator bounded by [`PerformanceLimits`].
#[derive(Debug, Clone, Copy)]
pub struct ValueComparator<'a> {
    limits: &'a PerformanceLimits,
    matcher: Option<SensitivityMatcher<'a>>,
}

impl<'a> ValueComparator<'a> {
    /// Creates a comparator with no policy-based sensitivity.
    #[must_use]
    pub const fn new(limits: &'a PerformanceLimits) -> Self {
        Self {
            limits,
            matcher: None,
        }
    }

    /// Masks paths matched by the policy for one resource type.
    #[must_use]
    pub const fn with_matcher(mut self, matcher: SensitivityMatcher<'a>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    /// Compares two values with an after-unknown mask.
    #[must_use]
    pub fn compare_values(
        &self,
        before: &Value,
        after: &Value,
        after_unknown: &Value,
        base: &Path,
    ) -> PropertyChangeAnalysis {
        self.compare(&DiffInput::new(before, after).after_unknown(after_unknown), base)
    }

    /// Compares the inputs, emitting changes under `base`.
    ///
    /// A null side facing a map at the root is treated as an empty map, so
    /// created and destroyed resources list each top-level attribute.
    #[must_use]
    pub fn compare(&self, input: &DiffInput<'_>, base: &Path) -> PropertyChangeAnalysis {
        let empty = Value::Map(BTreeMap::new());
        let (before, after) = match (input.before, input.after) {
            (Value::Null, after @ Value::Map(_)) => (&empty, after),
            (before @ Value::Map(_), Value::Null) => (before, &empty),
            pair => pair,
        };

        let mut walker = DiffWalker {
            limits: self.limits,
            matcher: self.matcher,
            analysis: PropertyChangeAnalysis::default(),
            stopped: false,
        };
        walker.walk(base, Some(before), Some(after), Masks::from_input(input));

        let analysis = walker.analysis;
        if analysis.truncated {
            debug!(
                "Captured {} of {} changes under '{base}' ({} bytes)",
                analysis.changes.len(),
                analysis.count,
                analysis.total_size_bytes
            );
        }
        analysis
    }
}

/// A boolean mask positioned at the node being compared.
#[derive(Debug, Clone, Copy, Default)]
struct Mask<'m> {
    node: Option<&'m Value>,
    inherited: bool,
}

impl<'m> Mask<'m> {
    const fn new(node: Option<&'m Value>) -> Self {
        Self {
            node,
            inherited: false,
        }
    }

    /// Marked at exactly this node (or by an ancestor).
    fn marked(self) -> bool {
        self.inherited || self.node.is_some_and(Value::is_true)
    }

    /// Something strictly below this node is marked.
    fn nested(self) -> bool {
        self.node.is_some_and(|n| n.is_container() && n.contains_true())
    }

    /// This node or anything under it is marked.
    fn covers(self) -> bool {
        self.marked() || self.nested()
    }

    fn child(self, segment: &PathSegment) -> Self {
        Self {
            node: self.node.and_then(|n| n.get(segment)),
            inherited: self.marked(),
        }
    }

    fn keys(self) -> impl Iterator<Item = &'m str> {
        self.node
            .into_iter()
            .filter_map(|n| match n {
                Value::Map(map) => Some(map.keys().map(String::as_str)),
                _ => None,
            })
            .flatten()
    }

    fn list_len(self) -> usize {
        match self.node {
            Some(Value::List(items)) => items.len(),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Masks<'m> {
    after_unknown: Mask<'m>,
    before_unknown: Mask<'m>,
    before_sensitive: Mask<'m>,
    after_sensitive: Mask<'m>,
}

impl<'m> Masks<'m> {
    const fn from_input(input: &DiffInput<'m>) -> Self {
        Self {
            after_unknown: Mask::new(input.after_unknown),
            before_unknown: Mask::new(input.before_unknown),
            before_sensitive: Mask::new(input.before_sensitive),
            after_sensitive: Mask::new(input.after_sensitive),
        }
    }

    fn child(self, segment: &PathSegment) -> Self {
        Self {
            after_unknown: self.after_unknown.child(segment),
            before_unknown: self.before_unknown.child(segment),
            before_sensitive: self.before_sensitive.child(segment),
            after_sensitive: self.after_sensitive.child(segment),
        }
    }

    fn nested_unknown(self) -> bool {
        self.after_unknown.nested() || self.before_unknown.nested()
    }
}

/// Mutable state for one comparison.
struct DiffWalker<'a> {
    limits: &'a PerformanceLimits,
    matcher: Option<SensitivityMatcher<'a>>,
    analysis: PropertyChangeAnalysis,
    /// Set once the byte budget is exhausted; nothing more is scanned.
    stopped: bool,
}

impl DiffWalker<'_> {
    fn walk(&mut self, path: &Path, before: Option<&Value>, after: Option<&Value>, masks: Masks<'_>) {
        if self.stopped {
            return;
        }

        // Null and absent are the same thing for classification.
        let before = before.filter(|v| !v.is_null());
        let after = after.filter(|v| !v.is_null());

        // Unknown takes precedence over every before/after classification.
        let after_unknown = masks.after_unknown.marked();
        let before_unknown = masks.before_unknown.marked();
        if after_unknown || before_unknown {
            let kind = match (before_unknown, after_unknown) {
                (true, true) => UnknownKind::Both,
                (true, false) => UnknownKind::Before,
                _ => UnknownKind::After,
            };
            self.record(path, ChangeAction::Update, before, after, kind, masks);
            return;
        }

        let nested_unknown = masks.nested_unknown();
        if !nested_unknown && before == after {
            return;
        }

        match (before, after) {
            (Some(Value::Map(b)), Some(Value::Map(a))) => self.walk_map(path, Some(b), Some(a), masks),
            (Some(Value::List(b)), Some(Value::List(a))) => {
                self.walk_list(path, Some(b), Some(a), masks);
            }
            _ if nested_unknown => self.walk_partial(path, before, after, masks),
            (Some(b), None) => self.record(path, ChangeAction::Remove, Some(b), None, UnknownKind::None, masks),
            (None, Some(a)) => self.record(path, ChangeAction::Add, None, Some(a), UnknownKind::None, masks),
            (Some(b), Some(a)) => {
                self.record(path, ChangeAction::Update, Some(b), Some(a), UnknownKind::None, masks);
            }
            (None, None) => {}
        }
    }

    /// Descends where the masks have unknown entries below this node but the
    /// values are not a matching pair of containers.
    fn walk_partial(&mut self, path: &Path, before: Option<&Value>, after: Option<&Value>, masks: Masks<'_>) {
        let template = before
            .or(after)
            .or(masks.after_unknown.node)
            .or(masks.before_unknown.node);

        match template {
            Some(Value::Map(_)) if fits_map(before) && fits_map(after) => {
                self.walk_map(path, as_map(before), as_map(after), masks);
            }
            Some(Value::List(_)) if fits_list(before) && fits_list(after) => {
                self.walk_list(path, as_list(before), as_list(after), masks);
            }
            _ => {
                // Shapes disagree; the planned value is partly unknown, so the
                // whole node is.
                let kind = if masks.after_unknown.nested() {
                    UnknownKind::After
                } else {
                    UnknownKind::Before
                };
                self.record(path, ChangeAction::Update, before, after, kind, masks);
            }
        }
    }

    fn walk_map(
        &mut self,
        path: &Path,
        before: Option<&BTreeMap<String, Value>>,
        after: Option<&BTreeMap<String, Value>>,
        masks: Masks<'_>,
    ) {
        let mut keys: BTreeSet<&str> = BTreeSet::new();
        keys.extend(before.into_iter().flat_map(|m| m.keys().map(String::as_str)));
        keys.extend(after.into_iter().flat_map(|m| m.keys().map(String::as_str)));
        keys.extend(masks.after_unknown.keys());
        keys.extend(masks.before_unknown.keys());

        for key in keys {
            if self.stopped {
                break;
            }
            let segment = PathSegment::Key(key.to_string());
            let child_masks = masks.child(&segment);
            let child_path = path.child(segment);
            self.walk(
                &child_path,
                before.and_then(|m| m.get(key)),
                after.and_then(|m| m.get(key)),
                child_masks,
            );
        }
    }

    fn walk_list(&mut self, path: &Path, before: Option<&[Value]>, after: Option<&[Value]>, masks: Masks<'_>) {
        let len = [
            before.map_or(0, <[Value]>::len),
            after.map_or(0, <[Value]>::len),
            masks.after_unknown.list_len(),
            masks.before_unknown.list_len(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0);

        for idx in 0..len {
            if self.stopped {
                break;
            }
            let segment = PathSegment::Index(idx);
            let child_masks = masks.child(&segment);
            let child_path = path.child(segment);
            self.walk(
                &child_path,
                before.and_then(|items| items.get(idx)),
                after.and_then(|items| items.get(idx)),
                child_masks,
            );
        }
    }

    /// Counts a candidate change and captures it if the limits allow.
    fn record(
        &mut self,
        path: &Path,
        action: ChangeAction,
        before: Option<&Value>,
        after: Option<&Value>,
        unknown_kind: UnknownKind,
        masks: Masks<'_>,
    ) {
        let sensitive = masks.before_sensitive.covers()
            || masks.after_sensitive.covers()
            || self.matcher.is_some_and(|m| m.matches(path, before, after));

        self.analysis.count += 1;
        if sensitive {
            self.analysis.sensitive_count += 1;
        }

        if self.analysis.changes.len() >= self.limits.max_properties_per_resource {
            self.analysis.truncated = true;
            return;
        }

        let before_unknown = matches!(unknown_kind, UnknownKind::Before | UnknownKind::Both);
        let after_unknown = matches!(unknown_kind, UnknownKind::After | UnknownKind::Both);
        let (before, before_size) = self.display(before, sensitive, before_unknown);
        let (after, after_size) = self.display(after, sensitive, after_unknown);
        let size_bytes = before_size + after_size;

        if self.analysis.total_size_bytes + size_bytes > self.limits.max_total_bytes {
            warn!(
                "Byte budget of {} reached at '{path}', stopping analysis for this resource",
                self.limits.max_total_bytes
            );
            self.analysis.truncated = true;
            self.stopped = true;
            return;
        }

        self.analysis.total_size_bytes += size_bytes;
        self.analysis.changes.push(PropertyChange {
            path: path.clone(),
            action,
            before,
            after,
            sensitive,
            unknown: unknown_kind != UnknownKind::None,
            unknown_kind,
            size_bytes,
        });
    }

    /// Produces the captured form of one side and its size in bytes.
    fn display(&self, value: Option<&Value>, sensitive: bool, unknown: bool) -> (Value, usize) {
        if unknown {
            return (Value::from(UNKNOWN_PLACEHOLDER), UNKNOWN_PLACEHOLDER.len());
        }
        let Some(value) = value else {
            return (Value::Null, 0);
        };
        if sensitive {
            return (Value::from(SENSITIVE_PLACEHOLDER), SENSITIVE_PLACEHOLDER.len());
        }

        let rendered = value.render();
        let cap = self.limits.max_property_value_bytes;
        if rendered.len() <= cap {
            return (value.clone(), rendered.len());
        }

        // The marker is dropped when the cap cannot hold it.
        let capped = if cap < TRUNCATION_MARKER.len() {
            truncate_at_boundary(&rendered, cap).to_string()
        } else {
            let cut = truncate_at_boundary(&rendered, cap - TRUNCATION_MARKER.len());
            format!("{cut}{TRUNCATION_MARKER}")
        };
        let size = capped.len();
        (Value::String(capped), size)
    }
}

/// Longest prefix of `s` no longer than `max` bytes that ends on a char
/// boundary.
fn truncate_at_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

const fn fits_map(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Map(_)))
}

const fn fits_list(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::List(_)))
}

const fn as_map(value: Option<&Value>) -> Option<&BTreeMap<String, Value>> {
    match value {
        Some(Value::Map(map)) => Some(map),
        _ => None,
    }
}

fn as_list(value: Option<&Value>) -> Option<&[Value]> {
    match value {
        Some(Value::List(items)) => Some(items.as_slice()),
        _ => None,
    }
}
