//! Generic plan values and structured property paths.
//!
//! Plan documents carry arbitrarily nested JSON-like data. [`Value`] is the
//! closed set of shapes the comparator understands, [`Path`] addresses one
//! location inside a value tree, and [`PathPattern`] is the configurable form
//! used by sensitivity rules.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A generic before/after value.
///
/// Maps are ordered by key so every traversal is deterministic.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent or explicit null.
    #[default]
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Numeric scalar.
    Number(serde_json::Number),
    /// String scalar.
    String(String),
    /// Ordered list.
    List(Vec<Value>),
    /// Key-sorted map.
    Map(BTreeMap<String, Value>),
    /// A shape the loader could not map, kept as its serialized form.
    Opaque(String),
}

impl Value {
    /// Returns true for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true for `Bool(true)`.
    #[must_use]
    pub const fn is_true(&self) -> bool {
        matches!(self, Self::Bool(true))
    }

    /// Returns true for maps and lists.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::List(_) | Self::Map(_))
    }

    /// Returns true if this value, or anything nested in it, is `Bool(true)`.
    ///
    /// Unknown and sensitive masks use boolean leaves, so this answers
    /// "is anything at or below here marked".
    #[must_use]
    pub fn contains_true(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::List(items) => items.iter().any(Self::contains_true),
            Self::Map(map) => map.values().any(Self::contains_true),
            _ => false,
        }
    }

    /// Returns the child at one path segment, if the shapes line up.
    #[must_use]
    pub fn get(&self, segment: &PathSegment) -> Option<&Self> {
        match (self, segment) {
            (Self::Map(map), PathSegment::Key(key)) => map.get(key),
            (Self::List(items), PathSegment::Index(idx)) => items.get(*idx),
            _ => None,
        }
    }

    /// Follows a whole path from this value.
    #[must_use]
    pub fn lookup(&self, path: &Path) -> Option<&Self> {
        path.segments()
            .iter()
            .try_fold(self, |current, segment| current.get(segment))
    }

    /// Compact JSON rendering used for display and size accounting.
    ///
    /// Opaque values render as the text they were captured with.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Opaque(raw) => raw.clone(),
            Self::String(s) => serde_json::to_string(s).unwrap_or_else(|_| s.clone()),
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Opaque(raw), value) | (value, Self::Opaque(raw)) => *raw == value.render(),
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) | Self::Opaque(s) => serializer.serialize_str(s),
            Self::List(items) => items.serialize(serializer),
            Self::Map(map) => map.serialize(serializer),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            other => write!(f, "{}", other.render()),
        }
    }
}

// ============================================================================
// Paths
// ============================================================================

/// One step into a nested value.
///
/// Keys and indices are distinct variants: the map key `"1"` and list
/// index `1` never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    /// Map key.
    Key(String),
    /// List index.
    Index(usize),
}

/// An ordered sequence of segments addressing one location in a value tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(Vec<PathSegment>);

impl Path {
    /// The empty path (the resource root).
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Creates a path from segments.
    #[must_use]
    pub const fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Returns the segments.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the root path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new path extended by one segment.
    #[must_use]
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend_from_slice(&self.0);
        segments.push(segment);
        Self(segments)
    }

    /// Returns a new path extended by a map key.
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.child(PathSegment::Key(key.into()))
    }

    /// Returns a new path extended by a list index.
    #[must_use]
    pub fn index(&self, idx: usize) -> Self {
        self.child(PathSegment::Index(idx))
    }

    /// True if `prefix` is this path or one of its ancestors.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl FromIterator<PathSegment> for Path {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for Path {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_segments(s)?
            .into_iter()
            .map(|segment| match segment {
                PatternSegment::Key(key) => Ok(PathSegment::Key(key)),
                PatternSegment::Index(idx) => Ok(PathSegment::Index(idx)),
                PatternSegment::AnyIndex | PatternSegment::Any => Err(ConfigError::invalid_pattern(
                    s,
                    "wildcards are not allowed in a concrete path",
                )),
            })
            .collect()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Index(idx) => write!(f, "[{idx}]")?,
                PathSegment::Key(key) => write_key(f, key, i == 0)?,
            }
        }
        Ok(())
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Writes a key segment, quoting it when the bare form would not parse back.
fn write_key(f: &mut fmt::Formatter<'_>, key: &str, first: bool) -> fmt::Result {
    if is_bare_key(key) {
        if first {
            write!(f, "{key}")
        } else {
            write!(f, ".{key}")
        }
    } else {
        let escaped = key.replace('\\', "\\\\").replace('"', "\\\"");
        write!(f, "[\"{escaped}\"]")
    }
}

fn is_bare_key(key: &str) -> bool {
    !key.is_empty()
        && key != "*"
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

// ============================================================================
// Patterns
// ============================================================================

/// One segment of a [`PathPattern`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PatternSegment {
    /// Exact map key.
    Key(String),
    /// Exact list index.
    Index(usize),
    /// Any list index (`[*]`).
    AnyIndex,
    /// Any single segment (`*`).
    Any,
}

impl PatternSegment {
    fn matches(&self, segment: &PathSegment) -> bool {
        match (self, segment) {
            (Self::Any, _) | (Self::AnyIndex, PathSegment::Index(_)) => true,
            (Self::Key(expected), PathSegment::Key(key)) => expected == key,
            (Self::Index(expected), PathSegment::Index(idx)) => expected == idx,
            _ => false,
        }
    }
}

/// A property path pattern from configuration, e.g. `ingress[*].cidr_blocks`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathPattern {
    segments: Vec<PatternSegment>,
    source: String,
}

impl PathPattern {
    /// Parses a pattern.
    ///
    /// # Errors
    ///
    /// Returns an error for empty patterns, empty segments, unterminated
    /// brackets or quotes, and non-numeric indices.
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let segments = parse_segments(pattern)?;
        Ok(Self {
            segments,
            source: pattern.to_string(),
        })
    }

    /// Returns the pattern segments.
    #[must_use]
    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    /// Returns the pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if `path` is the pattern's location or lies under it.
    #[must_use]
    pub fn covers(&self, path: &Path) -> bool {
        path.len() >= self.segments.len() && self.prefix_matches(path)
    }

    /// True if `path` is an ancestor of the pattern's location and `value`,
    /// found at `path`, actually holds something at that location.
    ///
    /// A changed block counts only when it contains the property, not merely
    /// because its path is a prefix of the pattern.
    #[must_use]
    pub fn reaches(&self, path: &Path, value: &Value) -> bool {
        path.len() < self.segments.len()
            && self.prefix_matches(path)
            && self
                .segments
                .get(path.len()..)
                .is_some_and(|rest| holds_location(rest, value))
    }

    fn prefix_matches(&self, path: &Path) -> bool {
        self.segments
            .iter()
            .zip(path.segments())
            .all(|(pattern, segment)| pattern.matches(segment))
    }
}

/// True if `value` has a child at the location `segments` describe.
fn holds_location(segments: &[PatternSegment], value: &Value) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return true;
    };
    match (first, value) {
        (PatternSegment::Key(key), Value::Map(map)) => {
            map.get(key).is_some_and(|child| holds_location(rest, child))
        }
        (PatternSegment::Index(idx), Value::List(items)) => {
            items.get(*idx).is_some_and(|child| holds_location(rest, child))
        }
        (PatternSegment::AnyIndex | PatternSegment::Any, Value::List(items)) => {
            items.iter().any(|child| holds_location(rest, child))
        }
        (PatternSegment::Any, Value::Map(map)) => map.values().any(|child| holds_location(rest, child)),
        _ => false,
    }
}

impl TryFrom<String> for PathPattern {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<PathPattern> for String {
    fn from(pattern: PathPattern) -> Self {
        pattern.source
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Parses the shared path/pattern grammar.
///
/// `a.b` are keys, `[3]` an index, `[*]` any index, `*` any segment and
/// `["x.y"]` a quoted key.
fn parse_segments(input: &str) -> Result<Vec<PatternSegment>, ConfigError> {
    let chars: Vec<char> = input.chars().collect();
    let mut segments = Vec::new();
    let mut i = 0;
    let mut after_dot = false;

    if input.trim().is_empty() {
        return Err(ConfigError::invalid_pattern(input, "pattern is empty"));
    }

    while i < chars.len() {
        match chars[i] {
            '.' => {
                if segments.is_empty() || after_dot {
                    return Err(ConfigError::invalid_pattern(input, "empty segment"));
                }
                after_dot = true;
                i += 1;
            }
            '[' => {
                if after_dot {
                    return Err(ConfigError::invalid_pattern(input, "empty segment before '['"));
                }
                let (segment, next) = parse_bracket(input, &chars, i + 1)?;
                segments.push(segment);
                i = next;
            }
            _ => {
                if !segments.is_empty() && !after_dot {
                    return Err(ConfigError::invalid_pattern(
                        input,
                        "expected '.' or '[' between segments",
                    ));
                }
                let start = i;
                while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                if ident == "*" {
                    segments.push(PatternSegment::Any);
                } else {
                    segments.push(PatternSegment::Key(ident));
                }
                after_dot = false;
            }
        }
    }

    if after_dot {
        return Err(ConfigError::invalid_pattern(input, "trailing '.'"));
    }

    Ok(segments)
}

/// Parses the inside of `[...]` starting just after the bracket.
/// Returns the segment and the index just past the closing bracket.
fn parse_bracket(
    input: &str,
    chars: &[char],
    start: usize,
) -> Result<(PatternSegment, usize), ConfigError> {
    if chars.get(start) == Some(&'"') {
        let mut key = String::new();
        let mut i = start + 1;
        loop {
            match chars.get(i) {
                None => return Err(ConfigError::invalid_pattern(input, "unterminated quoted key")),
                Some('\\') => {
                    let escaped = chars
                        .get(i + 1)
                        .ok_or_else(|| ConfigError::invalid_pattern(input, "dangling escape"))?;
                    key.push(*escaped);
                    i += 2;
                }
                Some('"') => break,
                Some(c) => {
                    key.push(*c);
                    i += 1;
                }
            }
        }
        if chars.get(i + 1) != Some(&']') {
            return Err(ConfigError::invalid_pattern(input, "expected ']' after quoted key"));
        }
        return Ok((PatternSegment::Key(key), i + 2));
    }

    let end = chars[start..]
        .iter()
        .position(|c| *c == ']')
        .map(|offset| start + offset)
        .ok_or_else(|| ConfigError::invalid_pattern(input, "unterminated '['"))?;
    let inner: String = chars[start..end].iter().collect();

    let segment = if inner == "*" {
        PatternSegment::AnyIndex
    } else {
        let idx = inner.parse::<usize>().map_err(|_| {
            ConfigError::invalid_pattern(input, format!("invalid index '{inner}'"))
        })?;
        PatternSegment::Index(idx)
    };

    Ok((segment, end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_and_index_are_distinct() {
        let by_key = Path::root().key("tags").key("1");
        let by_index = Path::root().key("tags").index(1);
        assert_ne!(by_key, by_index);
        assert_eq!(by_key.to_string(), "tags.1");
        assert_eq!(by_index.to_string(), "tags[1]");
    }

    #[test]
    fn test_path_display_quotes_special_keys() {
        let path = Path::root().key("labels").key("app.kubernetes.io/name").index(0);
        assert_eq!(path.to_string(), "labels[\"app.kubernetes.io/name\"][0]");

        let parsed: Path = path.to_string().parse().unwrap();
        assert_eq!(parsed, path);
    }

    #[test]
    fn test_path_parse_rejects_wildcards() {
        assert!("ingress[*]".parse::<Path>().is_err());
        assert!("*.name".parse::<Path>().is_err());
    }

    #[test]
    fn test_pattern_parse_errors() {
        assert!(PathPattern::parse("").is_err());
        assert!(PathPattern::parse("a..b").is_err());
        assert!(PathPattern::parse("a.").is_err());
        assert!(PathPattern::parse(".a").is_err());
        assert!(PathPattern::parse("a[x]").is_err());
        assert!(PathPattern::parse("a[1").is_err());
        assert!(PathPattern::parse("a[\"b").is_err());
        assert!(PathPattern::parse("a[0]b").is_err());
    }

    #[test]
    fn test_pattern_covers_location_and_descendants() {
        let pattern = PathPattern::parse("ingress[*].cidr_blocks").unwrap();

        assert!(pattern.covers(&Path::root().key("ingress").index(2).key("cidr_blocks")));
        assert!(pattern.covers(&Path::root().key("ingress").index(2).key("cidr_blocks").index(0)));
        assert!(!pattern.covers(&Path::root().key("ingress")));
        assert!(!pattern.covers(&Path::root().key("ingress").index(0).key("from_port")));
        assert!(!pattern.covers(&Path::root().key("egress")));
    }

    #[test]
    fn test_pattern_reaches_only_into_blocks_holding_the_property() {
        let pattern = PathPattern::parse("ingress[*].cidr_blocks").unwrap();
        let ingress = Path::root().key("ingress");

        let with_cidr = Value::from(json!([{"from_port": 22}, {"cidr_blocks": ["0.0.0.0/0"]}]));
        let without_cidr = Value::from(json!([{"from_port": 22}]));
        assert!(pattern.reaches(&ingress, &with_cidr));
        assert!(!pattern.reaches(&ingress, &without_cidr));
        let root = Value::from(json!({"ingress": [{"cidr_blocks": []}]}));
        assert!(pattern.reaches(&Path::root(), &root));
        assert!(!pattern.reaches(&Path::root().key("egress"), &with_cidr));
        // The location itself is covered, not reached.
        assert!(!pattern.reaches(&ingress.index(1).key("cidr_blocks"), &with_cidr));
    }

    #[test]
    fn test_pattern_reaches_ignores_scalars() {
        let pattern = PathPattern::parse("user_data").unwrap();
        assert!(!pattern.reaches(&Path::root(), &Value::from(json!("a"))));
        assert!(pattern.reaches(&Path::root(), &Value::from(json!({"user_data": "x"}))));

        let any = PathPattern::parse("tags.*").unwrap();
        assert!(any.reaches(&Path::root().key("tags"), &Value::from(json!({"Name": "web"}))));
        assert!(!any.reaches(&Path::root().key("tags"), &Value::from(json!({}))));
    }

    #[test]
    fn test_pattern_key_does_not_match_index() {
        let pattern = PathPattern::parse("tags.1").unwrap();
        assert!(pattern.covers(&Path::root().key("tags").key("1")));
        assert!(!pattern.covers(&Path::root().key("tags").index(1)));
        assert!(!pattern.reaches(&Path::root().key("tags"), &Value::from(json!(["a", "b"]))));
    }

    #[test]
    fn test_value_from_json_sorts_keys() {
        let value = Value::from(json!({"b": 1, "a": [true, null]}));
        assert_eq!(value.render(), r#"{"a":[true,null],"b":1}"#);
    }

    #[test]
    fn test_contains_true_and_lookup() {
        let mask = Value::from(json!({"a": {"b": [false, true]}, "c": false}));
        assert!(mask.contains_true());
        let path: Path = "a.b[1]".parse().unwrap();
        assert!(mask.lookup(&path).is_some_and(Value::is_true));
        assert!(!Value::from(json!({"c": false})).contains_true());
    }

    #[test]
    fn test_opaque_compares_by_rendered_form() {
        assert_eq!(Value::Opaque(String::from("42")), Value::from(json!(42)));
        assert_ne!(Value::Opaque(String::from("42")), Value::from(json!("42")));
    }

    #[test]
    fn test_number_and_string_differ() {
        assert_ne!(Value::from(json!(1)), Value::from(json!("1")));
    }
}
