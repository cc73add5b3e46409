//! Diff and risk analysis core.
//!
//! Data flows one way through this module:
//! - [`ValueComparator`] diffs each resource's before/after values
//! - [`ReplacementClassifier`] and [`DangerEvaluator`] consume that diff
//! - [`Aggregator`] sorts, tallies and groups the per-resource results
//!
//! [`AnalysisEngine`] wires the stages together and is the usual entry point.

mod aggregator;
pub mod comparator;
mod danger;
mod engine;
mod replacement;
mod value;

pub use aggregator::{
    Aggregator, AnalysisResult, ChangeStatistics, ProviderGroup, ResourceAnalysis,
};
pub use comparator::{
    ChangeAction, DiffInput, PropertyChange, PropertyChangeAnalysis, UnknownKind,
    ValueComparator, SENSITIVE_PLACEHOLDER, UNKNOWN_PLACEHOLDER,
};
pub use danger::{DangerAssessment, DangerEvaluator, RiskLevel, SensitivityMatcher};
pub use engine::AnalysisEngine;
pub use replacement::{ReplacementClassifier, ReplacementType};
pub use value::{Path, PathPattern, PathSegment, PatternSegment, Value};
