//! Error types for the planlens analyzer.
//!
//! Fatal errors only come from the edges: loading configuration and loading
//! plan files. The analysis core never fails; partial failures are recorded
//! as [`AnalysisWarning`] values on the result.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for planlens.
#[derive(Debug, Error)]
pub enum PlanLensError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Plan loading errors.
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A property path pattern could not be parsed.
    #[error("Invalid property pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern text.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Plan loading errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Plan file not found.
    #[error("Plan file not found: {path}")]
    FileNotFound {
        /// Path to the missing plan file.
        path: PathBuf,
    },

    /// The plan document could not be parsed.
    #[error("Failed to parse plan: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
    },

    /// A binary plan file was given where JSON is expected.
    #[error("{path} is a binary plan file; convert it with `terraform show -json` first")]
    BinaryPlan {
        /// Path to the binary plan.
        path: PathBuf,
    },

    /// Plan format version is not supported.
    #[error("Unsupported plan format version: {version}")]
    UnsupportedFormat {
        /// The format version found in the plan.
        version: String,
    },
}

/// Non-fatal problems recorded during an analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisWarning {
    /// A resource entry lacked a required field and was skipped.
    #[error("Skipped resource {address}: missing {missing}")]
    MalformedResource {
        /// Address of the skipped resource (may be empty).
        address: String,
        /// Name of the missing field.
        missing: String,
    },
}

/// Result type alias for planlens operations.
pub type Result<T> = std::result::Result<T, PlanLensError>;

impl PlanLensError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}

impl PlanError {
    /// Creates a parse error with the given message.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }
}
