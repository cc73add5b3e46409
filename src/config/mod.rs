//! Configuration module for the planlens analyzer.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `planlens.yaml`
//! - Validation of limits and policy entries
//! - Computing configuration hashes for reproducibility

mod spec;
mod parser;
mod validator;
mod hash;

pub use spec::{
    AnalyzerConfig, DangerPolicy, GroupingConfig, PerformanceLimits, SensitivePropertyRule,
};
pub use parser::{ConfigParser, DEFAULT_CONFIG_FILES, find_config_file};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
pub use hash::ConfigHasher;
