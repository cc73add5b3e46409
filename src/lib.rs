// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Planlens
//!
//! Deterministic diff and risk analysis for Terraform plans.
//!
//! ## Overview
//!
//! Planlens reads the JSON form of a plan (`terraform show -json plan.out`)
//! and answers, for every resource change:
//!
//! - Which properties change, with sensitive values masked and unknown
//!   values shown as "known after apply"
//! - Whether the change is a definite, conditional, or no replacement
//! - Whether it is dangerous under the configured policy, and how risky
//!
//! Results are sorted dangerous-first within each action tier and grouped by
//! provider when a plan is large and spans several providers.
//!
//! ## Architecture
//!
//! The analysis is a pure function `(PlanData, AnalyzerConfig) -> AnalysisResult`:
//!
//! 1. **Comparator**: recursive before/after diff per resource
//! 2. **Classifier / Evaluator**: replacement type, danger and risk level
//! 3. **Aggregator**: statistics, ordering and provider grouping
//!
//! ## Modules
//!
//! - [`analysis`]: Diff and risk analysis core
//! - [`plan`]: Plan input model and JSON loader
//! - [`config`]: Configuration parsing, validation and hashing
//! - [`cli`]: Command-line interface
//! - [`error`]: Error types
//!
//! ## Example
//!
//! ```yaml
//! danger:
//!   sensitive_resources: [aws_db_instance, aws_s3_bucket]
//!   sensitive_properties:
//!     - resource_type: aws_instance
//!       property: user_data
//! grouping:
//!   threshold: 10
//! auto_expand_dangerous: true
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod plan;

// ============================================================================
// Re-exports
// ============================================================================

pub use analysis::{AnalysisEngine, AnalysisResult, ChangeStatistics, ResourceAnalysis, RiskLevel};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{AnalyzerConfig, ConfigHasher, ConfigParser, ConfigValidator};
pub use error::{PlanLensError, Result};
pub use plan::{PlanData, PlanLoader};
