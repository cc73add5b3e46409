//! CLI module for the planlens analyzer.
//!
//! This module provides the command-line interface for analyzing Terraform
//! plans and inspecting analyzer configuration.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
