//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Planlens - deterministic diff and risk analysis for Terraform plans.
#[derive(Parser, Debug)]
#[command(name = "planlens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "PLANLENS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a plan file (`terraform show -json` output).
    Analyze {
        /// Path to the JSON plan.
        plan: PathBuf,

        /// Show property changes for every resource.
        #[arg(short, long)]
        detailed: bool,

        /// Never group resources by provider.
        #[arg(long)]
        no_group: bool,

        /// Exit with status 2 when any resource is dangerous.
        #[arg(long)]
        fail_on_dangerous: bool,
    },

    /// Validate the analyzer configuration.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Show the effective configuration and its hash.
    ShowConfig,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from([
            "planlens",
            "analyze",
            "plan.json",
            "--detailed",
            "--fail-on-dangerous",
            "--output",
            "json",
        ])
        .unwrap();

        assert!(matches!(cli.output, OutputFormat::Json));
        match cli.command {
            Commands::Analyze {
                plan,
                detailed,
                no_group,
                fail_on_dangerous,
            } => {
                assert_eq!(plan, PathBuf::from("plan.json"));
                assert!(detailed);
                assert!(!no_group);
                assert!(fail_on_dangerous);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["planlens", "show-config", "--verbose", "--log-json"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.log_json);
        assert!(matches!(cli.command, Commands::ShowConfig));
    }

    #[test]
    fn test_analyze_requires_plan() {
        assert!(Cli::try_parse_from(["planlens", "analyze"]).is_err());
    }
}
