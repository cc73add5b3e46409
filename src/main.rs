//! Planlens CLI entrypoint.
//!
//! This is the main entrypoint for the planlens command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use planlens::analysis::AnalysisEngine;
use planlens::cli::{Cli, Commands, OutputFormatter};
use planlens::config::{find_config_file, AnalyzerConfig, ConfigHasher, ConfigParser, ConfigValidator};
use planlens::error::Result;
use planlens::plan::PlanLoader;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status when `--fail-on-dangerous` is set and a dangerous change exists.
const DANGEROUS_EXIT_CODE: u8 = 2;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_json);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` takes precedence over `--verbose` when set. Logs go to stderr so
/// stdout carries only the report.
fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Dispatches the selected command.
fn run(cli: &Cli) -> Result<ExitCode> {
    let formatter = OutputFormatter::new(cli.output);
    let config = load_config(cli.config.as_ref())?;

    match &cli.command {
        Commands::Analyze {
            plan,
            detailed,
            no_group,
            fail_on_dangerous,
        } => cmd_analyze(config, plan, *detailed, *no_group, *fail_on_dangerous, &formatter),
        Commands::Validate { warnings } => cmd_validate(&config, *warnings, &formatter),
        Commands::ShowConfig => cmd_show_config(&config, &formatter),
    }
}

/// Analyze a plan file.
fn cmd_analyze(
    mut config: AnalyzerConfig,
    plan_path: &Path,
    detailed: bool,
    no_group: bool,
    fail_on_dangerous: bool,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    ConfigValidator::new().validate(&config)?;

    if no_group {
        debug!("Provider grouping disabled by --no-group");
        config.grouping.enabled = false;
    }

    let plan = PlanLoader::new().load_file(plan_path)?;
    if plan.is_empty() {
        info!("Plan contains no resource changes");
    }

    let result = AnalysisEngine::new(&config).analyze(&plan);
    let config_hash = ConfigHasher::new().hash_config(&config);

    emit(&formatter.format_analysis(&result, &config_hash, detailed))?;

    if fail_on_dangerous && result.statistics.high_risk > 0 {
        warn!(
            "{} dangerous resource(s) found, failing as requested",
            result.statistics.high_risk
        );
        return Ok(ExitCode::from(DANGEROUS_EXIT_CODE));
    }

    Ok(ExitCode::SUCCESS)
}

/// Validate configuration.
fn cmd_validate(config: &AnalyzerConfig, show_warnings: bool, formatter: &OutputFormatter) -> Result<ExitCode> {
    let result = ConfigValidator::new().validate(config)?;
    emit(&formatter.format_validation(&result, show_warnings))?;
    Ok(ExitCode::SUCCESS)
}

/// Show the effective configuration.
fn cmd_show_config(config: &AnalyzerConfig, formatter: &OutputFormatter) -> Result<ExitCode> {
    let config_hash = ConfigHasher::new().hash_config(config);
    emit(&formatter.format_config(config, &config_hash))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Writes a report to stdout.
fn emit(report: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{report}")?;
    stdout.flush()?;
    Ok(())
}

/// Resolves the configuration file path.
///
/// An explicit path must exist; otherwise the working directory and its
/// parents are searched and a missing file means defaults.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<Option<PathBuf>> {
    if let Some(path) = config_path {
        return Ok(Some(path.clone()));
    }

    let cwd = std::env::current_dir()?;
    match find_config_file(&cwd) {
        Ok(path) => Ok(Some(path)),
        Err(e) => {
            debug!("No configuration file found ({e}), using defaults");
            Ok(None)
        }
    }
}

/// Loads the effective configuration: file (or defaults), then `.env`, then
/// environment overrides.
fn load_config(config_path: Option<&PathBuf>) -> Result<AnalyzerConfig> {
    let config_file = resolve_config_path(config_path)?;

    let base = config_file
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new("."));
    let parser = ConfigParser::new().with_base_path(base);
    parser.load_dotenv()?;

    match &config_file {
        Some(file) => {
            debug!("Loading configuration from: {}", file.display());
            parser.load_with_env(file)
        }
        None => {
            let mut config = AnalyzerConfig::default();
            ConfigParser::apply_env_overrides(&mut config)?;
            Ok(config)
        }
    }
}
