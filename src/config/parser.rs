//! Configuration parser for loading analyzer configuration.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, PlanLensError, Result};
use std::path::Path;
use tracing::{debug, info};

use super::spec::AnalyzerConfig;

/// Configuration parser for loading analyzer configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<AnalyzerConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(PlanLensError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            PlanLensError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// An empty document yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<AnalyzerConfig> {
        debug!("Parsing YAML configuration");

        if content.trim().is_empty() {
            return Ok(AnalyzerConfig::default());
        }

        let config: AnalyzerConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            PlanLensError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed configuration: {} sensitive resource types, {} property rules",
            config.danger.sensitive_resources.len(),
            config.danger.sensitive_properties.len()
        );
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Environment variables are checked in the format
    /// `PLANLENS_<SECTION>_<KEY>` (e.g., `PLANLENS_GROUPING_THRESHOLD`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an override
    /// has an invalid value.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<AnalyzerConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an override cannot be parsed.
    pub fn apply_env_overrides(config: &mut AnalyzerConfig) -> Result<()> {
        if let Some(enabled) = env_override::<bool>("PLANLENS_GROUPING_ENABLED")? {
            debug!("Overriding grouping.enabled from environment");
            config.grouping.enabled = enabled;
        }

        if let Some(threshold) = env_override::<usize>("PLANLENS_GROUPING_THRESHOLD")? {
            debug!("Overriding grouping.threshold from environment");
            config.grouping.threshold = threshold;
        }

        if let Some(max) = env_override::<usize>("PLANLENS_MAX_PROPERTIES")? {
            debug!("Overriding limits.max_properties_per_resource from environment");
            config.limits.max_properties_per_resource = max;
        }

        if let Some(expand) = env_override::<bool>("PLANLENS_AUTO_EXPAND_DANGEROUS")? {
            debug!("Overriding auto_expand_dangerous from environment");
            config.auto_expand_dangerous = expand;
        }

        Ok(())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                PlanLensError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Reads and parses one override variable. Unset variables yield `None`.
fn env_override<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    std::env::var(name).map_or(Ok(None), |raw| {
        raw.trim().parse::<T>().map(Some).map_err(|_| {
            PlanLensError::Config(ConfigError::validation(
                format!("Invalid value '{raw}' for {name}"),
                name,
            ))
        })
    })
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "planlens.yaml",
    "planlens.yml",
    ".planlens.yaml",
    ".planlens.yml",
];

/// Finds the configuration file in the start directory or its parents.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(PlanLensError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}
