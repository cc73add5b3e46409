//! Loader for Terraform JSON plans (`terraform show -json plan.out`).

use serde::Deserialize;
use std::path::Path as FsPath;
use tracing::{debug, info, warn};

use crate::analysis::{Path, PathSegment, Value};
use crate::error::{PlanError, PlanLensError, Result};

use super::types::{Action, PlanData, ResourceChangeInput};

/// Leading bytes of a zip archive; binary plan files are zips.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Highest plan format major version understood.
const MAX_FORMAT_MAJOR: u32 = 1;

/// Loader for Terraform JSON plan documents.
#[derive(Debug, Default)]
pub struct PlanLoader;

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    format_version: Option<String>,
    #[serde(default)]
    terraform_version: Option<String>,
    #[serde(default)]
    resource_changes: Vec<RawResourceChange>,
}

#[derive(Debug, Deserialize)]
struct RawResourceChange {
    #[serde(default)]
    address: String,
    #[serde(rename = "type", default)]
    resource_type: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    provider_name: Option<String>,
    #[serde(default)]
    change: RawChange,
}

#[derive(Debug, Default, Deserialize)]
struct RawChange {
    #[serde(default)]
    actions: Vec<String>,
    #[serde(default)]
    before: serde_json::Value,
    #[serde(default)]
    after: serde_json::Value,
    #[serde(default)]
    after_unknown: serde_json::Value,
    #[serde(default)]
    before_sensitive: serde_json::Value,
    #[serde(default)]
    after_sensitive: serde_json::Value,
    #[serde(default)]
    replace_paths: Vec<Vec<serde_json::Value>>,
}

impl PlanLoader {
    /// Creates a new plan loader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Loads a JSON plan from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, is a binary plan, or is not
    /// a valid JSON plan document.
    pub fn load_file(&self, path: impl AsRef<FsPath>) -> Result<PlanData> {
        let path = path.as_ref();
        info!("Loading plan from: {}", path.display());

        if !path.exists() {
            return Err(PlanLensError::Plan(PlanError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let bytes = std::fs::read(path)?;
        if bytes.starts_with(ZIP_MAGIC) {
            return Err(PlanLensError::Plan(PlanError::BinaryPlan {
                path: path.to_path_buf(),
            }));
        }

        self.parse_slice(&bytes)
    }

    /// Parses a JSON plan from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or the format version is
    /// unsupported.
    pub fn parse_json(&self, content: &str) -> Result<PlanData> {
        self.parse_slice(content.as_bytes())
    }

    fn parse_slice(&self, bytes: &[u8]) -> Result<PlanData> {
        let raw: RawPlan = serde_json::from_slice(bytes)
            .map_err(|e| PlanError::parse(format!("JSON parse error: {e}")))?;

        if let Some(version) = &raw.format_version {
            Self::check_format_version(version)?;
        }

        let resource_changes: Vec<ResourceChangeInput> = raw
            .resource_changes
            .into_iter()
            .map(Self::convert_change)
            .collect();

        debug!("Parsed plan with {} resource changes", resource_changes.len());

        Ok(PlanData {
            format_version: raw.format_version,
            terraform_version: raw.terraform_version,
            resource_changes,
        })
    }

    /// Rejects format versions newer than the supported major version.
    fn check_format_version(version: &str) -> Result<()> {
        let major = version
            .split('.')
            .next()
            .and_then(|m| m.parse::<u32>().ok())
            .ok_or_else(|| PlanError::UnsupportedFormat {
                version: version.to_string(),
            })?;

        if major > MAX_FORMAT_MAJOR {
            return Err(PlanError::UnsupportedFormat {
                version: version.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn convert_change(raw: RawResourceChange) -> ResourceChangeInput {
        let action = Action::from_actions(&raw.change.actions);
        if action.is_none() && !raw.change.actions.is_empty() {
            warn!(
                "Unrecognized actions {:?} for {}",
                raw.change.actions, raw.address
            );
        }

        let replace_paths = raw
            .change
            .replace_paths
            .iter()
            .filter_map(|steps| {
                let path = Self::convert_path(steps);
                if path.is_none() {
                    warn!("Ignoring malformed replace path {steps:?} for {}", raw.address);
                }
                path
            })
            .collect();

        ResourceChangeInput {
            address: raw.address,
            resource_type: raw.resource_type,
            name: raw.name,
            provider_name: raw.provider_name,
            action,
            before: Value::from(raw.change.before),
            after: Value::from(raw.change.after),
            after_unknown: Value::from(raw.change.after_unknown),
            before_unknown: Value::Null,
            before_sensitive: Value::from(raw.change.before_sensitive),
            after_sensitive: Value::from(raw.change.after_sensitive),
            replace_paths,
        }
    }

    /// Converts a replace path step list: strings are keys, non-negative
    /// integers are indices.
    fn convert_path(steps: &[serde_json::Value]) -> Option<Path> {
        steps
            .iter()
            .map(|step| match step {
                serde_json::Value::String(key) => Some(PathSegment::Key(key.clone())),
                serde_json::Value::Number(n) => n
                    .as_u64()
                    .and_then(|i| usize::try_from(i).ok())
                    .map(PathSegment::Index),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_PLAN: &str = r#"{
  "format_version": "1.2",
  "terraform_version": "1.7.5",
  "resource_changes": [
    {
      "address": "aws_instance.web",
      "mode": "managed",
      "type": "aws_instance",
      "name": "web",
      "provider_name": "registry.terraform.io/hashicorp/aws",
      "change": {
        "actions": ["delete", "create"],
        "before": {"ami": "ami-1", "tags": {"Name": "web"}},
        "after": {"ami": "ami-2", "tags": {"Name": "web"}},
        "after_unknown": {"id": true},
        "before_sensitive": {},
        "after_sensitive": {"user_data": true},
        "replace_paths": [["ami"], ["ebs_block_device", 0, "volume_size"]]
      }
    },
    {
      "address": "random_id.suffix",
      "type": "random_id",
      "name": "suffix",
      "change": {"actions": []}
    }
  ]
}"#;

    #[test]
    fn test_parse_sample_plan() {
        let plan = PlanLoader::new().parse_json(SAMPLE_PLAN).unwrap();
        assert_eq!(plan.terraform_version.as_deref(), Some("1.7.5"));
        assert_eq!(plan.resource_changes.len(), 2);

        let web = &plan.resource_changes[0];
        assert_eq!(web.action, Some(Action::Replace));
        assert_eq!(web.resource_type.as_deref(), Some("aws_instance"));
        assert_eq!(web.replace_paths.len(), 2);
        assert_eq!(web.replace_paths[1].to_string(), "ebs_block_device[0].volume_size");
        assert!(web.after_unknown.lookup(&Path::root().key("id")).is_some_and(Value::is_true));

        // Empty action list reaches the engine as a missing action.
        assert_eq!(plan.resource_changes[1].action, None);
    }

    #[test]
    fn test_malformed_replace_path_is_dropped() {
        let steps = vec![serde_json::json!("a"), serde_json::json!(-1)];
        assert_eq!(PlanLoader::convert_path(&steps), None);
    }

    #[test]
    fn test_rejects_future_format() {
        let result = PlanLoader::new().parse_json(r#"{"format_version": "2.0"}"#);
        assert!(matches!(
            result,
            Err(PlanLensError::Plan(PlanError::UnsupportedFormat { .. }))
        ));
    }

    #[test]
    fn test_invalid_json() {
        let result = PlanLoader::new().parse_json("not json");
        assert!(matches!(result, Err(PlanLensError::Plan(PlanError::ParseError { .. }))));
    }

    #[test]
    fn test_load_file_detects_binary_plan() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"PK\x03\x04binary").unwrap();

        let result = PlanLoader::new().load_file(file.path());
        assert!(matches!(result, Err(PlanLensError::Plan(PlanError::BinaryPlan { .. }))));
    }

    #[test]
    fn test_load_file_missing() {
        let result = PlanLoader::new().load_file("/nonexistent/plan.json");
        assert!(matches!(result, Err(PlanLensError::Plan(PlanError::FileNotFound { .. }))));
    }

    #[test]
    fn test_load_file_reads_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_PLAN.as_bytes()).unwrap();

        let plan = PlanLoader::new().load_file(file.path()).unwrap();
        assert_eq!(plan.resource_changes.len(), 2);
    }
}
