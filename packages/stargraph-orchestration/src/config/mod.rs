//! Job configuration
//!
//! A job is configured from three layers, later layers winning:
//!
//! 1. `JobConfig::default()`
//! 2. an optional YAML file (`version: 1` at the top)
//! 3. command-line overrides applied through the `with_*` builders
//!
//! ```yaml
//! version: 1
//! input_location: data/edges
//! output_location: out/components
//! overwrite_existing_output: false
//! max_rounds: 256
//! engine:
//!   workers: 8
//!   partitions: 32
//! ```

pub mod error;

pub use error::{ConfigError, ConfigResult};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use stargraph_dataflow::{EngineConfig, SaveMode};
use std::path::{Path, PathBuf};

/// Current configuration file version
pub const CONFIG_VERSION: u64 = 1;

/// Round cap applied when none is configured
pub const DEFAULT_MAX_ROUNDS: usize = 256;

/// Upper bound accepted for `max_rounds`
pub const MAX_ROUNDS_LIMIT: usize = 100_000;

const JOB_FIELDS: &[&str] = &[
    "version",
    "input_location",
    "output_location",
    "overwrite_existing_output",
    "max_rounds",
    "check_invariants",
    "engine",
];

const ENGINE_FIELDS: &[&str] = &["workers", "partitions", "max_task_attempts", "stack_size"];

/// Connected-components job configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Text file or directory of text files holding one edge per line
    pub input_location: Option<PathBuf>,

    /// Directory receiving the `node representative` shards
    pub output_location: Option<PathBuf>,

    /// Replace an existing output location instead of failing
    pub overwrite_existing_output: bool,

    /// Contraction rounds allowed before the job fails
    pub max_rounds: usize,

    /// Verify every small-star output is oriented toward smaller ids
    pub check_invariants: bool,

    /// Executor settings
    pub engine: EngineConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            input_location: None,
            output_location: None,
            overwrite_existing_output: false,
            max_rounds: DEFAULT_MAX_ROUNDS,
            check_invariants: true,
            engine: EngineConfig::default(),
        }
    }
}

impl JobConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self::default().with_input(input).with_output(output)
    }

    /// Load from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Parse YAML text, checking the version and rejecting unknown fields
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let mut value: Value = serde_yaml::from_str(content)?;

        if let Value::Null = value {
            return Err(ConfigError::MissingVersion);
        }

        if let Value::Mapping(mapping) = &mut value {
            let version = mapping
                .remove("version")
                .ok_or(ConfigError::MissingVersion)?;
            match version.as_u64() {
                Some(CONFIG_VERSION) => {}
                Some(found) => {
                    return Err(ConfigError::UnsupportedVersion {
                        found,
                        supported: vec![CONFIG_VERSION],
                    })
                }
                None => return Err(ConfigError::MissingVersion),
            }

            check_known_fields(mapping, "job", JOB_FIELDS)?;
            if let Some(Value::Mapping(engine)) = mapping.get("engine") {
                check_known_fields(engine, "engine", ENGINE_FIELDS)?;
            }
        }

        Ok(serde_yaml::from_value(value)?)
    }

    /// Serialize as a versioned YAML document
    pub fn to_yaml_string(&self) -> ConfigResult<String> {
        let mut value = serde_yaml::to_value(self)?;
        if let Value::Mapping(mapping) = &mut value {
            let mut versioned = serde_yaml::Mapping::new();
            versioned.insert(Value::from("version"), Value::from(CONFIG_VERSION));
            versioned.extend(std::mem::take(mapping));
            *mapping = versioned;
        }
        Ok(serde_yaml::to_string(&value)?)
    }

    pub fn with_input(mut self, input: impl Into<PathBuf>) -> Self {
        self.input_location = Some(input.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output_location = Some(output.into());
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite_existing_output = overwrite;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_invariant_checks(mut self, enabled: bool) -> Self {
        self.check_invariants = enabled;
        self
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn input(&self) -> ConfigResult<&Path> {
        self.input_location.as_deref().ok_or_else(|| {
            ConfigError::missing_field(
                "input_location",
                "Pass INPUT on the command line or set input_location in the config file",
            )
        })
    }

    pub fn output(&self) -> ConfigResult<&Path> {
        self.output_location.as_deref().ok_or_else(|| {
            ConfigError::missing_field(
                "output_location",
                "Pass OUTPUT on the command line or set output_location in the config file",
            )
        })
    }

    pub fn save_mode(&self) -> SaveMode {
        SaveMode::from_overwrite(self.overwrite_existing_output)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let input = self.input()?;
        let output = self.output()?;
        if input == output {
            return Err(ConfigError::SameLocation(input.display().to_string()));
        }

        if !(1..=MAX_ROUNDS_LIMIT).contains(&self.max_rounds) {
            return Err(ConfigError::range_with_hint(
                "max_rounds",
                self.max_rounds,
                1,
                MAX_ROUNDS_LIMIT,
                "Path-like graphs need O(log n) rounds; the default of 256 is ample",
            ));
        }

        self.engine
            .validate()
            .map_err(|e| ConfigError::Engine(e.to_string()))
    }
}

fn check_known_fields(
    mapping: &serde_yaml::Mapping,
    section: &str,
    valid: &[&str],
) -> ConfigResult<()> {
    for key in mapping.keys() {
        let name = key.as_str().unwrap_or_default();
        if !valid.contains(&name) {
            return Err(ConfigError::unknown_field_with_suggestion(
                name, section, valid,
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = JobConfig::default();
        assert_eq!(config.max_rounds, DEFAULT_MAX_ROUNDS);
        assert!(config.check_invariants);
        assert!(!config.overwrite_existing_output);
        assert_eq!(config.save_mode(), SaveMode::ErrorIfExists);
    }

    #[test]
    fn test_missing_locations_fail_validation() {
        let err = JobConfig::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { ref field, .. } if field == "input_location"));

        let err = JobConfig::default().with_input("in").validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { ref field, .. } if field == "output_location"));
    }

    #[test]
    fn test_same_location_rejected() {
        let err = JobConfig::new("data", "data").validate().unwrap_err();
        assert!(matches!(err, ConfigError::SameLocation(_)));
    }

    #[test]
    fn test_max_rounds_range() {
        let err = JobConfig::new("in", "out")
            .with_max_rounds(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Range { ref field, .. } if field == "max_rounds"));

        assert!(JobConfig::new("in", "out").with_max_rounds(1).validate().is_ok());
    }

    #[test]
    fn test_engine_errors_surface() {
        let config = JobConfig::new("in", "out")
            .with_engine(EngineConfig::default().with_partitions(0));
        assert!(matches!(config.validate(), Err(ConfigError::Engine(_))));
    }

    #[test]
    fn test_from_yaml_str() {
        let yaml = r#"
version: 1
input_location: edges.txt
output_location: out
max_rounds: 12
engine:
  workers: 2
  partitions: 5
"#;
        let config = JobConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.input_location, Some(PathBuf::from("edges.txt")));
        assert_eq!(config.max_rounds, 12);
        assert_eq!(config.engine.workers, Some(2));
        assert_eq!(config.engine.partitions, 5);
        assert_eq!(config.engine.max_task_attempts, 3);
        assert!(config.check_invariants);
    }

    #[test]
    fn test_yaml_version_required() {
        assert!(matches!(
            JobConfig::from_yaml_str("max_rounds: 3\n"),
            Err(ConfigError::MissingVersion)
        ));
        assert!(matches!(
            JobConfig::from_yaml_str("version: 2\n"),
            Err(ConfigError::UnsupportedVersion { found: 2, .. })
        ));
    }

    #[test]
    fn test_yaml_unknown_field_suggestion() {
        let err = JobConfig::from_yaml_str("version: 1\nmax_round: 3\n").unwrap_err();
        assert!(err.to_string().contains("Did you mean 'max_rounds'?"));

        let err = JobConfig::from_yaml_str("version: 1\nengine:\n  worker: 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownField { ref section, .. } if section == "engine"));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = JobConfig::new("in", "out")
            .with_max_rounds(9)
            .with_overwrite(true);
        let yaml = config.to_yaml_string().unwrap();
        assert!(yaml.starts_with("version: 1"));
        assert_eq!(JobConfig::from_yaml_str(&yaml).unwrap(), config);
    }
}
