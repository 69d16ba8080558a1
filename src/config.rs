//! YAML configuration file support.
//!
//! Deployments describe the lookup tuning and snapshot encoding in a single
//! versioned YAML file:
//!
//! ```yaml
//! version: "1.0"
//! name: "production index"
//!
//! lookup:
//!   entries_per_frame_limit: 10
//!   steps: 16
//!   block: 100
//!   default_threshold: 0.30
//!   max_toggle_bits: 12
//!
//! snapshot:
//!   codec: "zstd"
//!   level: 3
//! ```
//!
//! Every field has a default, so an empty section (or a missing one) yields
//! the built-in behavior.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use index::{LookupConfig, SnapshotConfig};

/// Errors that can occur when loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration for the index and its command surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuscoutConfig {
    /// Configuration format version.
    pub version: String,

    /// Optional configuration name/description.
    #[serde(default)]
    pub name: Option<String>,

    /// Lookup engine tuning.
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Snapshot encoding behavior.
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

impl AuscoutConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: AuscoutConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }
        self.lookup
            .validate()
            .map_err(|err| ConfigLoadError::Validation(err.to_string()))?;
        Ok(())
    }
}

impl Default for AuscoutConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            lookup: LookupConfig::default(),
            snapshot: SnapshotConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index::SnapshotCompression;
    use std::io::Write;

    #[test]
    fn load_valid_yaml() {
        let yaml = r#"
version: "1.0"
name: "test"

lookup:
  block: 50
  default_threshold: 0.25

snapshot:
  codec: "none"
"#;
        let config = AuscoutConfig::from_yaml(yaml).expect("valid yaml");
        assert_eq!(config.name.as_deref(), Some("test"));
        assert_eq!(config.lookup.block, 50);
        assert_eq!(config.lookup.steps, 16);
        assert!((config.lookup.default_threshold - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.snapshot.codec, SnapshotCompression::None);
        assert_eq!(config.snapshot.level, 3);
    }

    #[test]
    fn unsupported_version_rejected() {
        let yaml = r#"
version: "2.0"
"#;
        let err = AuscoutConfig::from_yaml(yaml).expect_err("version gate");
        assert!(matches!(err, ConfigLoadError::UnsupportedVersion(_)));
    }

    #[test]
    fn invalid_lookup_tuning_rejected() {
        let yaml = r#"
version: "1.0"
lookup:
  block: 0
"#;
        let err = AuscoutConfig::from_yaml(yaml).expect_err("validation");
        assert!(matches!(err, ConfigLoadError::Validation(_)));
    }

    #[test]
    fn load_from_file() {
        let yaml = r#"
version: "1"
lookup:
  max_toggle_bits: 8
"#;
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(yaml.as_bytes()).expect("write");

        let config = AuscoutConfig::from_file(file.path()).expect("load");
        assert_eq!(config.lookup.max_toggle_bits, 8);
    }
}
