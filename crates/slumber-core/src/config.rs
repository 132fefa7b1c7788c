//! Configuration loading and typed config structures for Slumber.
//!
//! The canonical configuration lives in `slumber-config.yaml` next to the
//! engine binary. This module defines strongly-typed structs that mirror the
//! YAML structure, a loader, and a writer used when an operator changes the
//! sleep percentage at runtime.
//!
//! Validation of the percentage happens here, not in the quorum core: an
//! invalid value falls back to [`DEFAULT_THRESHOLD`] with a warning.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::threshold::{DEFAULT_THRESHOLD, QuorumError, Threshold};

/// Errors that can occur when loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write the configuration file.
    #[error("failed to access config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse or emit YAML content.
    #[error("failed to process config YAML: {source}")]
    Yaml {
        /// The underlying YAML error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlumberConfig {
    /// Quorum settings.
    #[serde(default)]
    pub quorum: QuorumConfig,

    /// Who may affect the quorum.
    #[serde(default)]
    pub permissions: PermissionsConfig,

    /// Names of the worlds the engine hosts.
    #[serde(default = "default_worlds")]
    pub worlds: Vec<String>,
}

impl Default for SlumberConfig {
    fn default() -> Self {
        Self {
            quorum: QuorumConfig::default(),
            permissions: PermissionsConfig::default(),
            worlds: default_worlds(),
        }
    }
}

impl SlumberConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Write the configuration back to `path` as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if serialization fails or
    /// [`ConfigError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }
}

/// Quorum settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuorumConfig {
    /// Fraction of a world's population that must rest to skip the night.
    ///
    /// A value that is not a number is read as NaN, so it fails validation
    /// and falls back to the default instead of rejecting the whole file.
    #[serde(
        default = "default_sleep_percentage",
        deserialize_with = "lenient_fraction"
    )]
    pub sleep_percentage: f64,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            sleep_percentage: default_sleep_percentage(),
        }
    }
}

impl QuorumConfig {
    /// The configured percentage as a validated threshold.
    ///
    /// # Errors
    ///
    /// Returns [`QuorumError::InvalidThreshold`] if the value is outside
    /// `[0, 1]`.
    pub fn threshold(&self) -> Result<Threshold, QuorumError> {
        Threshold::new(self.sleep_percentage)
    }

    /// The configured threshold, or the default when the value is invalid.
    pub fn threshold_or_default(&self) -> Threshold {
        self.threshold().unwrap_or_else(|err| {
            warn!(
                error = %err,
                default = DEFAULT_THRESHOLD,
                "sleep_percentage must be between 0 and 1, using default"
            );
            Threshold::default()
        })
    }
}

/// Permission settings for the rest quorum.
///
/// A participant is allowed to affect the quorum when `grant_all` is set or
/// when their name is listed in `players`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsConfig {
    /// Grant the permission to everyone.
    #[serde(default = "default_true")]
    pub grant_all: bool,

    /// Names explicitly granted the permission.
    #[serde(default)]
    pub players: Vec<String>,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            grant_all: true,
            players: Vec::new(),
        }
    }
}

impl PermissionsConfig {
    /// Whether the named participant may affect the quorum.
    pub fn allows(&self, name: &str) -> bool {
        self.grant_all || self.players.iter().any(|p| p.eq_ignore_ascii_case(name))
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_sleep_percentage() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_worlds() -> Vec<String> {
    vec!["world".to_owned()]
}

const fn default_true() -> bool {
    true
}

/// Accept any YAML value for a fraction, keeping it only when numeric.
fn lenient_fraction<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_yml::Value::deserialize(deserializer)?;
    Ok(value.as_f64().unwrap_or(f64::NAN))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SlumberConfig::default();
        assert_eq!(config.quorum.sleep_percentage, 0.5);
        assert!(config.permissions.grant_all);
        assert_eq!(config.worlds, vec!["world".to_owned()]);
        assert_eq!(config.quorum.threshold().unwrap().value(), 0.5);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
quorum:
  sleep_percentage: 0.25
permissions:
  grant_all: false
  players:
    - Alice
    - bob
worlds:
  - overworld
  - nether
";
        let config = SlumberConfig::parse(yaml).unwrap();
        assert_eq!(config.quorum.sleep_percentage, 0.25);
        assert!(!config.permissions.grant_all);
        assert!(config.permissions.allows("alice"));
        assert!(config.permissions.allows("BOB"));
        assert!(!config.permissions.allows("carol"));
        assert_eq!(config.worlds.len(), 2);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = SlumberConfig::parse("quorum:\n  sleep_percentage: 1.0\n").unwrap();
        assert_eq!(config.quorum.sleep_percentage, 1.0);
        assert_eq!(config.worlds, default_worlds());
    }

    #[test]
    fn parse_empty_yaml() {
        let config = SlumberConfig::parse("");
        assert_eq!(config.unwrap(), SlumberConfig::default());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let config = SlumberConfig::parse("quorum: [unclosed");
        assert!(matches!(config, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn out_of_range_percentage_falls_back() {
        let config = SlumberConfig::parse("quorum:\n  sleep_percentage: 1.5\n").unwrap();
        assert!(config.quorum.threshold().is_err());
        assert_eq!(config.quorum.threshold_or_default(), Threshold::default());
    }

    #[test]
    fn non_numeric_percentage_falls_back() {
        let config = SlumberConfig::parse("quorum:\n  sleep_percentage: lots\n").unwrap();
        assert!(config.quorum.sleep_percentage.is_nan());
        assert!(config.quorum.threshold().is_err());
        assert_eq!(config.quorum.threshold_or_default(), Threshold::default());

        let config = SlumberConfig::parse("quorum:\n  sleep_percentage:\n").unwrap();
        assert_eq!(config.quorum.threshold_or_default(), Threshold::default());
    }

    #[test]
    fn integer_percentage_is_accepted() {
        let config = SlumberConfig::parse("quorum:\n  sleep_percentage: 1\n").unwrap();
        assert_eq!(config.quorum.sleep_percentage, 1.0);
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("slumber-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("slumber-config.yaml");

        let mut config = SlumberConfig::default();
        config.quorum.sleep_percentage = 0.75;
        config.save(&path).unwrap();

        let loaded = SlumberConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = SlumberConfig::from_file(Path::new("/nonexistent/slumber-config.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
