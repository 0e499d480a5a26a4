//! Configuration management for the CLI
//!
//! Configuration comes from, in order of precedence:
//! - Command-line arguments
//! - The file named by `--config` / `RULEKIT_CONFIG`
//! - The first of `.rulekit.{yaml,json,toml}` in the current directory or
//!   `config.{yaml,json,toml}` in the user config directory
//! - Default values

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const FILE_EXTENSIONS: [&str; 4] = ["yaml", "yml", "json", "toml"];

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Custom schema and function catalog
    pub schema: SchemaConfig,

    /// Validation defaults
    pub validation: ValidationConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Where to load the rule schema and function catalog from; the bundled
/// ones are used when unset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub schema_path: Option<PathBuf>,
    pub functions_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Annotate errors with source lines
    pub line_numbers: bool,

    /// Report cascade-suppressed errors too
    pub show_suppressed: bool,

    /// Maximum number of files validated at once
    pub concurrency: usize,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Use colored output by default
    pub color: bool,

    /// Show progress indicators
    pub progress: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,

    /// Log format (compact, full, json)
    pub format: Option<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            line_numbers: true,
            show_suppressed: false,
            concurrency: 8,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color: true,
            progress: true,
        }
    }
}

/// File formats a configuration file may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Yaml,
    Json,
    Toml,
}

impl FileFormat {
    fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            _ => Err(Error::config(format!(
                "Unsupported configuration file '{}'; expected one of: {}",
                path.display(),
                FILE_EXTENSIONS.join(", ")
            ))),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;

        let config = match FileFormat::from_path(path)? {
            FileFormat::Yaml => serde_yaml::from_str(&content)?,
            FileFormat::Json => serde_json::from_str(&content)?,
            FileFormat::Toml => toml::from_str(&content)
                .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?,
        };

        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        for path in Self::default_config_paths() {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable configuration file");
                    }
                }
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file or default locations
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        match file {
            Some(path) => Self::from_file(path),
            None => Self::load(),
        }
    }

    /// Project configuration file written by `config init`
    pub fn project_path() -> PathBuf {
        PathBuf::from(".rulekit.toml")
    }

    /// User configuration file written by `config init --user`
    pub fn user_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rulekit").join("config.toml"))
    }

    /// Get default configuration file paths to check
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = FILE_EXTENSIONS
            .iter()
            .map(|ext| PathBuf::from(format!(".rulekit.{}", ext)))
            .collect();

        if let Some(config_dir) = dirs::config_dir() {
            let rulekit_dir = config_dir.join("rulekit");
            paths.extend(FILE_EXTENSIONS.iter().map(|ext| rulekit_dir.join(format!("config.{}", ext))));
        }

        paths
    }

    /// Render the configuration in the format implied by `path`
    pub fn render_for(&self, path: &Path) -> Result<String> {
        Ok(match FileFormat::from_path(path)? {
            FileFormat::Yaml => serde_yaml::to_string(self)?,
            FileFormat::Json => serde_json::to_string_pretty(self)?,
            FileFormat::Toml => toml::to_string_pretty(self)?,
        })
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.render_for(path)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.validation.line_numbers);
        assert!(!config.validation.show_suppressed);
        assert!(config.schema.schema_path.is_none());
        assert!(config.logging.level.is_none());
    }

    #[test]
    fn test_round_trip_through_every_format() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.schema.functions_path = Some(PathBuf::from("catalog/functions.json"));
        config.validation.concurrency = 2;
        config.logging.level = Some("debug".to_string());

        for name in ["config.toml", "config.yaml", "config.json"] {
            let path = dir.path().join(name);
            config.save(&path).unwrap();
            assert_eq!(Config::from_file(&path).unwrap(), config, "{}", name);
        }
    }

    #[test]
    fn test_partial_files_fill_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.yaml");
        std::fs::write(&path, "validation:\n  show_suppressed: true\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert!(config.validation.show_suppressed);
        assert!(config.validation.line_numbers);
        assert_eq!(config.validation.concurrency, 8);
    }

    #[test]
    fn test_rejects_unknown_extensions_and_missing_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(matches!(Config::from_file(&path), Err(Error::Config(_))));
        assert!(matches!(
            Config::from_file(&dir.path().join("absent.toml")),
            Err(Error::FileNotFound { .. })
        ));
    }
}
