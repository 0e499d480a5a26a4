//! Parsing of YAML and JSON files into JSON values
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

use crate::loader::error::{LoaderError, LoaderResult};
use serde_json::Value;
use std::path::Path;

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// YAML format (.yaml, .yml)
    Yaml,
    /// JSON format (.json)
    Json,
}

impl Format {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> LoaderResult<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            _ => Err(LoaderError::unsupported_format(path)),
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Format::Yaml => &["yaml", "yml"],
            Format::Json => &["json"],
        }
    }

    /// Whether line numbers computed over the text are meaningful
    pub fn supports_positions(&self) -> bool {
        matches!(self, Format::Json)
    }
}

/// A file read from disk together with its detected format
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub format: Format,
    pub text: String,
}

/// Parser for rule documents and definition files
#[derive(Debug, Default)]
pub struct DocumentParser;

impl DocumentParser {
    pub fn new() -> Self {
        Self
    }

    /// Read a file and detect its format without parsing it
    pub fn read(&self, path: &Path) -> LoaderResult<SourceFile> {
        let format = Format::from_path(path)?;
        let text = std::fs::read_to_string(path).map_err(|e| LoaderError::io_error(path, e))?;
        Ok(SourceFile { format, text })
    }

    /// Parse a file, detecting format from extension
    pub fn parse_file(&self, path: &Path) -> LoaderResult<Value> {
        let source = self.read(path)?;
        self.parse_content(&source.text, source.format, path)
    }

    /// Parse content with explicit format
    pub fn parse_content(&self, content: &str, format: Format, path: &Path) -> LoaderResult<Value> {
        match format {
            Format::Yaml => self.parse_yaml(content, path),
            Format::Json => self.parse_json(content, path),
        }
    }

    pub fn parse_yaml(&self, content: &str, path: &Path) -> LoaderResult<Value> {
        // Parse as YAML first to surface YAML-specific errors
        let yaml_value: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| LoaderError::yaml_parse_error(path, e))?;

        serde_json::to_value(yaml_value).map_err(|e| LoaderError::json_parse_error(path, e))
    }

    pub fn parse_json(&self, content: &str, path: &Path) -> LoaderResult<Value> {
        serde_json::from_str(content).map_err(|e| LoaderError::json_parse_error(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path(Path::new("rule.yaml")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("rule.YML")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("rule.json")).unwrap(), Format::Json);

        assert!(Format::from_path(Path::new("rule.txt")).is_err());
        assert!(Format::from_path(Path::new("rule")).is_err());
        assert!(Format::Json.supports_positions());
        assert!(!Format::Yaml.supports_positions());
    }

    #[test]
    fn test_yaml_parsing() -> LoaderResult<()> {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("rule.yaml");

        let yaml_content = r#"
structure: expression
returnType: number
definition:
  type: value
  returnType: number
  value: 42
"#;

        fs::write(&file_path, yaml_content).map_err(|e| LoaderError::io_error(&file_path, e))?;

        let result = DocumentParser::new().parse_file(&file_path)?;
        assert_eq!(result["structure"], "expression");
        assert_eq!(result["definition"]["value"], 42);

        Ok(())
    }

    #[test]
    fn test_json_parsing_and_errors() -> LoaderResult<()> {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("rule.json");
        fs::write(&file_path, r#"{"structure": "condition"}"#).map_err(|e| LoaderError::io_error(&file_path, e))?;

        let parser = DocumentParser::new();
        let source = parser.read(&file_path)?;
        assert_eq!(source.format, Format::Json);
        assert_eq!(parser.parse_file(&file_path)?["structure"], "condition");

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{").map_err(|e| LoaderError::io_error(&broken, e))?;
        assert!(matches!(
            parser.parse_file(&broken),
            Err(LoaderError::JsonParseError { .. })
        ));

        let missing = dir.path().join("missing.json");
        assert!(matches!(parser.parse_file(&missing), Err(LoaderError::IoError { .. })));
        Ok(())
    }
}
