//! Error types for loading rule documents, schemas and catalogs
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

use crate::schema::error::SchemaError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;

#[derive(Error, Debug)]
pub enum LoaderError {
    /// File I/O errors
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// YAML parsing errors
    #[error("Failed to parse YAML file '{path}': {source}")]
    YamlParseError {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// JSON parsing errors
    #[error("Failed to parse JSON file '{path}': {source}")]
    JsonParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Unsupported file format
    #[error("Unsupported file format for '{path}'. Expected .yaml, .yml, or .json")]
    UnsupportedFormat { path: PathBuf },

    /// The file parsed but is not a usable schema or function catalog
    #[error("Invalid definition in '{path}': {source}")]
    Schema {
        path: PathBuf,
        source: SchemaError,
    },
}

impl LoaderError {
    pub fn io_error(path: &Path, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.to_path_buf(),
            source: error,
        }
    }

    pub fn yaml_parse_error(path: &Path, error: serde_yaml::Error) -> Self {
        Self::YamlParseError {
            path: path.to_path_buf(),
            source: error,
        }
    }

    pub fn json_parse_error(path: &Path, error: serde_json::Error) -> Self {
        Self::JsonParseError {
            path: path.to_path_buf(),
            source: error,
        }
    }

    pub fn unsupported_format(path: &Path) -> Self {
        Self::UnsupportedFormat {
            path: path.to_path_buf(),
        }
    }

    pub fn schema(path: &Path, error: SchemaError) -> Self {
        Self::Schema {
            path: path.to_path_buf(),
            source: error,
        }
    }

    /// Path of the file the error relates to
    pub fn path(&self) -> &Path {
        match self {
            Self::IoError { path, .. }
            | Self::YamlParseError { path, .. }
            | Self::JsonParseError { path, .. }
            | Self::UnsupportedFormat { path }
            | Self::Schema { path, .. } => path,
        }
    }
}
