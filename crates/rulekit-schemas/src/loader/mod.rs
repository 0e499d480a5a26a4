//! Loading rule documents, schemas and function catalogs from disk
//!
//! Rule documents may be JSON or YAML. Line numbers are only computed for
//! JSON sources, since they are derived from the text itself.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use rulekit_schemas::loader;
//! use std::path::Path;
//!
//! let schema = loader::load_schema(Path::new("schemas/rule.schema.json"))?;
//! let document = loader::load_document(Path::new("rules/discount.yaml"))?;
//! println!("{} {}", schema.name(), document["structure"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

pub mod error;
pub mod parser;

pub use error::{LoaderError, LoaderResult};
pub use parser::{DocumentParser, Format, SourceFile};

use crate::catalog::FunctionCatalog;
use crate::schema::RuleSchema;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Read a rule document without parsing it
pub fn load_source(path: &Path) -> LoaderResult<SourceFile> {
    DocumentParser::new().read(path)
}

/// Read and parse a rule document
pub fn load_document(path: &Path) -> LoaderResult<Value> {
    DocumentParser::new().parse_file(path)
}

/// Load and compile a rule schema
pub fn load_schema(path: &Path) -> LoaderResult<RuleSchema> {
    let document = load_document(path)?;
    let schema = RuleSchema::from_value(document).map_err(|e| LoaderError::schema(path, e))?;
    debug!(path = %path.display(), name = schema.name(), version = schema.version(), "Loaded rule schema");
    Ok(schema)
}

/// Load a function catalog
pub fn load_catalog(path: &Path) -> LoaderResult<FunctionCatalog> {
    let document = load_document(path)?;
    let catalog = FunctionCatalog::from_value(document).map_err(|e| LoaderError::schema(path, e))?;
    debug!(path = %path.display(), functions = catalog.len(), "Loaded function catalog");
    Ok(catalog)
}
