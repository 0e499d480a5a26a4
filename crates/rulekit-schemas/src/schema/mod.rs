//! The rule document schema
//!
//! A [`RuleSchema`] is built once from a JSON Schema (draft 2020-12)
//! document and shared read-only by every validation. Construction rejects
//! non-local references and `$ref` cycles, then compiles the document with
//! the `jsonschema` compiler plus the `x-lengthOf` extension keyword.
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

pub mod error;
pub(crate) mod keywords;
mod references;

pub use error::{SchemaError, SchemaResult};

use serde_json::Value;
use std::fmt;
use tracing::debug;

// Embed the schema at compile time for reliability
const RULE_SCHEMA: &str = include_str!("../../../../schemas/rule.schema.json");

/// A compiled, immutable rule schema
pub struct RuleSchema {
    name: String,
    version: String,
    document: Value,
    rule_types: Vec<String>,
    validator: jsonschema::Validator,
}

impl fmt::Debug for RuleSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSchema")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish()
    }
}

impl RuleSchema {
    /// The schema bundled with this crate
    pub fn bundled() -> SchemaResult<Self> {
        Self::from_str(RULE_SCHEMA)
    }

    /// Parse and compile schema text
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> SchemaResult<Self> {
        let document: Value = serde_json::from_str(text).map_err(|source| SchemaError::Parse { source })?;
        Self::from_value(document)
    }

    /// Compile a schema document
    pub fn from_value(document: Value) -> SchemaResult<Self> {
        if !document.is_object() {
            return Err(SchemaError::invalid("schema must be a JSON object at the root level"));
        }

        references::check_references(&document)?;
        let validator = jsonschema::options()
            .with_keyword(keywords::LENGTH_OF, keywords::length_of)
            .build(&document)
            .map_err(|e| SchemaError::invalid(e.to_string()))?;

        let name = document
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("RuleDefinition")
            .to_string();
        let version = match document.get("version") {
            Some(Value::String(version)) => version.clone(),
            Some(Value::Number(version)) => version.to_string(),
            _ => "unversioned".to_string(),
        };

        let rule_types = document
            .pointer("/$defs/ruleType/enum")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        debug!(schema = %name, version = %version, "Compiled rule schema");

        Ok(Self {
            name,
            version,
            document,
            rule_types,
            validator,
        })
    }

    /// Schema name reported in validation results (the `title` keyword)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema version reported in validation results
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The raw schema document
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Names allowed by `$defs/ruleType`; empty when the schema has none
    pub fn declared_rule_types(&self) -> &[String] {
        &self.rule_types
    }

    pub(crate) fn validator(&self) -> &jsonschema::Validator {
        &self.validator
    }
}
