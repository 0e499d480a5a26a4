//! Validation pipeline for rule documents
//!
//! A document passes through three stages:
//!
//! - **Structural**: the compiled rule schema, with disjunction provenance
//!   recorded on every error
//! - **Semantic**: function signatures, rule-reference types and return-type
//!   agreement over the typed tree
//! - **Cascade classification**: errors caused only by the failure of a
//!   `oneOf` alternative are moved out of the result
//!
//! When line numbers are requested and source text is available, surviving
//! errors are annotated with the line they point at.
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

pub mod base;
pub mod cascade;
pub mod error;
pub mod path;
pub mod position;
pub mod semantic;
pub mod structural;

// Re-export commonly used types
pub use base::{ValidationContext, ValidationStage};
pub use cascade::{classify, Classification};
pub use error::{BranchFrame, ErrorKind, ValidationError};
pub use path::{JsonPath, PathParseError, PathSegment};
pub use position::{locate, LineIndex};
pub use semantic::SemanticValidator;
pub use structural::StructuralValidator;

use crate::catalog::FunctionCatalog;
use crate::schema::error::SchemaResult;
use crate::schema::RuleSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, debug_span};

/// Per-call switches for [`RuleValidator::validate`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationOptions {
    /// Annotate errors with source lines when source text is available
    pub compute_line_numbers: bool,
    /// Return cascade-suppressed errors alongside the kept ones
    pub include_cascade_suppressed: bool,
}

impl ValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line_numbers(mut self) -> Self {
        self.compute_line_numbers = true;
        self
    }

    pub fn with_suppressed(mut self) -> Self {
        self.include_cascade_suppressed = true;
        self
    }
}

/// Outcome of validating one document
///
/// `errors` is empty exactly when the document is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub schema_name: String,
    pub schema_version: String,
    pub errors: Vec<ValidationError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppressed: Option<Vec<ValidationError>>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// Validates rule documents against a schema and a function catalog
///
/// Holds only shared, immutable state; one instance can serve concurrent
/// callers.
#[derive(Debug, Clone)]
pub struct RuleValidator {
    schema: Arc<RuleSchema>,
    catalog: Arc<FunctionCatalog>,
    structural: StructuralValidator,
    semantic: SemanticValidator,
}

impl RuleValidator {
    pub fn new(schema: Arc<RuleSchema>, catalog: Arc<FunctionCatalog>) -> Self {
        Self {
            structural: StructuralValidator::new(Arc::clone(&schema)),
            semantic: SemanticValidator::new(Arc::clone(&catalog))
                .with_declared_rule_types(schema.declared_rule_types().to_vec()),
            schema,
            catalog,
        }
    }

    /// Validator over the schema and catalog bundled with this crate
    pub fn bundled() -> SchemaResult<Self> {
        Ok(Self::new(
            Arc::new(RuleSchema::bundled()?),
            Arc::new(FunctionCatalog::bundled()?),
        ))
    }

    pub fn schema(&self) -> &RuleSchema {
        &self.schema
    }

    pub fn catalog(&self) -> &FunctionCatalog {
        &self.catalog
    }

    /// The stages in the order they run
    pub fn stages(&self) -> [&dyn ValidationStage; 2] {
        [&self.structural, &self.semantic]
    }

    /// Validate a parsed document. `source` is the text it was parsed from,
    /// used only for line numbers.
    pub fn validate(&self, document: &Value, source: Option<&str>, options: &ValidationOptions) -> ValidationResult {
        let span = debug_span!("validate", schema = %self.schema.name(), version = %self.schema.version());
        let _guard = span.enter();

        let mut raw = Vec::new();
        for stage in self.stages() {
            let found = stage.check(document);
            debug!(stage = stage.name(), errors = found.len(), "Validation stage finished");
            raw.extend(found);
        }

        let Classification { mut kept, mut suppressed } = classify(raw);

        if let Some(text) = source.filter(|_| options.compute_line_numbers) {
            let index = LineIndex::new(text);
            annotate_lines(&index, &mut kept);
            if options.include_cascade_suppressed {
                annotate_lines(&index, &mut suppressed);
            }
        }

        self.result(kept, options.include_cascade_suppressed.then_some(suppressed))
    }

    /// Parse and validate JSON text. Unparseable text yields a result with
    /// a single parse failure.
    pub fn validate_text(&self, text: &str, options: &ValidationOptions) -> ValidationResult {
        match serde_json::from_str::<Value>(text) {
            Ok(document) => self.validate(&document, Some(text), options),
            Err(e) => {
                debug!(line = e.line(), column = e.column(), "Document is not valid JSON");
                let mut error = ValidationError::new(
                    ErrorKind::ParseFailure,
                    JsonPath::root(),
                    format!("Document is not valid JSON: {}", e),
                )
                .with_arguments(json!({ "line": e.line(), "column": e.column() }));
                if options.compute_line_numbers {
                    error = error.with_line_number(e.line());
                }
                self.result(vec![error], options.include_cascade_suppressed.then(Vec::new))
            }
        }
    }

    fn result(&self, errors: Vec<ValidationError>, suppressed: Option<Vec<ValidationError>>) -> ValidationResult {
        ValidationResult {
            schema_name: self.schema.name().to_string(),
            schema_version: self.schema.version().to_string(),
            errors,
            suppressed,
        }
    }
}

/// Attach source lines. A required-missing error names an absent property,
/// so it takes the line of the object that lacks it.
fn annotate_lines(index: &LineIndex<'_>, errors: &mut [ValidationError]) {
    for error in errors.iter_mut() {
        let line = match error.kind {
            ErrorKind::RequiredMissing => error
                .path
                .parent()
                .and_then(|container| index.locate(&container))
                .or_else(|| index.locate(&error.path)),
            _ => index.locate(&error.path),
        };
        error.line_number = line;
    }
}
