//! Rulekit Schemas - validation core for rule documents
//!
//! A rule document is a small expression/condition language serialized as
//! JSON. This crate validates such documents and reports a minimal,
//! actionable set of errors:
//!
//! - **Structural validation** against the bundled JSON Schema (draft
//!   2020-12) with exact document paths for every violation
//! - **Semantic validation** of function calls, rule references and
//!   return types against a function catalog
//! - **Cascade suppression** of the derived errors that failing `oneOf`
//!   alternatives produce
//! - **Position mapping** from document paths back to source lines
//!
//! ## Quick Start
//!
//! ```rust
//! use rulekit_schemas::{RuleValidator, ValidationOptions};
//!
//! let validator = RuleValidator::bundled().unwrap();
//! let text = r#"{
//!   "structure": "expression",
//!   "definition": {"type": "value", "returnType": "number"}
//! }"#;
//!
//! let result = validator.validate_text(text, &ValidationOptions::new().with_line_numbers());
//! assert_eq!(result.errors.len(), 1);
//! assert_eq!(result.errors[0].path.to_string(), "definition.value");
//! assert_eq!(result.errors[0].line_number, Some(3));
//! ```
//!
//! The schema and the function catalog are explicit values; load custom
//! ones with [`loader`] and pass them to [`RuleValidator::new`].
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

pub mod catalog;
pub mod loader;
pub mod model;
pub mod schema;
pub mod validation;

// Re-export commonly used types for convenience
pub use catalog::{ArgType, Arity, FunctionCatalog, FunctionSignature, RuleTypeTables};
pub use model::ReturnType;
pub use schema::error::{SchemaError, SchemaResult};
pub use schema::RuleSchema;
pub use validation::{
    classify, locate, Classification, ErrorKind, JsonPath, LineIndex, RuleValidator, ValidationError,
    ValidationOptions, ValidationResult,
};
