//! Validation error records shared by every validation stage
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

use crate::validation::path::JsonPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Violation family of a [`ValidationError`], serialized as its `type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    ParseFailure,
    RequiredMissing,
    EnumViolation,
    TypeMismatch,
    PatternViolation,
    DisjunctionViolation,
    ConstantViolation,
    AdditionalProperty,
    ArraySizeViolation,
    ConstraintViolation,
    SemanticViolation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ParseFailure => "parse-failure",
            ErrorKind::RequiredMissing => "required-missing",
            ErrorKind::EnumViolation => "enum-violation",
            ErrorKind::TypeMismatch => "type-mismatch",
            ErrorKind::PatternViolation => "pattern-violation",
            ErrorKind::DisjunctionViolation => "disjunction-violation",
            ErrorKind::ConstantViolation => "constant-violation",
            ErrorKind::AdditionalProperty => "additional-property",
            ErrorKind::ArraySizeViolation => "array-size-violation",
            ErrorKind::ConstraintViolation => "constraint-violation",
            ErrorKind::SemanticViolation => "semantic-violation",
        }
    }

    /// Stable machine-readable code used when a stage does not pick a more
    /// specific one
    pub fn default_code(&self) -> &'static str {
        match self {
            ErrorKind::ParseFailure => "validation.parse",
            ErrorKind::RequiredMissing => "validation.required",
            ErrorKind::EnumViolation => "validation.enum",
            ErrorKind::TypeMismatch => "validation.type",
            ErrorKind::PatternViolation => "validation.pattern",
            ErrorKind::DisjunctionViolation => "validation.one-of",
            ErrorKind::ConstantViolation => "validation.const",
            ErrorKind::AdditionalProperty => "validation.additional-property",
            ErrorKind::ArraySizeViolation => "validation.array-size",
            ErrorKind::ConstraintViolation => "validation.constraint",
            ErrorKind::SemanticViolation => "validation.semantic",
        }
    }

    /// Error family for a schema keyword, if the keyword names one
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "required" => ErrorKind::RequiredMissing,
            "enum" => ErrorKind::EnumViolation,
            "type" => ErrorKind::TypeMismatch,
            "pattern" => ErrorKind::PatternViolation,
            "oneOf" => ErrorKind::DisjunctionViolation,
            "const" => ErrorKind::ConstantViolation,
            "additionalProperties" => ErrorKind::AdditionalProperty,
            "minItems" | "maxItems" | "x-lengthOf" => ErrorKind::ArraySizeViolation,
            _ => ErrorKind::ConstraintViolation,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One alternative of a `oneOf` being evaluated: where the disjunction was
/// applied, which schema rule it was and which branch produced the error
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchFrame {
    pub anchor: JsonPath,
    pub schema_path: String,
    pub index: usize,
}

impl BranchFrame {
    pub fn new(anchor: JsonPath, schema_path: impl Into<String>, index: usize) -> Self {
        Self {
            anchor,
            schema_path: schema_path.into(),
            index,
        }
    }
}

/// A single validation finding
///
/// `branches` is the disjunction provenance chain, outermost first. It is
/// kept in memory for cascade classification and never serialized.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub code: String,
    pub path: JsonPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
    #[serde(skip)]
    pub branches: Vec<BranchFrame>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "{} at document root: {}", self.kind, self.message)?;
        } else {
            write!(f, "{} at '{}': {}", self.kind, self.path, self.message)?;
        }
        if let Some(line) = self.line_number {
            write!(f, " (line {})", line)?;
        }
        Ok(())
    }
}

impl ValidationError {
    /// Create an error with the kind's default code
    pub fn new<M: Into<String>>(kind: ErrorKind, path: JsonPath, message: M) -> Self {
        Self {
            kind,
            code: kind.default_code().to_string(),
            path,
            schema_path: None,
            message: message.into(),
            arguments: None,
            details: None,
            line_number: None,
            branches: Vec::new(),
        }
    }

    /// Create a semantic violation with a specific code
    pub fn semantic<C, M>(code: C, path: JsonPath, message: M) -> Self
    where
        C: Into<String>,
        M: Into<String>,
    {
        Self::new(ErrorKind::SemanticViolation, path, message).with_code(code)
    }

    pub fn with_code<C: Into<String>>(mut self, code: C) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_schema_path<S: Into<String>>(mut self, schema_path: S) -> Self {
        self.schema_path = Some(schema_path.into());
        self
    }

    pub fn with_arguments(mut self, arguments: Value) -> Self {
        self.arguments = Some(arguments);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_line_number(mut self, line: usize) -> Self {
        self.line_number = Some(line);
        self
    }

    pub fn with_branches(mut self, branches: Vec<BranchFrame>) -> Self {
        self.branches = branches;
        self
    }

    /// The disjunction branch this error was raised in directly, if any
    pub fn innermost_branch(&self) -> Option<&BranchFrame> {
        self.branches.last()
    }

    pub fn is_disjunction(&self) -> bool {
        self.kind == ErrorKind::DisjunctionViolation
    }
}
