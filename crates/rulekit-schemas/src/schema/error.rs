//! Error types for schema and catalog loading
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

use thiserror::Error;

/// Result type for schema and catalog construction
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Failures raised while building a [`RuleSchema`](crate::schema::RuleSchema)
/// or a [`FunctionCatalog`](crate::catalog::FunctionCatalog)
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Schema text is not JSON
    #[error("Failed to parse schema: {source}")]
    Parse { source: serde_json::Error },

    /// Schema was rejected by the JSON Schema compiler
    #[error("Invalid schema: {reason}")]
    Invalid { reason: String },

    /// `$ref` outside of the local `#/$defs/` namespace
    #[error("Unsupported reference '{reference}' at '{location}': only local '#/$defs/...' references are allowed")]
    UnsupportedReference { reference: String, location: String },

    /// `$ref` to a definition that does not exist
    #[error("Unknown definition '{reference}' referenced at '{location}'")]
    UnknownDefinition { reference: String, location: String },

    /// References that loop without descending into the document
    #[error("Reference cycle detected: {chain}")]
    ReferenceCycle { chain: String },

    /// A reference keyword with a malformed value
    #[error("Invalid '{keyword}' at '{location}': {reason}")]
    InvalidKeyword {
        keyword: String,
        location: String,
        reason: String,
    },

    /// Function catalog could not be decoded or is inconsistent
    #[error("Invalid function catalog: {reason}")]
    InvalidCatalog { reason: String },
}

impl SchemaError {
    pub fn invalid<R: Into<String>>(reason: R) -> Self {
        Self::Invalid { reason: reason.into() }
    }

    pub fn invalid_keyword<K, L, R>(keyword: K, location: L, reason: R) -> Self
    where
        K: Into<String>,
        L: Into<String>,
        R: Into<String>,
    {
        Self::InvalidKeyword {
            keyword: keyword.into(),
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn reference_cycle(chain: &[String]) -> Self {
        Self::ReferenceCycle {
            chain: chain.join(" -> "),
        }
    }

    pub fn invalid_catalog<R: Into<String>>(reason: R) -> Self {
        Self::InvalidCatalog { reason: reason.into() }
    }
}
