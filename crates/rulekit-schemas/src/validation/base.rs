//! Base validation trait and evaluation context
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

use crate::validation::error::{BranchFrame, ErrorKind, ValidationError};
use crate::validation::path::JsonPath;
use serde_json::Value;

/// A validation stage over a parsed rule document.
///
/// Stages never fail: every finding is returned as data.
pub trait ValidationStage {
    /// Short stage name used in logs
    fn name(&self) -> &'static str;

    /// Collect every violation this stage can detect
    fn check(&self, document: &Value) -> Vec<ValidationError>;
}

/// The chain of disjunction branches entered to reach an error
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub branches: Vec<BranchFrame>,
}

impl ValidationContext {
    /// Context outside every disjunction
    pub fn new() -> Self {
        Self::default()
    }

    /// One disjunction branch deeper: branch `index` of the `oneOf` at
    /// `schema_path`, applied to the value at `anchor`
    pub fn branch(&self, anchor: &JsonPath, schema_path: &str, index: usize) -> Self {
        let mut branches = self.branches.clone();
        branches.push(BranchFrame::new(anchor.clone(), schema_path, index));
        Self { branches }
    }

    /// An error carrying this context's provenance
    pub fn error_at<M: Into<String>>(
        &self,
        path: JsonPath,
        kind: ErrorKind,
        schema_path: String,
        message: M,
    ) -> ValidationError {
        ValidationError::new(kind, path, message)
            .with_schema_path(schema_path)
            .with_branches(self.branches.clone())
    }
}
