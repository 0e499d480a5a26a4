//! Function signatures and rule-type tables used by semantic validation
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

use crate::model::ReturnType;
use crate::schema::error::{SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

// Embed the catalog at compile time for reliability
const FUNCTION_CATALOG: &str = include_str!("../../../schemas/functions.json");

/// Type accepted by a function argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    Boolean,
    Number,
    Text,
    Date,
    Any,
}

impl ArgType {
    pub fn accepts(&self, actual: ReturnType) -> bool {
        match self {
            ArgType::Any => true,
            ArgType::Boolean => actual == ReturnType::Boolean,
            ArgType::Number => actual == ReturnType::Number,
            ArgType::Text => actual == ReturnType::Text,
            ArgType::Date => actual == ReturnType::Date,
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArgType::Boolean => "boolean",
            ArgType::Number => "number",
            ArgType::Text => "text",
            ArgType::Date => "date",
            ArgType::Any => "any",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub arg_type: ArgType,
    #[serde(default)]
    pub optional: bool,
}

/// Argument shape of a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arity {
    /// Ordered, named parameters
    Fixed(Vec<ArgumentSpec>),
    /// Any number of arguments of one element type
    Dynamic {
        min: usize,
        max: Option<usize>,
        element_type: ArgType,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawSignature")]
pub struct FunctionSignature {
    pub name: String,
    pub return_type: ReturnType,
    pub arity: Arity,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawSignature {
    name: String,
    return_type: ReturnType,
    arguments: Option<Vec<ArgumentSpec>>,
    min_arguments: Option<usize>,
    max_arguments: Option<usize>,
    element_type: Option<ArgType>,
    #[serde(default)]
    #[allow(dead_code)]
    description: Option<String>,
}

impl TryFrom<RawSignature> for FunctionSignature {
    type Error = String;

    fn try_from(raw: RawSignature) -> Result<Self, Self::Error> {
        let arity = match (raw.arguments, raw.element_type) {
            (Some(arguments), None) => {
                if raw.min_arguments.is_some() || raw.max_arguments.is_some() {
                    return Err(format!(
                        "function '{}' mixes 'arguments' with 'minArguments'/'maxArguments'",
                        raw.name
                    ));
                }
                let mut seen_optional = false;
                for spec in &arguments {
                    if seen_optional && !spec.optional {
                        return Err(format!(
                            "function '{}' declares required argument '{}' after an optional one",
                            raw.name, spec.name
                        ));
                    }
                    seen_optional |= spec.optional;
                }
                Arity::Fixed(arguments)
            }
            (None, Some(element_type)) => {
                let min = raw.min_arguments.unwrap_or(0);
                if let Some(max) = raw.max_arguments.filter(|max| *max < min) {
                    return Err(format!(
                        "function '{}' has maxArguments {} below minArguments {}",
                        raw.name, max, min
                    ));
                }
                Arity::Dynamic {
                    min,
                    max: raw.max_arguments,
                    element_type,
                }
            }
            (Some(_), Some(_)) => {
                return Err(format!(
                    "function '{}' declares both 'arguments' and 'elementType'",
                    raw.name
                ))
            }
            (None, None) => {
                return Err(format!(
                    "function '{}' needs either 'arguments' or 'elementType'",
                    raw.name
                ))
            }
        };

        Ok(FunctionSignature {
            name: raw.name,
            return_type: raw.return_type,
            arity,
        })
    }
}

impl FunctionSignature {
    /// Number of arguments that must be supplied
    pub fn required_count(&self) -> usize {
        match &self.arity {
            Arity::Fixed(specs) => specs.iter().filter(|s| !s.optional).count(),
            Arity::Dynamic { min, .. } => *min,
        }
    }

    /// Upper bound on supplied arguments, if any
    pub fn max_count(&self) -> Option<usize> {
        match &self.arity {
            Arity::Fixed(specs) => Some(specs.len()),
            Arity::Dynamic { max, .. } => *max,
        }
    }
}

/// Rule types accepted by rule references in each context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTypeTables {
    pub condition: Vec<String>,
    pub condition_group: Vec<String>,
    /// Suggested type for expression-context references; not enforced
    #[serde(default)]
    pub expression_default: Option<String>,
}

impl RuleTypeTables {
    pub fn allows_condition(&self, rule_type: &str) -> bool {
        self.condition.iter().any(|t| t == rule_type)
    }

    pub fn allows_condition_group(&self, rule_type: &str) -> bool {
        self.condition_group.iter().any(|t| t == rule_type)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCatalog {
    #[serde(default)]
    version: Option<String>,
    rule_types: RuleTypeTables,
    functions: Vec<FunctionSignature>,
}

/// Immutable table of known functions and rule-type constraints
#[derive(Debug, Clone)]
pub struct FunctionCatalog {
    version: String,
    rule_types: RuleTypeTables,
    functions: Vec<FunctionSignature>,
    by_name: HashMap<String, usize>,
}

impl FunctionCatalog {
    /// The catalog bundled with this crate
    pub fn bundled() -> SchemaResult<Self> {
        Self::from_str(FUNCTION_CATALOG)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> SchemaResult<Self> {
        let raw: RawCatalog =
            serde_json::from_str(text).map_err(|e| SchemaError::invalid_catalog(e.to_string()))?;
        Self::from_raw(raw)
    }

    pub fn from_value(value: Value) -> SchemaResult<Self> {
        let raw: RawCatalog =
            serde_json::from_value(value).map_err(|e| SchemaError::invalid_catalog(e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawCatalog) -> SchemaResult<Self> {
        let mut by_name = HashMap::with_capacity(raw.functions.len());
        for (index, signature) in raw.functions.iter().enumerate() {
            if by_name.insert(signature.name.clone(), index).is_some() {
                return Err(SchemaError::invalid_catalog(format!(
                    "function '{}' is declared more than once",
                    signature.name
                )));
            }
        }
        Ok(Self {
            version: raw.version.unwrap_or_else(|| "unversioned".to_string()),
            rule_types: raw.rule_types,
            functions: raw.functions,
            by_name,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn rule_types(&self) -> &RuleTypeTables {
        &self.rule_types
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSignature> {
        self.by_name.get(name).map(|index| &self.functions[*index])
    }

    /// Signatures in declaration order
    pub fn functions(&self) -> impl Iterator<Item = &FunctionSignature> {
        self.functions.iter()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bundled_catalog() {
        let catalog = FunctionCatalog::bundled().unwrap();
        assert!(!catalog.is_empty());

        let round = catalog.get("round").unwrap();
        assert_eq!(round.return_type, ReturnType::Number);
        assert_eq!(round.required_count(), 1);
        assert_eq!(round.max_count(), Some(2));

        let concat = catalog.get("concat").unwrap();
        assert_eq!(
            concat.arity,
            Arity::Dynamic {
                min: 2,
                max: Some(16),
                element_type: ArgType::Text
            }
        );

        assert!(catalog.rule_types().allows_condition("Validation"));
        assert!(!catalog.rule_types().allows_condition_group("Validation"));
        assert!(catalog.rule_types().allows_condition_group("ConditionGroup"));
    }

    #[test]
    fn test_any_accepts_every_type() {
        for t in [ReturnType::Boolean, ReturnType::Number, ReturnType::Text, ReturnType::Date] {
            assert!(ArgType::Any.accepts(t));
        }
        assert!(!ArgType::Number.accepts(ReturnType::Text));
    }

    fn catalog_with(functions: Value) -> SchemaResult<FunctionCatalog> {
        FunctionCatalog::from_value(json!({
            "ruleTypes": {"condition": ["Condition"], "conditionGroup": ["ConditionGroup"]},
            "functions": functions
        }))
    }

    #[test]
    fn test_rejects_inconsistent_signatures() {
        assert!(catalog_with(json!([{"name": "f", "returnType": "number"}])).is_err());
        assert!(catalog_with(json!([{
            "name": "f", "returnType": "number",
            "arguments": [], "elementType": "number"
        }]))
        .is_err());
        assert!(catalog_with(json!([{
            "name": "f", "returnType": "number",
            "minArguments": 3, "maxArguments": 2, "elementType": "number"
        }]))
        .is_err());
        assert!(catalog_with(json!([{
            "name": "f", "returnType": "number",
            "arguments": [
                {"name": "a", "type": "number", "optional": true},
                {"name": "b", "type": "number"}
            ]
        }]))
        .is_err());
    }

    #[test]
    fn test_rejects_duplicates() {
        let err = catalog_with(json!([
            {"name": "f", "returnType": "number", "arguments": []},
            {"name": "f", "returnType": "text", "arguments": []}
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
        assert_eq!(catalog_with(json!([])).unwrap().version(), "unversioned");
    }
}
