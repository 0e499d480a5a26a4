//! Structural validation against the rule schema
//!
//! The compiled `jsonschema` validator reports every failing keyword and
//! this stage converts its errors into [`ValidationError`]s. A failed
//! `oneOf` becomes a disjunction violation at its anchor followed by the
//! errors of every branch; each branch error carries one
//! [`BranchFrame`](crate::validation::error::BranchFrame) per enclosing
//! disjunction so the cascade classifier can reason about branch
//! membership without re-deriving it from paths or messages.
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

use crate::schema::keywords::LENGTH_OF;
use crate::schema::RuleSchema;
use crate::validation::base::{ValidationContext, ValidationStage};
use crate::validation::error::{ErrorKind, ValidationError};
use crate::validation::path::JsonPath;
use jsonschema::error::{TypeKind, ValidationErrorKind};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, trace};

type SchemaViolation<'a> = jsonschema::ValidationError<'a>;

/// Structural stage of the validation pipeline
#[derive(Debug, Clone)]
pub struct StructuralValidator {
    schema: Arc<RuleSchema>,
}

impl StructuralValidator {
    pub fn new(schema: Arc<RuleSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &RuleSchema {
        &self.schema
    }

    /// Evaluate `document` against the schema and return the raw,
    /// unclassified violations
    pub fn validate_structure(&self, document: &Value) -> Vec<ValidationError> {
        let validator = self.schema.validator();
        if validator.is_valid(document) {
            return Vec::new();
        }

        let converter = Converter { document };
        let mut errors = Vec::new();
        converter.convert(validator.iter_errors(document).collect(), &ValidationContext::new(), &mut errors);
        debug!(count = errors.len(), "Schema validation reported violations");
        errors
    }
}

impl ValidationStage for StructuralValidator {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn check(&self, document: &Value) -> Vec<ValidationError> {
        self.validate_structure(document)
    }
}

struct Converter<'d> {
    document: &'d Value,
}

impl Converter<'_> {
    /// Convert the errors of one evaluation level. A type mismatch hides the
    /// other errors raised by the same schema object for the same value,
    /// since those keywords assume the declared shape.
    fn convert(&self, violations: Vec<SchemaViolation<'_>>, ctx: &ValidationContext, out: &mut Vec<ValidationError>) {
        let mismatched: Vec<(String, String)> = violations
            .iter()
            .filter(|v| is_type_error(v))
            .map(|v| (v.instance_path.to_string(), schema_object(v.schema_path.as_str()).to_string()))
            .collect();

        for violation in violations {
            let shadowed = !is_type_error(&violation)
                && mismatched.iter().any(|(instance, object)| {
                    instance == violation.instance_path.as_str() && object == schema_object(violation.schema_path.as_str())
                });
            if shadowed {
                trace!(schema_path = %violation.schema_path, "Skipping keyword shadowed by a type mismatch");
                continue;
            }
            self.convert_one(violation, ctx, out);
        }
    }

    fn convert_one(&self, violation: SchemaViolation<'_>, ctx: &ValidationContext, out: &mut Vec<ValidationError>) {
        let message = violation.to_string();
        let path = JsonPath::from_pointer(violation.instance_path.as_str(), self.document);
        let schema_path = format!("#{}", violation.schema_path);
        let keyword = schema_path.rsplit('/').next().unwrap_or_default().to_string();
        let instance = violation.instance.as_ref();

        let error = match violation.kind {
            ValidationErrorKind::OneOfNotValid { context } => {
                trace!(anchor = %path, schema_path = %schema_path, branches = context.len(), "No branch matched");
                out.push(
                    ctx.error_at(
                        path.clone(),
                        ErrorKind::DisjunctionViolation,
                        schema_path.clone(),
                        format!("Value does not match any of the {} allowed shapes", context.len()),
                    )
                    .with_arguments(json!({ "branches": context.len() })),
                );
                for (index, branch) in context.into_iter().enumerate() {
                    self.convert(branch, &ctx.branch(&path, &schema_path, index), out);
                }
                return;
            }
            ValidationErrorKind::OneOfMultipleValid { context } => {
                let matched: Vec<usize> = context
                    .iter()
                    .enumerate()
                    .filter(|(_, errors)| errors.is_empty())
                    .map(|(index, _)| index)
                    .collect();
                ctx.error_at(
                    path,
                    ErrorKind::DisjunctionViolation,
                    schema_path,
                    format!("Value matches {} of the allowed shapes, expected exactly one", matched.len()),
                )
                .with_code("validation.one-of.ambiguous")
                .with_arguments(json!({ "matched": matched }))
            }
            ValidationErrorKind::Required { property } => {
                let name = property.as_str().map_or_else(|| property.to_string(), str::to_string);
                ctx.error_at(
                    path.key(name.as_str()),
                    ErrorKind::RequiredMissing,
                    schema_path,
                    format!("'{}' is a required property", name),
                )
                .with_arguments(json!({ "property": name }))
            }
            ValidationErrorKind::AdditionalProperties { unexpected } => {
                for name in unexpected {
                    out.push(
                        ctx.error_at(
                            path.key(name.as_str()),
                            ErrorKind::AdditionalProperty,
                            schema_path.clone(),
                            format!("Additional property '{}' is not allowed", name),
                        )
                        .with_arguments(json!({ "property": name })),
                    );
                }
                return;
            }
            ValidationErrorKind::Type { kind } => {
                let expected: Vec<String> = match kind {
                    TypeKind::Single(expected) => vec![expected.to_string()],
                    TypeKind::Multiple(set) => set.iter().map(|t| t.to_string()).collect(),
                };
                ctx.error_at(path, ErrorKind::TypeMismatch, schema_path, message)
                    .with_arguments(json!({ "expected": expected, "actual": type_name(instance) }))
            }
            ValidationErrorKind::Enum { options } => ctx
                .error_at(path, ErrorKind::EnumViolation, schema_path, message)
                .with_arguments(json!({ "allowed": options, "actual": instance })),
            ValidationErrorKind::Constant { expected_value } => ctx
                .error_at(path, ErrorKind::ConstantViolation, schema_path, message)
                .with_arguments(json!({ "expected": expected_value, "actual": instance })),
            ValidationErrorKind::Pattern { pattern } => ctx
                .error_at(path, ErrorKind::PatternViolation, schema_path, message)
                .with_arguments(json!({ "pattern": pattern, "actual": instance })),
            ValidationErrorKind::MinItems { limit } | ValidationErrorKind::MaxItems { limit } => ctx
                .error_at(path, ErrorKind::ArraySizeViolation, schema_path, message)
                .with_arguments(json!({ "limit": limit, "actual": item_count(instance) })),
            ValidationErrorKind::Minimum { limit } => ctx
                .error_at(path, ErrorKind::ConstraintViolation, schema_path, message)
                .with_code("validation.constraint.minimum")
                .with_arguments(json!({ "limit": limit, "actual": instance })),
            ValidationErrorKind::Maximum { limit } => ctx
                .error_at(path, ErrorKind::ConstraintViolation, schema_path, message)
                .with_code("validation.constraint.maximum")
                .with_arguments(json!({ "limit": limit, "actual": instance })),
            ValidationErrorKind::Custom { .. } if keyword == LENGTH_OF => ctx
                .error_at(path, ErrorKind::ArraySizeViolation, schema_path, message)
                .with_code("validation.array-size.paired")
                .with_arguments(json!({ "actual": item_count(instance) })),
            _ => ctx
                .error_at(path, ErrorKind::from_keyword(&keyword), schema_path, message)
                .with_arguments(json!({ "keyword": keyword })),
        };
        out.push(error);
    }
}

fn is_type_error(violation: &SchemaViolation<'_>) -> bool {
    matches!(violation.kind, ValidationErrorKind::Type { .. })
}

/// Location of the schema object that owns the keyword at `keyword_path`
fn schema_object(keyword_path: &str) -> &str {
    keyword_path.rsplit_once('/').map_or("", |(object, _)| object)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
    }
}

fn item_count(value: &Value) -> usize {
    value.as_array().map_or(0, Vec::len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(schema: Value) -> StructuralValidator {
        StructuralValidator::new(Arc::new(RuleSchema::from_value(schema).unwrap()))
    }

    fn sorted_kinds(errors: &[ValidationError]) -> Vec<(ErrorKind, String)> {
        let mut found: Vec<(ErrorKind, String)> = errors.iter().map(|e| (e.kind, e.path.to_string())).collect();
        found.sort_by(|a, b| a.1.cmp(&b.1));
        found
    }

    fn find<'e>(errors: &'e [ValidationError], path: &str) -> &'e ValidationError {
        errors
            .iter()
            .find(|e| e.path.to_string() == path)
            .unwrap_or_else(|| panic!("no error at '{}'", path))
    }

    #[test]
    fn test_required_and_additional_paths_name_the_property() {
        let v = validator(json!({
            "type": "object",
            "required": ["a"],
            "properties": {"a": {"type": "string"}},
            "additionalProperties": false
        }));
        let errors = v.validate_structure(&json!({"b": 1, "c": 2}));
        assert_eq!(
            sorted_kinds(&errors),
            vec![
                (ErrorKind::RequiredMissing, "a".to_string()),
                (ErrorKind::AdditionalProperty, "b".to_string()),
                (ErrorKind::AdditionalProperty, "c".to_string())
            ]
        );
        assert_eq!(find(&errors, "a").schema_path.as_deref(), Some("#/required"));
        assert_eq!(find(&errors, "a").arguments, Some(json!({"property": "a"})));
        assert_eq!(find(&errors, "b").schema_path.as_deref(), Some("#/additionalProperties"));
    }

    #[test]
    fn test_type_mismatch_hides_keywords_of_the_same_object() {
        let v = validator(json!({"type": "object", "required": ["a"], "const": {"a": 1}}));
        let errors = v.validate_structure(&json!("text"));
        assert_eq!(sorted_kinds(&errors), vec![(ErrorKind::TypeMismatch, String::new())]);
        assert_eq!(errors[0].arguments, Some(json!({"expected": ["object"], "actual": "string"})));

        let v = validator(json!({"type": "object", "oneOf": [{"required": ["a"]}, {"required": ["b"]}]}));
        let errors = v.validate_structure(&json!([1]));
        assert_eq!(sorted_kinds(&errors), vec![(ErrorKind::TypeMismatch, String::new())]);
    }

    #[test]
    fn test_scalar_keywords() {
        let v = validator(json!({
            "type": "object",
            "properties": {
                "e": {"enum": ["x", "y"]},
                "c": {"const": "k"},
                "p": {"type": "string", "pattern": "^[a-z]+$"},
                "n": {"type": "integer", "minimum": 1, "maximum": 3}
            }
        }));
        let errors = v.validate_structure(&json!({"e": "z", "c": "q", "p": "ABC", "n": 0}));
        assert_eq!(
            sorted_kinds(&errors),
            vec![
                (ErrorKind::ConstantViolation, "c".to_string()),
                (ErrorKind::EnumViolation, "e".to_string()),
                (ErrorKind::ConstraintViolation, "n".to_string()),
                (ErrorKind::PatternViolation, "p".to_string())
            ]
        );
        assert_eq!(find(&errors, "n").code, "validation.constraint.minimum");
        assert_eq!(find(&errors, "e").arguments, Some(json!({"allowed": ["x", "y"], "actual": "z"})));
        assert_eq!(find(&errors, "p").schema_path.as_deref(), Some("#/properties/p/pattern"));
    }

    #[test]
    fn test_array_cardinality_and_paired_lengths() {
        let v = validator(json!({
            "type": "object",
            "properties": {
                "expressions": {"type": "array", "minItems": 2},
                "operators": {"type": "array", "maxItems": 4}
            },
            "x-lengthOf": {"operators": {"property": "expressions", "offset": -1}}
        }));
        assert!(v.validate_structure(&json!({"expressions": [1, 2], "operators": ["+"]})).is_empty());

        let errors = v.validate_structure(&json!({"expressions": [1], "operators": ["+", "-"]}));
        assert_eq!(
            sorted_kinds(&errors),
            vec![
                (ErrorKind::ArraySizeViolation, "expressions".to_string()),
                (ErrorKind::ArraySizeViolation, "operators".to_string())
            ]
        );
        let paired = find(&errors, "operators");
        assert_eq!(paired.code, "validation.array-size.paired");
        assert_eq!(paired.schema_path.as_deref(), Some("#/x-lengthOf"));
        assert!(paired.message.contains("must contain 0 item(s)"));
        assert_eq!(find(&errors, "expressions").arguments, Some(json!({"limit": 2, "actual": 1})));
    }

    #[test]
    fn test_one_of_records_branch_frames() {
        let v = validator(json!({
            "type": "object",
            "properties": {"node": {"$ref": "#/$defs/node"}},
            "$defs": {
                "node": {
                    "oneOf": [
                        {"properties": {"kind": {"const": "a"}}, "required": ["a"]},
                        {"properties": {"kind": {"const": "b"}}, "required": ["b"]}
                    ]
                }
            }
        }));

        assert!(v.validate_structure(&json!({"node": {"kind": "a", "a": 1}})).is_empty());

        let errors = v.validate_structure(&json!({"node": {"kind": "c"}}));
        let anchor = &errors[0];
        assert_eq!(anchor.kind, ErrorKind::DisjunctionViolation);
        assert_eq!(anchor.path.to_string(), "node");
        assert_eq!(anchor.schema_path.as_deref(), Some("#/properties/node/$ref/oneOf"));
        assert!(anchor.branches.is_empty());

        let members = &errors[1..];
        assert_eq!(members.len(), 4);
        for member in members {
            let frame = member.innermost_branch().unwrap();
            assert_eq!(frame.anchor.to_string(), "node");
            assert_eq!(Some(frame.schema_path.as_str()), anchor.schema_path.as_deref());
        }
        let in_first: Vec<_> = members.iter().filter(|e| e.branches[0].index == 0).collect();
        assert_eq!(in_first.len(), 2);
        assert!(in_first.iter().any(|e| e.kind == ErrorKind::RequiredMissing && e.path.to_string() == "node.a"));
        assert!(in_first.iter().any(|e| e.kind == ErrorKind::ConstantViolation && e.path.to_string() == "node.kind"));
    }

    #[test]
    fn test_nested_one_of_stacks_frames() {
        let v = validator(json!({
            "oneOf": [
                {
                    "type": "object",
                    "properties": {
                        "inner": {"oneOf": [{"type": "string"}, {"type": "integer"}]}
                    }
                },
                {"type": "string"}
            ]
        }));
        let errors = v.validate_structure(&json!({"inner": true}));

        let inner = errors
            .iter()
            .find(|e| e.is_disjunction() && e.path.to_string() == "inner")
            .unwrap();
        assert_eq!(inner.branches.len(), 1);
        assert_eq!(inner.branches[0].index, 0);

        let deepest: Vec<_> = errors.iter().filter(|e| e.branches.len() == 2).collect();
        assert_eq!(deepest.len(), 2);
        for error in deepest {
            assert_eq!(error.kind, ErrorKind::TypeMismatch);
            assert_eq!(error.branches[1].anchor.to_string(), "inner");
            assert_eq!(Some(error.branches[1].schema_path.as_str()), inner.schema_path.as_deref());
        }
    }

    #[test]
    fn test_ambiguous_one_of_reports_matches() {
        let v = validator(json!({"oneOf": [{"type": "number"}, {"type": "integer"}]}));
        let errors = v.validate_structure(&json!(3));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "validation.one-of.ambiguous");
        assert_eq!(errors[0].arguments, Some(json!({"matched": [0, 1]})));
    }

    #[test]
    fn test_other_keywords_map_by_name() {
        let v = validator(json!({
            "type": "object",
            "properties": {"n": {"type": "number", "multipleOf": 5}}
        }));
        let errors = v.validate_structure(&json!({"n": 7}));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::ConstraintViolation);
        assert_eq!(errors[0].path.to_string(), "n");
        assert_eq!(errors[0].schema_path.as_deref(), Some("#/properties/n/multipleOf"));
        assert_eq!(errors[0].arguments, Some(json!({"keyword": "multipleOf"})));
    }

    #[test]
    fn test_bundled_schema_reports_branch_members() {
        let v = StructuralValidator::new(Arc::new(RuleSchema::bundled().unwrap()));
        let errors = v.validate_structure(&json!({
            "structure": "condition",
            "definition": {"type": "INVALID_TYPE", "returnType": "boolean"}
        }));

        let root = errors.iter().find(|e| e.is_disjunction() && e.path.is_root()).unwrap();
        assert!(root.branches.is_empty());

        let nested = errors
            .iter()
            .find(|e| e.is_disjunction() && e.path.to_string() == "definition")
            .unwrap();
        assert_eq!(nested.branches.len(), 1);
        assert_eq!(nested.branches[0].index, 1);

        let discriminator = errors
            .iter()
            .find(|e| e.kind == ErrorKind::EnumViolation && e.path.to_string() == "definition.type")
            .unwrap();
        assert_eq!(discriminator.branches, nested.branches);

        let members: Vec<_> = errors.iter().filter(|e| e.branches.len() == 2).collect();
        assert!(!members.is_empty());
        assert!(members.iter().all(|e| e.branches[1].anchor.to_string() == "definition"));
    }
}
