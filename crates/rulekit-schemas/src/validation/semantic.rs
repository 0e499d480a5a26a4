//! Semantic validation over the typed rule tree
//!
//! Checks what the schema cannot express: function signatures, the rule
//! types a reference may name in its position, and return-type agreement
//! between a node and the position it fills.
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

use crate::catalog::{ArgType, ArgumentSpec, Arity, FunctionCatalog, FunctionSignature};
use crate::model::{
    lower, Argument, Case, Comparison, Condition, ConditionKind, Definition, Expression, ExpressionGroup,
    ExpressionKind, FunctionCall, RefContext, ReturnType, RuleDocument, RuleRef,
};
use crate::validation::base::ValidationStage;
use crate::validation::error::ValidationError;
use crate::validation::path::JsonPath;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

const TEXT_OPERATORS: &[&str] = &["contains", "startsWith", "endsWith"];
const ORDERING_OPERATORS: &[&str] = &["<", "<=", ">", ">="];

/// Semantic stage of the validation pipeline
#[derive(Debug, Clone)]
pub struct SemanticValidator {
    catalog: Arc<FunctionCatalog>,
    declared_rule_types: Vec<String>,
}

impl SemanticValidator {
    pub fn new(catalog: Arc<FunctionCatalog>) -> Self {
        Self {
            catalog,
            declared_rule_types: Vec::new(),
        }
    }

    /// Restrict rule-type checks to names the schema declares. An empty
    /// list checks every name.
    pub fn with_declared_rule_types(mut self, rule_types: Vec<String>) -> Self {
        self.declared_rule_types = rule_types;
        self
    }

    pub fn catalog(&self) -> &FunctionCatalog {
        &self.catalog
    }

    /// Run every semantic check. Documents that cannot be lowered yield no
    /// findings; their defects are structural.
    pub fn validate_semantics(&self, document: &Value) -> Vec<ValidationError> {
        let Some(rule) = lower(document) else {
            debug!("Semantic validation skipped: document shape is not inspectable");
            return Vec::new();
        };

        let mut checker = Checker {
            catalog: &self.catalog,
            declared_rule_types: &self.declared_rule_types,
            errors: Vec::new(),
        };
        checker.document(&rule);
        checker.errors
    }
}

impl ValidationStage for SemanticValidator {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn check(&self, document: &Value) -> Vec<ValidationError> {
        self.validate_semantics(document)
    }
}

struct Checker<'c> {
    catalog: &'c FunctionCatalog,
    declared_rule_types: &'c [String],
    errors: Vec<ValidationError>,
}

impl Checker<'_> {
    fn report(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    fn document(&mut self, rule: &RuleDocument) {
        if let (Some(declared), Some(actual)) = (rule.return_type, rule.definition.result_type()) {
            if declared != actual {
                self.report(
                    ValidationError::semantic(
                        "validation.semantic.return-type.definition",
                        JsonPath::root().key("returnType"),
                        format!("Rule declares returnType '{}' but its definition returns '{}'", declared, actual),
                    )
                    .with_arguments(json!({ "expected": declared, "actual": actual })),
                );
            }
        }

        match &rule.definition {
            Definition::Expression(expression) => self.expression(expression),
            Definition::Condition(condition) | Definition::ConditionGroup(condition) => self.condition(condition),
            Definition::Case(case) => self.case(case),
        }
    }

    /// Report when `expression` does not produce `expected`
    fn expect_type(&mut self, expression: &Expression, expected: ReturnType, code: &str, role: &str) {
        if let Some(actual) = expression.return_type.filter(|actual| *actual != expected) {
            self.report(
                ValidationError::semantic(
                    code,
                    expression.path.key("returnType"),
                    format!("{} must return '{}', found '{}'", role, expected, actual),
                )
                .with_arguments(json!({ "expected": expected, "actual": actual })),
            );
        }
    }

    fn expression(&mut self, expression: &Expression) {
        match &expression.kind {
            ExpressionKind::Value(Some(literal)) => self.literal(expression, literal),
            ExpressionKind::Function(call) => self.function(expression, call),
            ExpressionKind::RuleRef(rule_ref) => self.rule_ref(rule_ref),
            ExpressionKind::Group(group) => self.expression_group(expression, group),
            ExpressionKind::Value(None) | ExpressionKind::Field(_) | ExpressionKind::Unrecognized => {}
        }
    }

    fn literal(&mut self, expression: &Expression, literal: &Value) {
        let Some(declared) = expression.return_type else {
            return;
        };
        let matches = match declared {
            ReturnType::Boolean => literal.is_boolean(),
            ReturnType::Number => literal.is_number(),
            ReturnType::Text => literal.is_string(),
            ReturnType::Date => literal
                .as_str()
                .is_some_and(|text| NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()),
        };
        if !matches {
            let expectation = match declared {
                ReturnType::Date => "a date literal (YYYY-MM-DD)".to_string(),
                other => format!("a {} literal", other),
            };
            self.report(
                ValidationError::semantic(
                    "validation.semantic.value.literal-type",
                    expression.path.key("value"),
                    format!("Value {} is not {}", literal, expectation),
                )
                .with_arguments(json!({ "expected": declared, "actual": literal })),
            );
        }
    }

    fn function(&mut self, expression: &Expression, call: &FunctionCall) {
        for arg in &call.args {
            if let Some(value) = &arg.value {
                self.expression(value);
            }
        }

        let Some(name) = call.name.as_deref() else {
            return;
        };
        let Some(signature) = self.catalog.get(name) else {
            self.report(
                ValidationError::semantic(
                    "validation.semantic.function.unknown",
                    call.path.key("name"),
                    format!("Unknown function '{}'", name),
                )
                .with_arguments(json!({ "function": name })),
            );
            return;
        };

        if let Some(declared) = expression.return_type.filter(|declared| *declared != signature.return_type) {
            self.report(
                ValidationError::semantic(
                    "validation.semantic.function.return-type",
                    expression.path.key("returnType"),
                    format!(
                        "Function '{}' returns '{}' but the expression declares '{}'",
                        name, signature.return_type, declared
                    ),
                )
                .with_arguments(json!({ "function": name, "expected": signature.return_type, "actual": declared })),
            );
        }

        let arity_ok = self.arity(call, signature);
        match &signature.arity {
            Arity::Fixed(specs) => self.fixed_arguments(call, name, specs, arity_ok),
            Arity::Dynamic { element_type, .. } => {
                for arg in &call.args {
                    self.argument_type(name, arg, *element_type);
                }
            }
        }
    }

    fn arity(&mut self, call: &FunctionCall, signature: &FunctionSignature) -> bool {
        let count = call.args.len();
        let min = signature.required_count();
        let max = signature.max_count();
        if count >= min && max.map_or(true, |max| count <= max) {
            return true;
        }
        let expected = match max {
            Some(max) if max == min => format!("{}", min),
            Some(max) => format!("{} to {}", min, max),
            None => format!("at least {}", min),
        };
        self.report(
            ValidationError::semantic(
                "validation.semantic.function.arity",
                call.path.key("args"),
                format!(
                    "Function '{}' expects {} argument(s), found {}",
                    signature.name, expected, count
                ),
            )
            .with_arguments(json!({ "function": signature.name, "min": min, "max": max, "actual": count })),
        );
        false
    }

    /// Match supplied arguments to declared parameters in order. Optional
    /// parameters may be skipped; a name that matches an earlier parameter
    /// is out of order.
    fn fixed_arguments(&mut self, call: &FunctionCall, function: &str, specs: &[ArgumentSpec], arity_ok: bool) {
        let mut cursor = 0;
        for arg in &call.args {
            let Some(name) = arg.name.as_deref() else {
                continue;
            };
            let ahead = specs[cursor..].iter().position(|spec| spec.name == name);
            match ahead {
                Some(offset) => {
                    let position = cursor + offset;
                    if let Some(skipped) = specs[cursor..position].iter().find(|spec| !spec.optional) {
                        self.report(
                            ValidationError::semantic(
                                "validation.semantic.function.argument-order",
                                arg.path.key("name"),
                                format!(
                                    "Argument '{}' of '{}' must come after required argument '{}'",
                                    name, function, skipped.name
                                ),
                            )
                            .with_arguments(json!({ "function": function, "argument": name, "missing": skipped.name })),
                        );
                    }
                    self.argument_type(function, arg, specs[position].arg_type);
                    cursor = position + 1;
                }
                None if specs[..cursor].iter().any(|spec| spec.name == name) => {
                    let expected: Vec<&str> = specs.iter().map(|spec| spec.name.as_str()).collect();
                    self.report(
                        ValidationError::semantic(
                            "validation.semantic.function.argument-order",
                            arg.path.key("name"),
                            format!(
                                "Argument '{}' of '{}' is out of order; expected order is {}",
                                name,
                                function,
                                expected.join(", ")
                            ),
                        )
                        .with_arguments(json!({ "function": function, "argument": name, "expected": expected })),
                    );
                }
                None => {
                    let expected: Vec<&str> = specs.iter().map(|spec| spec.name.as_str()).collect();
                    self.report(
                        ValidationError::semantic(
                            "validation.semantic.function.argument-unknown",
                            arg.path.key("name"),
                            format!("Function '{}' has no argument named '{}'", function, name),
                        )
                        .with_arguments(json!({ "function": function, "argument": name, "expected": expected })),
                    );
                }
            }
        }

        if arity_ok {
            if let Some(missing) = specs[cursor.min(specs.len())..].iter().find(|spec| !spec.optional) {
                self.report(
                    ValidationError::semantic(
                        "validation.semantic.function.argument-missing",
                        call.path.key("args"),
                        format!("Function '{}' is missing required argument '{}'", function, missing.name),
                    )
                    .with_arguments(json!({ "function": function, "argument": missing.name })),
                );
            }
        }
    }

    fn argument_type(&mut self, function: &str, arg: &Argument, expected: ArgType) {
        let Some(value) = &arg.value else {
            return;
        };
        let Some(actual) = value.return_type else {
            return;
        };
        if !expected.accepts(actual) {
            let label = arg.name.as_deref().unwrap_or("?");
            self.report(
                ValidationError::semantic(
                    "validation.semantic.function.argument-type",
                    value.path.key("returnType"),
                    format!(
                        "Argument '{}' of '{}' must be '{}', found '{}'",
                        label, function, expected, actual
                    ),
                )
                .with_arguments(json!({ "function": function, "argument": label, "expected": expected, "actual": actual })),
            );
        }
    }

    fn rule_ref(&mut self, rule_ref: &RuleRef) {
        let Some(rule_type) = rule_ref.rule_type.as_deref() else {
            return;
        };
        // Names outside the schema's vocabulary are already an enum violation
        if !self.declared_rule_types.is_empty() && !self.declared_rule_types.iter().any(|t| t == rule_type) {
            return;
        }
        let tables = self.catalog.rule_types();
        let (allowed, position) = match rule_ref.context {
            RefContext::Expression => return,
            RefContext::Condition => (tables.allows_condition(rule_type), "condition"),
            RefContext::ConditionGroup => (tables.allows_condition_group(rule_type), "condition-group"),
            RefContext::ConditionNode => (
                tables.allows_condition(rule_type) || tables.allows_condition_group(rule_type),
                "nested condition",
            ),
        };
        if allowed {
            return;
        }
        let names: Vec<&str> = match rule_ref.context {
            RefContext::Condition => tables.condition.iter().map(String::as_str).collect(),
            RefContext::ConditionGroup => tables.condition_group.iter().map(String::as_str).collect(),
            _ => tables
                .condition
                .iter()
                .chain(tables.condition_group.iter())
                .map(String::as_str)
                .collect(),
        };
        self.report(
            ValidationError::semantic(
                "validation.semantic.rule-ref.rule-type",
                rule_ref.path.key("ruleType"),
                format!(
                    "Rule reference in {} context must declare ruleType {}, found '{}'",
                    position,
                    names.join(" or "),
                    rule_type
                ),
            )
            .with_arguments(json!({ "expected": names, "actual": rule_type, "context": position })),
        );
    }

    fn expression_group(&mut self, expression: &Expression, group: &ExpressionGroup) {
        for element in &group.expressions {
            self.expression(element);
        }

        let Some(group_type) = expression.return_type else {
            return;
        };
        for element in &group.expressions {
            self.expect_type(element, group_type, "validation.semantic.group.element-type", "Group element");
        }

        let allowed: &[&str] = match group_type {
            ReturnType::Number => &["+", "-", "*", "/"],
            ReturnType::Text => &["+"],
            ReturnType::Date => &["+", "-"],
            ReturnType::Boolean => &[],
        };
        for operator in &group.operators {
            if !allowed.contains(&operator.symbol.as_str()) {
                self.report(
                    ValidationError::semantic(
                        "validation.semantic.group.operator",
                        operator.path.clone(),
                        format!("Operator '{}' cannot combine {} values", operator.symbol, group_type),
                    )
                    .with_arguments(json!({ "operator": operator.symbol, "type": group_type, "allowed": allowed })),
                );
            }
        }
    }

    fn condition(&mut self, condition: &Condition) {
        match &condition.kind {
            ConditionKind::Comparison(comparison) => self.comparison(comparison),
            ConditionKind::RuleRef(rule_ref) => self.rule_ref(rule_ref),
            ConditionKind::Group(group) => {
                for nested in &group.conditions {
                    self.condition(nested);
                }
            }
            ConditionKind::Unrecognized => {}
        }
    }

    fn comparison(&mut self, comparison: &Comparison) {
        for operand in [&comparison.left, &comparison.right].into_iter().flatten() {
            self.expression(operand);
        }

        let left_type = comparison.left.as_ref().and_then(|left| left.return_type);
        if let (Some(left_type), Some(right)) = (left_type, &comparison.right) {
            self.expect_type(
                right,
                left_type,
                "validation.semantic.comparison.operand-mismatch",
                "Right operand (to match the left operand)",
            );
        }

        let (Some(operator), Some(operand_type)) = (&comparison.operator, left_type) else {
            return;
        };
        let symbol = operator.symbol.as_str();
        let requirement = if ORDERING_OPERATORS.contains(&symbol) && !operand_type.is_ordered() {
            Some("number or date")
        } else if TEXT_OPERATORS.contains(&symbol) && operand_type != ReturnType::Text {
            Some("text")
        } else {
            None
        };
        if let Some(requirement) = requirement {
            self.report(
                ValidationError::semantic(
                    "validation.semantic.comparison.operator",
                    operator.path.clone(),
                    format!(
                        "Operator '{}' requires {} operands, found '{}'",
                        symbol, requirement, operand_type
                    ),
                )
                .with_arguments(json!({ "operator": symbol, "actual": operand_type })),
            );
        }
    }

    fn case(&mut self, case: &Case) {
        for clause in &case.clauses {
            if let Some(when) = &clause.when {
                self.condition(when);
            }
            if let Some(then) = &clause.then {
                self.expression(then);
                if let Some(case_type) = case.return_type {
                    self.expect_type(then, case_type, "validation.semantic.case.result-type", "Case result");
                }
            }
        }
        if let Some(otherwise) = &case.otherwise {
            self.expression(otherwise);
            if let Some(case_type) = case.return_type {
                self.expect_type(otherwise, case_type, "validation.semantic.case.result-type", "Case result");
            }
        }
    }
}
