//! Typed view of a rule document
//!
//! Semantic validation works on this tree rather than on raw JSON. Lowering
//! is tolerant: fields that are missing or malformed become `None` and
//! nodes with an unknown discriminator become `Unrecognized`, because the
//! structural validator already reports those defects.
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

use crate::validation::path::JsonPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Declared result type of an expression or condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    Boolean,
    Number,
    Text,
    Date,
}

impl ReturnType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(ReturnType::Boolean),
            "number" => Some(ReturnType::Number),
            "text" => Some(ReturnType::Text),
            "date" => Some(ReturnType::Date),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnType::Boolean => "boolean",
            ReturnType::Number => "number",
            ReturnType::Text => "text",
            ReturnType::Date => "date",
        }
    }

    /// Supports `<`, `<=`, `>` and `>=`
    pub fn is_ordered(&self) -> bool {
        matches!(self, ReturnType::Number | ReturnType::Date)
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of the top-level `structure` discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Structure {
    Expression,
    Condition,
    ConditionGroup,
    Case,
}

impl Structure {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "expression" => Some(Structure::Expression),
            "condition" => Some(Structure::Condition),
            "conditionGroup" => Some(Structure::ConditionGroup),
            "case" => Some(Structure::Case),
            _ => None,
        }
    }
}

/// Position a rule reference appears in; decides which rule types it may name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefContext {
    /// The definition of a `condition` rule
    Condition,
    /// The definition of a `conditionGroup` rule
    ConditionGroup,
    /// A condition nested in a group or a case clause
    ConditionNode,
    /// An operand or argument
    Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleDocument {
    pub return_type: Option<ReturnType>,
    pub definition: Definition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Expression(Expression),
    Condition(Condition),
    ConditionGroup(Condition),
    Case(Case),
}

impl Definition {
    /// Type the definition evaluates to, when known
    pub fn result_type(&self) -> Option<ReturnType> {
        match self {
            Definition::Expression(expression) => expression.return_type,
            Definition::Condition(_) | Definition::ConditionGroup(_) => Some(ReturnType::Boolean),
            Definition::Case(case) => case.return_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub path: JsonPath,
    pub return_type: Option<ReturnType>,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Value(Option<Value>),
    Field(Option<String>),
    Function(FunctionCall),
    RuleRef(RuleRef),
    Group(ExpressionGroup),
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// Path of the `function` object
    pub path: JsonPath,
    pub name: Option<String>,
    pub args: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub path: JsonPath,
    pub name: Option<String>,
    pub value: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleRef {
    /// Path of the `ruleRef` object
    pub path: JsonPath,
    pub rule_type: Option<String>,
    pub context: RefContext,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionGroup {
    pub expressions: Vec<Expression>,
    pub operators: Vec<Operator>,
}

/// An operator token and where it sits
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    pub path: JsonPath,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub path: JsonPath,
    pub kind: ConditionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionKind {
    Comparison(Comparison),
    RuleRef(RuleRef),
    Group(ConditionGroup),
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub left: Option<Expression>,
    pub operator: Option<Operator>,
    pub right: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionGroup {
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub path: JsonPath,
    pub return_type: Option<ReturnType>,
    pub clauses: Vec<WhenClause>,
    pub otherwise: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhenClause {
    pub when: Option<Condition>,
    pub then: Option<Expression>,
}

/// Lower a parsed document into the typed tree.
///
/// Returns `None` when the document cannot be inspected safely: the root
/// is not an object, `structure` is missing or unknown, or `definition` is
/// not an object.
pub fn lower(document: &Value) -> Option<RuleDocument> {
    let root = document.as_object()?;
    let structure = Structure::parse(root.get("structure")?.as_str()?)?;
    let definition_value = root.get("definition")?;
    definition_value.as_object()?;

    let path = JsonPath::root().key("definition");
    let definition = match structure {
        Structure::Expression => Definition::Expression(lower_expression(definition_value, path)?),
        Structure::Condition => Definition::Condition(lower_condition(definition_value, path, RefContext::Condition)?),
        Structure::ConditionGroup => {
            Definition::ConditionGroup(lower_condition(definition_value, path, RefContext::ConditionGroup)?)
        }
        Structure::Case => Definition::Case(lower_case(definition_value, path)?),
    };

    Some(RuleDocument {
        return_type: return_type_of(root),
        definition,
    })
}

fn return_type_of(map: &Map<String, Value>) -> Option<ReturnType> {
    map.get("returnType").and_then(Value::as_str).and_then(ReturnType::parse)
}

fn string_of(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn lower_expression(value: &Value, path: JsonPath) -> Option<Expression> {
    let map = value.as_object()?;
    let kind = match map.get("type").and_then(Value::as_str) {
        Some("value") => ExpressionKind::Value(map.get("value").cloned()),
        Some("field") => ExpressionKind::Field(string_of(map, "field")),
        Some("function") => match map.get("function").and_then(Value::as_object) {
            Some(function) => ExpressionKind::Function(lower_function(function, path.key("function"))),
            None => ExpressionKind::Unrecognized,
        },
        Some("ruleRef") => match lower_rule_ref(map, &path, RefContext::Expression) {
            Some(rule_ref) => ExpressionKind::RuleRef(rule_ref),
            None => ExpressionKind::Unrecognized,
        },
        Some("group") => ExpressionKind::Group(lower_expression_group(map, &path)),
        _ => ExpressionKind::Unrecognized,
    };
    Some(Expression {
        return_type: return_type_of(map),
        path,
        kind,
    })
}

fn lower_function(function: &Map<String, Value>, path: JsonPath) -> FunctionCall {
    let args_path = path.key("args");
    let args = function
        .get("args")
        .and_then(Value::as_array)
        .map(|args| {
            args.iter()
                .enumerate()
                .map(|(index, arg)| {
                    let arg_path = args_path.index(index);
                    let arg = arg.as_object();
                    Argument {
                        name: arg.and_then(|a| string_of(a, "name")),
                        value: arg
                            .and_then(|a| a.get("value"))
                            .and_then(|v| lower_expression(v, arg_path.key("value"))),
                        path: arg_path,
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    FunctionCall {
        name: string_of(function, "name"),
        args,
        path,
    }
}

fn lower_rule_ref(node: &Map<String, Value>, path: &JsonPath, context: RefContext) -> Option<RuleRef> {
    let reference = node.get("ruleRef")?.as_object()?;
    Some(RuleRef {
        path: path.key("ruleRef"),
        rule_type: string_of(reference, "ruleType"),
        context,
    })
}

fn lower_expression_group(map: &Map<String, Value>, path: &JsonPath) -> ExpressionGroup {
    let expressions_path = path.key("expressions");
    let expressions = map
        .get("expressions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| lower_expression(item, expressions_path.index(index)))
                .collect()
        })
        .unwrap_or_default();

    let operators_path = path.key("operators");
    let operators = map
        .get("operators")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| {
                    item.as_str().map(|symbol| Operator {
                        path: operators_path.index(index),
                        symbol: symbol.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    ExpressionGroup {
        expressions,
        operators,
    }
}

/// Lower a condition-like node. Which discriminators are recognized
/// depends on where the node sits.
fn lower_condition(value: &Value, path: JsonPath, context: RefContext) -> Option<Condition> {
    let map = value.as_object()?;
    let discriminator = map.get("type").and_then(Value::as_str);
    let kind = match (discriminator, context) {
        (Some("comparison"), RefContext::Condition | RefContext::ConditionNode) => {
            ConditionKind::Comparison(Comparison {
                left: map.get("left").and_then(|v| lower_expression(v, path.key("left"))),
                operator: map.get("operator").and_then(Value::as_str).map(|symbol| Operator {
                    path: path.key("operator"),
                    symbol: symbol.to_string(),
                }),
                right: map.get("right").and_then(|v| lower_expression(v, path.key("right"))),
            })
        }
        (Some("group"), RefContext::ConditionGroup | RefContext::ConditionNode) => {
            ConditionKind::Group(lower_condition_group(map, &path))
        }
        (Some("ruleRef"), _) => match lower_rule_ref(map, &path, context) {
            Some(rule_ref) => ConditionKind::RuleRef(rule_ref),
            None => ConditionKind::Unrecognized,
        },
        _ => ConditionKind::Unrecognized,
    };
    Some(Condition { path, kind })
}

fn lower_condition_group(map: &Map<String, Value>, path: &JsonPath) -> ConditionGroup {
    let conditions_path = path.key("conditions");
    let conditions = map
        .get("conditions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| {
                    lower_condition(item, conditions_path.index(index), RefContext::ConditionNode)
                })
                .collect()
        })
        .unwrap_or_default();

    ConditionGroup { conditions }
}

fn lower_case(value: &Value, path: JsonPath) -> Option<Case> {
    let map = value.as_object()?;
    let clauses_path = path.key("clauses");
    let clauses = map
        .get("clauses")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| {
                    let clause = item.as_object()?;
                    let clause_path = clauses_path.index(index);
                    Some(WhenClause {
                        when: clause
                            .get("when")
                            .and_then(|v| lower_condition(v, clause_path.key("when"), RefContext::ConditionNode)),
                        then: clause.get("then").and_then(|v| lower_expression(v, clause_path.key("then"))),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Some(Case {
        return_type: return_type_of(map),
        otherwise: map.get("else").and_then(|v| lower_expression(v, path.key("else"))),
        clauses,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blocking_failures_skip_lowering() {
        assert!(lower(&json!([1, 2])).is_none());
        assert!(lower(&json!({"definition": {}})).is_none());
        assert!(lower(&json!({"structure": "bogus", "definition": {}})).is_none());
        assert!(lower(&json!({"structure": "expression", "definition": "x"})).is_none());
    }

    #[test]
    fn test_lowers_function_expression() {
        let doc = lower(&json!({
            "structure": "expression",
            "returnType": "number",
            "definition": {
                "type": "function",
                "returnType": "number",
                "function": {
                    "name": "round",
                    "args": [
                        {"name": "value", "value": {"type": "field", "returnType": "number", "field": "order.total"}}
                    ]
                }
            }
        }))
        .unwrap();

        assert_eq!(doc.return_type, Some(ReturnType::Number));
        let Definition::Expression(expression) = &doc.definition else {
            panic!("expected an expression");
        };
        let ExpressionKind::Function(call) = &expression.kind else {
            panic!("expected a function call");
        };
        assert_eq!(call.name.as_deref(), Some("round"));
        assert_eq!(call.args[0].path.to_string(), "definition.function.args[0]");
        let value = call.args[0].value.as_ref().unwrap();
        assert_eq!(value.path.to_string(), "definition.function.args[0].value");
        assert_eq!(value.kind, ExpressionKind::Field(Some("order.total".to_string())));
    }

    #[test]
    fn test_rule_ref_context_follows_position() {
        let doc = lower(&json!({
            "structure": "conditionGroup",
            "definition": {
                "type": "group",
                "conjunction": "and",
                "conditions": [
                    {"type": "ruleRef", "returnType": "boolean", "ruleRef": {"id": "a", "version": 1, "ruleType": "Condition"}}
                ]
            }
        }))
        .unwrap();

        let Definition::ConditionGroup(condition) = &doc.definition else {
            panic!("expected a condition group");
        };
        let ConditionKind::Group(group) = &condition.kind else {
            panic!("expected an inline group");
        };
        let ConditionKind::RuleRef(rule_ref) = &group.conditions[0].kind else {
            panic!("expected a rule reference");
        };
        assert_eq!(rule_ref.context, RefContext::ConditionNode);
        assert_eq!(rule_ref.path.to_string(), "definition.conditions[0].ruleRef");
    }

    #[test]
    fn test_unknown_discriminators_are_unrecognized() {
        let doc = lower(&json!({
            "structure": "condition",
            "definition": {"type": "group", "conjunction": "and", "conditions": []}
        }))
        .unwrap();
        let Definition::Condition(condition) = &doc.definition else {
            panic!("expected a condition");
        };
        assert_eq!(condition.kind, ConditionKind::Unrecognized);
        assert_eq!(doc.definition.result_type(), Some(ReturnType::Boolean));
    }
}
