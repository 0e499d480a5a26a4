//! Reference checks run before a schema is compiled
//!
//! Only local `#/$defs/...` references are accepted. References reached
//! without passing through `properties`, `items` or `additionalProperties`
//! apply to the same instance; a loop made only of those would never
//! consume document depth and is rejected.
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

use crate::schema::error::{SchemaError, SchemaResult};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

const DEFS_PREFIX: &str = "#/$defs/";

/// Keywords whose subschemas apply to the instance itself
const IN_PLACE: &[&str] = &["allOf", "anyOf", "oneOf", "not", "if", "then", "else"];

/// Keywords holding data rather than subschemas
const DATA: &[&str] = &["const", "enum", "default", "examples", "x-lengthOf"];

pub(crate) fn check_references(schema: &Value) -> SchemaResult<()> {
    let empty = Map::new();
    let defs = match schema.get("$defs") {
        None => &empty,
        Some(Value::Object(defs)) => defs,
        Some(_) => return Err(SchemaError::invalid_keyword("$defs", "#", "expected an object")),
    };

    check_locality(schema, "#", defs)?;

    let edges: BTreeMap<&str, Vec<&str>> = defs
        .iter()
        .map(|(name, body)| {
            let mut targets = Vec::new();
            same_instance_targets(body, &mut targets);
            (name.as_str(), targets)
        })
        .collect();

    match find_cycle(&edges) {
        Some(chain) => Err(SchemaError::reference_cycle(&chain)),
        None => Ok(()),
    }
}

fn check_locality(node: &Value, location: &str, defs: &Map<String, Value>) -> SchemaResult<()> {
    match node {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref") {
                let reference = reference
                    .as_str()
                    .ok_or_else(|| SchemaError::invalid_keyword("$ref", location, "expected a string"))?;
                let name = reference
                    .strip_prefix(DEFS_PREFIX)
                    .ok_or_else(|| SchemaError::UnsupportedReference {
                        reference: reference.to_string(),
                        location: location.to_string(),
                    })?;
                if !defs.contains_key(name) {
                    return Err(SchemaError::UnknownDefinition {
                        reference: reference.to_string(),
                        location: location.to_string(),
                    });
                }
            }
            for (key, child) in map.iter().filter(|(key, _)| !DATA.contains(&key.as_str())) {
                check_locality(child, &format!("{}/{}", location, key), defs)?;
            }
            Ok(())
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(index, item)| check_locality(item, &format!("{}/{}", location, index), defs)),
        _ => Ok(()),
    }
}

fn same_instance_targets<'s>(node: &'s Value, out: &mut Vec<&'s str>) {
    let Value::Object(map) = node else {
        return;
    };
    if let Some(name) = map.get("$ref").and_then(Value::as_str).and_then(|r| r.strip_prefix(DEFS_PREFIX)) {
        out.push(name);
    }
    for keyword in IN_PLACE {
        match map.get(*keyword) {
            Some(Value::Array(branches)) => branches.iter().for_each(|b| same_instance_targets(b, out)),
            Some(branch) => same_instance_targets(branch, out),
            None => {}
        }
    }
}

/// Depth-first search; returns the looping chain of definitions
fn find_cycle<'s>(edges: &BTreeMap<&'s str, Vec<&'s str>>) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }

    fn visit<'n>(
        name: &'n str,
        edges: &BTreeMap<&'n str, Vec<&'n str>>,
        marks: &mut HashMap<&'n str, Mark>,
        stack: &mut Vec<&'n str>,
    ) -> Option<Vec<String>> {
        match marks.get(name) {
            Some(Mark::Done) => return None,
            Some(Mark::InProgress) => {
                let start = stack.iter().position(|n| *n == name).unwrap_or(0);
                let mut chain: Vec<String> = stack[start..]
                    .iter()
                    .map(|n| format!("{}{}", DEFS_PREFIX, n))
                    .collect();
                chain.push(format!("{}{}", DEFS_PREFIX, name));
                return Some(chain);
            }
            None => {}
        }
        marks.insert(name, Mark::InProgress);
        stack.push(name);
        for next in edges.get(name).into_iter().flatten() {
            if let Some(chain) = visit(*next, edges, marks, stack) {
                return Some(chain);
            }
        }
        stack.pop();
        marks.insert(name, Mark::Done);
        None
    }

    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    edges
        .keys()
        .find_map(|name| visit(*name, edges, &mut marks, &mut stack))
}
