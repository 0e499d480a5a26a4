//! Schema extension keywords
//!
//! `x-lengthOf` pairs array properties of one object: the array at each
//! listed property must hold as many items as a sibling array plus an
//! offset, as in `{"operators": {"property": "expressions", "offset": -1}}`.
//! It is registered with the `jsonschema` compiler through
//! [`jsonschema::ValidationOptions::with_keyword`].
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

use jsonschema::paths::{LazyLocation, Location};
use jsonschema::{Keyword, ValidationError};
use serde_json::{Map, Value};

/// Name of the paired-length keyword
pub(crate) const LENGTH_OF: &str = "x-lengthOf";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pairing {
    property: String,
    sibling: String,
    offset: i64,
}

struct Mismatch<'i> {
    items: &'i Value,
    found: usize,
    expected: usize,
    sibling_len: usize,
}

impl Pairing {
    /// `None` unless both arrays are present and their lengths disagree
    fn mismatch<'i>(&self, map: &'i Map<String, Value>) -> Option<Mismatch<'i>> {
        let items = map.get(&self.property)?;
        let (Value::Array(found), Some(Value::Array(sibling))) = (items, map.get(&self.sibling)) else {
            return None;
        };
        let expected = (sibling.len() as i64 + self.offset).max(0) as usize;
        (found.len() != expected).then_some(Mismatch {
            items,
            found: found.len(),
            expected,
            sibling_len: sibling.len(),
        })
    }
}

fn parse_pairings(value: &Value) -> Result<Vec<Pairing>, String> {
    let entries = value.as_object().ok_or("expected an object")?;
    entries
        .iter()
        .map(|(property, spec)| -> Result<Pairing, String> {
            let sibling = spec
                .get("property")
                .and_then(Value::as_str)
                .ok_or_else(|| format!("'{}' needs a 'property'", property))?;
            let offset = match spec.get("offset") {
                None => 0,
                Some(offset) => offset.as_i64().ok_or("'offset' must be an integer")?,
            };
            Ok(Pairing {
                property: property.clone(),
                sibling: sibling.to_string(),
                offset,
            })
        })
        .collect()
}

/// One compiled `x-lengthOf` occurrence
struct LengthOf {
    pairings: Vec<Pairing>,
    location: Location,
}

impl Keyword for LengthOf {
    fn validate<'i>(&self, instance: &'i Value, location: &LazyLocation) -> Result<(), ValidationError<'i>> {
        let Value::Object(map) = instance else {
            return Ok(());
        };
        for pairing in &self.pairings {
            if let Some(mismatch) = pairing.mismatch(map) {
                return Err(ValidationError::custom(
                    self.location.clone(),
                    Location::from(location).join(pairing.property.as_str()),
                    mismatch.items,
                    format!(
                        "'{}' must contain {} item(s) to match the {} item(s) of '{}', found {}",
                        pairing.property, mismatch.expected, mismatch.sibling_len, pairing.sibling, mismatch.found
                    ),
                ));
            }
        }
        Ok(())
    }

    fn is_valid(&self, instance: &Value) -> bool {
        instance
            .as_object()
            .map_or(true, |map| self.pairings.iter().all(|p| p.mismatch(map).is_none()))
    }
}

/// Factory for [`LENGTH_OF`]; a malformed keyword value fails schema
/// compilation
pub(crate) fn length_of<'a>(
    _parent: &'a Map<String, Value>,
    value: &'a Value,
    location: Location,
) -> Result<Box<dyn Keyword>, ValidationError<'a>> {
    match parse_pairings(value) {
        Ok(pairings) => Ok(Box::new(LengthOf { pairings, location })),
        Err(reason) => Err(ValidationError::custom(
            location,
            Location::new(),
            value,
            format!("Invalid '{}': {}", LENGTH_OF, reason),
        )),
    }
}
