//! Document paths in dotted form with JSON pointer conversion
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A single step into a document: an object key or an array index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a node inside a rule document.
///
/// Rendered as `definition.expressions[1].type`; the root is the empty path.
/// Keys that are not plain identifiers render in bracket form (`['a.b']`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonPath {
    segments: Vec<PathSegment>,
}

/// Failure to parse a dotted path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid path '{input}' at offset {offset}: {reason}")]
pub struct PathParseError {
    pub input: String,
    pub offset: usize,
    pub reason: &'static str,
}

impl JsonPath {
    /// The document root
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Child path for an object key
    pub fn key<K: Into<String>>(&self, key: K) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(key.into()));
        Self { segments }
    }

    /// Child path for an array element
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// True when `self` equals `prefix` or lies below it
    pub fn starts_with(&self, prefix: &JsonPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// True when `self` is an immediate child of `parent`
    pub fn is_child_of(&self, parent: &JsonPath) -> bool {
        self.segments.len() == parent.segments.len() + 1 && self.starts_with(parent)
    }

    /// RFC 6901 rendering (`/definition/expressions/1`)
    pub fn to_pointer(&self) -> String {
        let mut pointer = String::new();
        for segment in &self.segments {
            pointer.push('/');
            match segment {
                PathSegment::Key(key) => pointer.push_str(&key.replace('~', "~0").replace('/', "~1")),
                PathSegment::Index(index) => pointer.push_str(&index.to_string()),
            }
        }
        pointer
    }

    /// Build a path from a JSON pointer.
    ///
    /// Pointer tokens are untyped, so `document` decides whether a numeric
    /// token addresses an array element or an object key. Tokens below a
    /// node missing from the document default to keys unless numeric.
    pub fn from_pointer(pointer: &str, document: &Value) -> Self {
        let mut path = Self::root();
        let mut current = Some(document);
        for raw in pointer.split('/').skip(1) {
            let token = raw.replace("~1", "/").replace("~0", "~");
            let as_index = token.parse::<usize>().ok();
            match (current, as_index) {
                (Some(Value::Array(items)), Some(index)) => {
                    current = items.get(index);
                    path = path.index(index);
                }
                (Some(Value::Object(map)), _) => {
                    current = map.get(&token);
                    path = path.key(token);
                }
                (None, Some(index)) => {
                    path = path.index(index);
                }
                _ => {
                    current = None;
                    path = path.key(token);
                }
            }
        }
        path
    }

    /// Resolve this path against a document
    pub fn resolve<'v>(&self, document: &'v Value) -> Option<&'v Value> {
        self.segments.iter().try_fold(document, |node, segment| match segment {
            PathSegment::Key(key) => node.get(key.as_str()),
            PathSegment::Index(index) => node.get(*index),
        })
    }
}

fn is_plain_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if is_plain_key(key) => {
                    if position > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                PathSegment::Key(key) => {
                    let escaped = key.replace('\\', "\\\\").replace('\'', "\\'");
                    write!(f, "['{}']", escaped)?;
                }
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl FromStr for JsonPath {
    type Err = PathParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fail = |offset: usize, reason: &'static str| PathParseError {
            input: input.to_string(),
            offset,
            reason,
        };

        let chars: Vec<char> = input.chars().collect();
        let mut segments = Vec::new();
        let mut pos = 0;

        while pos < chars.len() {
            match chars[pos] {
                '[' => {
                    pos += 1;
                    if chars.get(pos) == Some(&'\'') {
                        pos += 1;
                        let mut key = String::new();
                        loop {
                            match chars.get(pos) {
                                Some('\\') => {
                                    let escaped = chars.get(pos + 1).ok_or_else(|| fail(pos, "dangling escape"))?;
                                    key.push(*escaped);
                                    pos += 2;
                                }
                                Some('\'') => {
                                    pos += 1;
                                    break;
                                }
                                Some(c) => {
                                    key.push(*c);
                                    pos += 1;
                                }
                                None => return Err(fail(pos, "unterminated quoted key")),
                            }
                        }
                        segments.push(PathSegment::Key(key));
                    } else {
                        let start = pos;
                        while chars.get(pos).is_some_and(|c| c.is_ascii_digit()) {
                            pos += 1;
                        }
                        if start == pos {
                            return Err(fail(pos, "expected array index"));
                        }
                        let digits: String = chars[start..pos].iter().collect();
                        let index = digits.parse().map_err(|_| fail(start, "array index out of range"))?;
                        segments.push(PathSegment::Index(index));
                    }
                    if chars.get(pos) != Some(&']') {
                        return Err(fail(pos, "expected ']'"));
                    }
                    pos += 1;
                }
                '.' if segments.is_empty() => return Err(fail(pos, "path cannot start with '.'")),
                c => {
                    if c == '.' {
                        pos += 1;
                    } else if !segments.is_empty() {
                        return Err(fail(pos, "expected '.' or '['"));
                    }
                    let start = pos;
                    while chars.get(pos).is_some_and(|c| *c != '.' && *c != '[') {
                        pos += 1;
                    }
                    if start == pos {
                        return Err(fail(pos, "empty key"));
                    }
                    segments.push(PathSegment::Key(chars[start..pos].iter().collect()));
                }
            }
        }

        Ok(Self { segments })
    }
}

impl Serialize for JsonPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JsonPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_dotted_form() {
        let path = JsonPath::root().key("definition").key("expressions").index(1).key("type");
        assert_eq!(path.to_string(), "definition.expressions[1].type");
        assert_eq!(JsonPath::root().to_string(), "");
        assert_eq!(JsonPath::root().key("a.b").key("c").to_string(), "['a.b'].c");
    }

    #[test]
    fn test_parse_dotted_form() {
        let path: JsonPath = "definition.clauses[0].when".parse().unwrap();
        assert_eq!(
            path,
            JsonPath::root().key("definition").key("clauses").index(0).key("when")
        );
        let quoted: JsonPath = "['it\\'s'][2]".parse().unwrap();
        assert_eq!(quoted, JsonPath::root().key("it's").index(2));
        assert_eq!("".parse::<JsonPath>().unwrap(), JsonPath::root());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(".a".parse::<JsonPath>().is_err());
        assert!("a[".parse::<JsonPath>().is_err());
        assert!("a[x]".parse::<JsonPath>().is_err());
        assert!("a..b".parse::<JsonPath>().is_err());
    }

    #[test]
    fn test_pointer_conversion_uses_document_shape() {
        let doc = json!({"definition": {"expressions": [{"type": "value"}], "0": {"x": 1}}});
        let path = JsonPath::from_pointer("/definition/expressions/0/type", &doc);
        assert_eq!(path.to_string(), "definition.expressions[0].type");

        let keyed = JsonPath::from_pointer("/definition/0/x", &doc);
        assert_eq!(keyed, JsonPath::root().key("definition").key("0").key("x"));
        assert_eq!(keyed.to_pointer(), "/definition/0/x");
        assert_eq!(JsonPath::from_pointer("/a~1b", &json!({})).to_pointer(), "/a~1b");
    }

    #[test]
    fn test_relations() {
        let parent = JsonPath::root().key("definition");
        let child = parent.key("type");
        assert!(child.starts_with(&parent));
        assert!(child.is_child_of(&parent));
        assert!(!child.key("x").is_child_of(&parent));
        assert_eq!(child.parent(), Some(parent.clone()));
        assert_eq!(JsonPath::root().parent(), None);
    }

    #[test]
    fn test_resolve() {
        let doc = json!({"definition": {"args": [{"name": "value"}]}});
        let path: JsonPath = "definition.args[0].name".parse().unwrap();
        assert_eq!(path.resolve(&doc), Some(&json!("value")));
        assert_eq!(JsonPath::root().key("missing").resolve(&doc), None);
    }

    #[test]
    fn test_serde_as_string() {
        let path: JsonPath = "definition.value".parse().unwrap();
        assert_eq!(serde_json::to_value(&path).unwrap(), json!("definition.value"));
        let back: JsonPath = serde_json::from_value(json!("definition.value")).unwrap();
        assert_eq!(back, path);
    }
}
