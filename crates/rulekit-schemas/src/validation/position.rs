//! Map document paths back to source lines
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

use crate::validation::path::{JsonPath, PathSegment};

/// Line-start table over JSON source text, built once per validation
#[derive(Debug, Clone)]
pub struct LineIndex<'s> {
    source: &'s str,
    line_starts: Vec<usize>,
}

impl<'s> LineIndex<'s> {
    pub fn new(source: &'s str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(offset, _)| offset + 1))
            .collect();
        Self { source, line_starts }
    }

    pub fn source(&self) -> &'s str {
        self.source
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 1-based line containing the byte `offset`
    pub fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|start| *start <= offset)
    }

    /// 1-based line where the node at `path` begins.
    ///
    /// For an object member that is the line of its key, for an array
    /// element the line of the element itself. Returns `None` when the path
    /// does not exist in the text or the text is not well-formed enough to
    /// walk.
    pub fn locate(&self, path: &JsonPath) -> Option<usize> {
        let bytes = self.source.as_bytes();
        let mut scanner = Scanner { bytes, pos: 0 };
        scanner.skip_ws();
        let mut anchor = scanner.pos;

        for segment in path.segments() {
            match segment {
                PathSegment::Key(key) => {
                    let (key_start, value_start) = scanner.find_key(key)?;
                    anchor = key_start;
                    scanner.pos = value_start;
                }
                PathSegment::Index(index) => {
                    let value_start = scanner.find_index(*index)?;
                    anchor = value_start;
                    scanner.pos = value_start;
                }
            }
        }

        if anchor >= bytes.len() {
            return None;
        }
        Some(self.line_of(anchor))
    }
}

/// Locate `path` in `source` without keeping the index around
pub fn locate(source: &str, path: &JsonPath) -> Option<usize> {
    LineIndex::new(source).locate(path)
}

struct Scanner<'b> {
    bytes: &'b [u8],
    pos: usize,
}

impl Scanner<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Option<()> {
        self.skip_ws();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    /// Skip a string starting at the opening quote; returns its raw span
    /// including the quotes
    fn skip_string(&mut self) -> Option<(usize, usize)> {
        let start = self.pos;
        if self.peek() != Some(b'"') {
            return None;
        }
        self.pos += 1;
        while let Some(byte) = self.peek() {
            self.pos += 1;
            match byte {
                b'\\' => self.pos += 1,
                b'"' => return Some((start, self.pos)),
                _ => {}
            }
        }
        None
    }

    fn skip_value(&mut self) -> Option<()> {
        self.skip_ws();
        match self.peek()? {
            b'"' => self.skip_string().map(|_| ()),
            b'{' | b'[' => {
                let mut depth = 0usize;
                loop {
                    match self.peek()? {
                        b'"' => {
                            self.skip_string()?;
                            continue;
                        }
                        b'{' | b'[' => depth += 1,
                        b'}' | b']' => {
                            depth -= 1;
                            if depth == 0 {
                                self.pos += 1;
                                return Some(());
                            }
                        }
                        _ => {}
                    }
                    self.pos += 1;
                }
            }
            _ => {
                while let Some(byte) = self.peek() {
                    if matches!(byte, b',' | b'}' | b']' | b' ' | b'\t' | b'\n' | b'\r') {
                        break;
                    }
                    self.pos += 1;
                }
                Some(())
            }
        }
    }

    /// With the cursor on an object, find the last member named `key` and
    /// return the offsets of its key and of its value
    fn find_key(&mut self, key: &str) -> Option<(usize, usize)> {
        self.expect(b'{')?;
        let mut found = None;
        loop {
            self.skip_ws();
            match self.peek()? {
                b'}' => return found,
                b',' => {
                    self.pos += 1;
                    continue;
                }
                b'"' => {}
                _ => return found,
            }
            let (start, end) = self.skip_string()?;
            let raw = std::str::from_utf8(&self.bytes[start..end]).ok()?;
            let name: Option<String> = serde_json::from_str(raw).ok();
            self.expect(b':')?;
            self.skip_ws();
            let value_start = self.pos;
            if name.as_deref() == Some(key) {
                found = Some((start, value_start));
            }
            self.skip_value()?;
        }
    }

    /// With the cursor on an array, return the offset of element `index`
    fn find_index(&mut self, index: usize) -> Option<usize> {
        self.expect(b'[')?;
        let mut current = 0;
        loop {
            self.skip_ws();
            match self.peek()? {
                b']' => return None,
                b',' => {
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }
            if current == index {
                return Some(self.pos);
            }
            self.skip_value()?;
            current += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(text: &str) -> JsonPath {
        text.parse().unwrap()
    }

    const PRETTY: &str = r#"{
  "structure": "expression",
  "definition": {
    "type": "group",

    "returnType": "number",
    "expressions": [
      {"type": "field", "returnType": "number", "field": "a"},
      {
        "type": "value",
        "returnType": "number",
        "value": 2
      }
    ],
    "operators": ["+"]
  }
}"#;

    #[test]
    fn test_pretty_document_lines() {
        let index = LineIndex::new(PRETTY);
        assert_eq!(index.locate(&JsonPath::root()), Some(1));
        assert_eq!(index.locate(&path("structure")), Some(2));
        assert_eq!(index.locate(&path("definition.returnType")), Some(6));
        assert_eq!(index.locate(&path("definition.expressions[0]")), Some(8));
        assert_eq!(index.locate(&path("definition.expressions[0].field")), Some(8));
        assert_eq!(index.locate(&path("definition.expressions[1]")), Some(9));
        assert_eq!(index.locate(&path("definition.expressions[1].value")), Some(12));
        assert_eq!(index.locate(&path("definition.operators[0]")), Some(15));
    }

    #[test]
    fn test_minified_document_is_line_one() {
        let text = serde_json::to_string(&serde_json::from_str::<serde_json::Value>(PRETTY).unwrap()).unwrap();
        assert_eq!(locate(&text, &path("definition.expressions[1].value")), Some(1));
    }

    #[test]
    fn test_unlocatable_paths() {
        let index = LineIndex::new(PRETTY);
        assert_eq!(index.locate(&path("definition.missing")), None);
        assert_eq!(index.locate(&path("definition.expressions[5]")), None);
        assert_eq!(index.locate(&path("structure.nested")), None);
        assert_eq!(locate("", &JsonPath::root()), None);
    }

    #[test]
    fn test_strings_with_structural_characters() {
        let text = "{\"a\": \"}{[\\\"]\",\n \"b\": 1}";
        assert_eq!(locate(text, &path("b")), Some(2));
    }

    #[test]
    fn test_escaped_and_duplicate_keys() {
        let text = "{\"a\\u0062\": 1,\n\"ab\": 2}";
        assert_eq!(locate(text, &path("ab")), Some(2));
        assert_eq!(locate("{\"k\": 1,\n\n\"k\": 2}", &path("k")), Some(3));
    }
}
