//! Streaming parsing for edit scripts
//!
//! An edit script is a stream of objects, one per property write:
//!
//! ```text
//! {"target": "trace", "index": 0, "path": "marker.color", "value": "yellow"}
//! {"target": "layout", "path": "xaxis.range", "value": [10, 20]}
//! ```
//!
//! Supports both single-line JSONL and multi-line JSON5 (comments, trailing
//! commas, unquoted keys). Each object is tried as strict JSON first so that
//! integer values keep their integer type, then as JSON5.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Read;
use thiserror::Error;

use crate::models::{NodeKind, NodeRef};

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

/// A warning message from parsing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Warning {
    pub message: String,
    pub line: usize,
}

/// One property write from an edit script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditCommand {
    /// Which collection the node is in
    pub target: NodeKind,
    /// Trace or frame index (ignored for layout)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Property path, e.g. `marker.color`
    pub path: String,
    /// New value (`null` unsets)
    #[serde(default)]
    pub value: Value,
    /// Line where the object started
    #[serde(skip)]
    pub line: usize,
}

impl EditCommand {
    /// Resolve target and index into a node address.
    pub fn node(&self) -> Result<NodeRef, ParseError> {
        match (self.target, self.index) {
            (NodeKind::Layout, _) => Ok(NodeRef::Layout),
            (NodeKind::Trace, Some(i)) => Ok(NodeRef::Trace(i)),
            (NodeKind::Frame, Some(i)) => Ok(NodeRef::Frame(i)),
            (kind, None) => Err(ParseError {
                message: format!("{} edit requires an \"index\"", kind),
                line: self.line,
            }),
        }
    }
}

/// Result of parsing an edit script.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub edits: Vec<EditCommand>,
    pub warnings: Vec<Warning>,
}

fn parse_object(text: &str, line: usize) -> Result<EditCommand, ParseError> {
    let mut edit = match serde_json::from_str::<EditCommand>(text) {
        Ok(edit) => edit,
        Err(_) => json5::from_str::<EditCommand>(text)
            .map_err(|e| ParseError { message: e.to_string(), line })?,
    };
    edit.line = line;
    Ok(edit)
}

/// Parse a single edit object.
pub fn parse_line(line: &str, line_number: usize) -> Result<EditCommand, ParseError> {
    parse_object(line, line_number)
}

/// Parse a stream of edit objects.
///
/// Objects may span multiple lines; an object ends when its braces and
/// brackets balance. Parsing stops at the first malformed object, since the
/// next object boundary cannot be found reliably after it, and the error is
/// reported as a warning. A line that cannot be read (I/O error, invalid
/// UTF-8) also ends parsing with a warning for that line.
pub fn parse_stream<R: Read>(reader: R) -> ParseResult {
    use std::io::BufRead;

    let mut result = ParseResult::default();
    let buf_reader = std::io::BufReader::new(reader);
    let lines = buf_reader.lines();

    let mut accumulator = String::new();
    let mut start_line = 1;
    let mut current_line = 1;
    let mut brace_depth = 0;
    let mut bracket_depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for line in lines {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                let message = format!("cannot read line: {}", e);
                result.warnings.push(Warning { message, line: current_line });
                return result;
            }
        };

        if accumulator.is_empty() && line.trim().is_empty() {
            current_line += 1;
            start_line = current_line;
            continue;
        }

        if !accumulator.is_empty() {
            accumulator.push('\n');
        }
        accumulator.push_str(&line);

        for ch in line.chars() {
            if escape_next {
                escape_next = false;
                continue;
            }

            match ch {
                '\\' if in_string => escape_next = true,
                '"' => in_string = !in_string,
                '{' if !in_string => brace_depth += 1,
                '}' if !in_string => brace_depth -= 1,
                '[' if !in_string => bracket_depth += 1,
                ']' if !in_string => bracket_depth -= 1,
                _ => {}
            }
        }

        if brace_depth == 0 && bracket_depth == 0 && !accumulator.trim().is_empty() {
            match parse_object(&accumulator, start_line) {
                Ok(edit) => result.edits.push(edit),
                Err(e) => {
                    result.warnings.push(Warning { message: e.message, line: e.line });
                    return result;
                }
            }

            accumulator.clear();
            start_line = current_line + 1;
            in_string = false;
            escape_next = false;
        }

        current_line += 1;
    }

    if !accumulator.trim().is_empty() {
        match parse_object(&accumulator, start_line) {
            Ok(edit) => result.edits.push(edit),
            Err(e) => result.warnings.push(Warning { message: e.message, line: e.line }),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use std::io::Cursor;

    #[test]
    fn test_parse_line_trace_edit() {
        let line = r#"{"target": "trace", "index": 0, "path": "marker.color", "value": "yellow"}"#;
        let edit = parse_line(line, 1).unwrap();
        assert_eq!(edit.target, NodeKind::Trace);
        assert_eq!(edit.node(), Ok(NodeRef::Trace(0)));
        assert_eq!(edit.path, "marker.color");
        assert_eq!(edit.value, json!("yellow"));
    }

    #[test]
    fn test_parse_line_keeps_integers() {
        let line = r#"{"target": "layout", "path": "xaxis.range", "value": [10, 20]}"#;
        let edit = parse_line(line, 1).unwrap();
        assert_eq!(edit.node(), Ok(NodeRef::Layout));
        assert_eq!(edit.value, json!([10, 20]));
    }

    #[test]
    fn test_parse_line_invalid_json() {
        let result = parse_line("{not valid json", 5);
        assert_eq!(result.unwrap_err().line, 5);
    }

    #[test]
    fn test_parse_line_unknown_target() {
        let line = r#"{"target": "axis", "path": "range", "value": 1}"#;
        assert!(parse_line(line, 1).is_err());
    }

    #[test]
    fn test_missing_index() {
        let line = r#"{"target": "frame", "path": "name", "value": "f2"}"#;
        let edit = parse_line(line, 3).unwrap();
        let err = edit.node().unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("index"));
    }

    #[test]
    fn test_parse_stream_simple() {
        let input = r#"{"target": "trace", "index": 0, "path": "marker.color", "value": "yellow"}
{"target": "trace", "index": 1, "path": "marker.opacity", "value": 0.9}

{"target": "layout", "path": "xaxis.range", "value": [10, 20]}"#;
        let result = parse_stream(Cursor::new(input));
        assert_eq!(result.edits.len(), 3);
        assert!(result.warnings.is_empty());
        assert_eq!(result.edits[2].line, 4);
    }

    #[test]
    fn test_parse_stream_stops_at_error() {
        let input = r#"{"target": "layout", "path": "width", "value": 400}
{invalid json}
{"target": "layout", "path": "height", "value": 300}"#;
        let result = parse_stream(Cursor::new(input));
        assert_eq!(result.edits.len(), 1);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].line, 2);
    }

    #[test]
    fn test_parse_stream_reports_unreadable_line() {
        let mut bytes = br#"{"target": "layout", "path": "width", "value": 400}"#.to_vec();
        bytes.extend_from_slice(b"\n");
        bytes.extend_from_slice(br#"{"target": "layout", "path": "title.text", "value": ""#);
        bytes.extend_from_slice(b"\xff\"}\n");
        bytes.extend_from_slice(br#"{"target": "layout", "path": "height", "value": 300}"#);

        let result = parse_stream(Cursor::new(bytes));
        assert_eq!(result.edits.len(), 1);
        assert_eq!(result.edits[0].path, "width");
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].line, 2);
        assert!(result.warnings[0].message.starts_with("cannot read line"));
    }

    #[test]
    fn test_parse_stream_multiline_json5() {
        let input = r#"{
  // retitle the first frame
  target: "frame",
  index: 0,
  path: "layout.yaxis.title.text",
  value: "f2",
}
{"target": "layout", "path": "title.text", "value": "with } brace"}"#;
        let result = parse_stream(Cursor::new(input));
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(result.edits.len(), 2);
        assert_eq!(result.edits[0].node(), Ok(NodeRef::Frame(0)));
        assert_eq!(result.edits[0].value, json!("f2"));
        assert_eq!(result.edits[1].value, json!("with } brace"));
        assert_eq!(result.edits[1].line, 8);
    }

    #[test]
    #[serial]
    fn test_parse_fixture_scripts() {
        use std::fs;
        use std::path::Path;

        let fixtures_dir = Path::new("tests/fixtures");
        if !fixtures_dir.exists() {
            return;
        }

        for entry in fs::read_dir(fixtures_dir).unwrap() {
            let path = entry.unwrap().path();
            if path.extension().is_some_and(|e| e == "jsonl") {
                let file = fs::File::open(&path).unwrap();
                let result = parse_stream(std::io::BufReader::new(file));
                assert!(!result.edits.is_empty(), "Expected edits in {:?}", path);
                assert!(
                    result.warnings.is_empty(),
                    "Unexpected warnings in {:?}: {:?}",
                    path,
                    result.warnings
                );
            }
        }
    }
}
