//! Property paths into figure trees
//!
//! A path addresses one property inside a trace, layout or frame tree using
//! dotted keys with optional array subscripts:
//!
//! - `marker.color`
//! - `xaxis.range`
//! - `annotations[0].text`
//! - `xaxis.range[1]`
//!
//! Paths are parsed once and then used both to read and to write
//! `serde_json::Value` trees. The canonical string form (`Display`) is what
//! ends up as a key in outgoing messages.

use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Error type for malformed path strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Path string is empty
    #[error("property path is empty")]
    Empty,
    /// A `.`-separated part is empty (e.g. `marker..color`)
    #[error("empty segment in property path '{0}'")]
    EmptySegment(String),
    /// A part does not look like `name` or `name[0]`
    #[error("invalid segment '{segment}' in property path '{path}'")]
    InvalidSegment { path: String, segment: String },
    /// A subscript skips past the end of its array
    #[error("index {index} in property path '{path}' is past the end of an array of length {len}")]
    IndexOutOfRange { path: String, index: usize, len: usize },
}

/// One step in a property path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Object member
    Key(String),
    /// Array element
    Index(usize),
}

/// A parsed property path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyPath {
    segments: Vec<Segment>,
}

fn segment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)((?:\[\d+\])*)$").expect("segment pattern is valid")
    })
}

fn subscript_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(\d+)\]").expect("subscript pattern is valid"))
}

impl PropertyPath {
    /// Parse a path string such as `marker.color` or `annotations[0].text`.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        for part in path.split('.') {
            if part.is_empty() {
                return Err(PathError::EmptySegment(path.to_string()));
            }
            let invalid =
                || PathError::InvalidSegment { path: path.to_string(), segment: part.to_string() };

            let caps = segment_regex().captures(part).ok_or_else(invalid)?;
            segments.push(Segment::Key(caps[1].to_string()));

            if let Some(subscripts) = caps.get(2) {
                for sub in subscript_regex().captures_iter(subscripts.as_str()) {
                    let index: usize = sub[1].parse().map_err(|_| invalid())?;
                    segments.push(Segment::Index(index));
                }
            }
        }

        Ok(Self { segments })
    }

    /// Build a path from already-validated segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The first key of the path (`marker` for `marker.color`).
    pub fn root_key(&self) -> Option<&str> {
        match self.segments.first() {
            Some(Segment::Key(k)) => Some(k),
            _ => None,
        }
    }

    /// Path with the first segment removed.
    pub fn tail(&self) -> PropertyPath {
        Self { segments: self.segments.iter().skip(1).cloned().collect() }
    }

    /// Path extended by one object key.
    pub fn child(&self, key: &str) -> PropertyPath {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.to_string()));
        Self { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Read the value at this path, if present.
    pub fn get<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for segment in &self.segments {
            current = match segment {
                Segment::Key(k) => current.as_object()?.get(k)?,
                Segment::Index(i) => current.as_array()?.get(*i)?,
            };
        }
        Some(current)
    }

    /// Check that every subscript addresses an existing element of `root`
    /// or appends right after the last one.
    ///
    /// Containers missing along the way count as empty arrays, so only index
    /// 0 can create them.
    pub fn check_indexes(&self, root: &Value) -> Result<(), PathError> {
        let mut current = Some(root);
        for segment in &self.segments {
            current = match segment {
                Segment::Key(k) => current.and_then(|v| v.as_object()).and_then(|m| m.get(k)),
                Segment::Index(i) => {
                    let items = current.and_then(Value::as_array);
                    let len = items.map_or(0, Vec::len);
                    if *i > len {
                        return Err(self.out_of_range(*i, len));
                    }
                    items.and_then(|items| items.get(*i))
                }
            };
        }
        Ok(())
    }

    fn out_of_range(&self, index: usize, len: usize) -> PathError {
        PathError::IndexOutOfRange { path: self.to_string(), index, len }
    }

    /// Write a value at this path, creating intermediate containers.
    ///
    /// Missing objects are created as `{}`. A subscript may address an
    /// existing element or append one right after the end; anything further
    /// is an error and leaves `root` untouched. A non-container in the way
    /// is replaced.
    pub fn set(&self, root: &mut Value, value: Value) -> Result<(), PathError> {
        self.check_indexes(root)?;

        let mut current = root;
        for segment in &self.segments {
            current = match segment {
                Segment::Key(k) => {
                    if !current.is_object() {
                        *current = Value::Object(Map::new());
                    }
                    match current {
                        Value::Object(map) => map.entry(k.clone()).or_insert(Value::Null),
                        _ => unreachable!("replaced with an object above"),
                    }
                }
                Segment::Index(i) => {
                    if !current.is_array() {
                        *current = Value::Array(Vec::new());
                    }
                    match current {
                        Value::Array(items) => {
                            let len = items.len();
                            if *i == len {
                                items.push(Value::Null);
                            }
                            items.get_mut(*i).ok_or_else(|| self.out_of_range(*i, len))?
                        }
                        _ => unreachable!("replaced with an array above"),
                    }
                }
            };
        }
        *current = value;
        Ok(())
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            match segment {
                Segment::Key(k) => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", k)?;
                }
                Segment::Index(i) => write!(f, "[{}]", i)?,
            }
            first = false;
        }
        Ok(())
    }
}

impl std::str::FromStr for PropertyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PropertyPath::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_dotted() {
        let path = PropertyPath::parse("marker.color").unwrap();
        assert_eq!(
            path.segments(),
            &[Segment::Key("marker".into()), Segment::Key("color".into())]
        );
        assert_eq!(path.to_string(), "marker.color");
    }

    #[test]
    fn test_parse_subscripts() {
        let path = PropertyPath::parse("annotations[2].text").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("annotations".into()),
                Segment::Index(2),
                Segment::Key("text".into())
            ]
        );
        assert_eq!(path.to_string(), "annotations[2].text");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(PropertyPath::parse(""), Err(PathError::Empty));
        assert!(matches!(PropertyPath::parse("marker..color"), Err(PathError::EmptySegment(_))));
        assert!(matches!(
            PropertyPath::parse("marker.9color"),
            Err(PathError::InvalidSegment { .. })
        ));
        assert!(matches!(PropertyPath::parse("range[x]"), Err(PathError::InvalidSegment { .. })));
    }

    #[test]
    fn test_get_nested() {
        let tree = json!({"xaxis": {"range": [-1, 4]}});
        let path = PropertyPath::parse("xaxis.range[1]").unwrap();
        assert_eq!(path.get(&tree), Some(&json!(4)));

        let missing = PropertyPath::parse("yaxis.range").unwrap();
        assert_eq!(missing.get(&tree), None);
    }

    #[test]
    fn test_set_creates_intermediates() {
        let mut tree = json!({});
        PropertyPath::parse("yaxis.title.text").unwrap().set(&mut tree, json!("f2")).unwrap();
        assert_eq!(tree, json!({"yaxis": {"title": {"text": "f2"}}}));

        PropertyPath::parse("annotations[0].text").unwrap().set(&mut tree, json!("a")).unwrap();
        PropertyPath::parse("annotations[1].text").unwrap().set(&mut tree, json!("b")).unwrap();
        assert_eq!(tree["annotations"], json!([{"text": "a"}, {"text": "b"}]));
    }

    #[test]
    fn test_set_replaces_scalar_in_the_way() {
        // Plotly-style shorthand `title: "f1"` promoted to an object
        let mut tree = json!({"yaxis": {"title": "f1"}});
        PropertyPath::parse("yaxis.title.text").unwrap().set(&mut tree, json!("f2")).unwrap();
        assert_eq!(tree, json!({"yaxis": {"title": {"text": "f2"}}}));
    }

    #[test]
    fn test_set_rejects_gaps_and_huge_indexes() {
        let mut tree = json!({"y": [3, 2, 1]});

        let huge = PropertyPath::parse("y[18446744073709551615]").unwrap();
        assert_eq!(
            huge.set(&mut tree, json!(1)),
            Err(PathError::IndexOutOfRange {
                path: "y[18446744073709551615]".into(),
                index: usize::MAX,
                len: 3
            })
        );

        let gap = PropertyPath::parse("y[5]").unwrap();
        assert!(matches!(gap.set(&mut tree, json!(1)), Err(PathError::IndexOutOfRange { .. })));

        let nested = PropertyPath::parse("annotations[2].text").unwrap();
        assert!(matches!(
            nested.set(&mut tree, json!("c")),
            Err(PathError::IndexOutOfRange { index: 2, len: 0, .. })
        ));
        assert_eq!(tree, json!({"y": [3, 2, 1]}));

        PropertyPath::parse("y[3]").unwrap().set(&mut tree, json!(0)).unwrap();
        PropertyPath::parse("y[0]").unwrap().set(&mut tree, json!(9)).unwrap();
        assert_eq!(tree["y"], json!([9, 2, 1, 0]));
    }

    #[test]
    fn test_tail_and_child() {
        let path = PropertyPath::parse("layout.xaxis.range").unwrap();
        assert_eq!(path.root_key(), Some("layout"));
        assert_eq!(path.tail().to_string(), "xaxis.range");
        assert_eq!(path.tail().child("extra").to_string(), "xaxis.range.extra");
    }
}
