//! Property schema and value validation for figure nodes
//!
//! Every writable property of a trace, the layout or a frame is listed here
//! together with the kind of value it accepts. Paths are normalized before
//! lookup:
//!
//! - array subscripts collapse to `[]` (`annotations[3].text` -> `annotations[].text`)
//! - numbered axes collapse to their base (`xaxis2.range` -> `xaxis.range`)
//!
//! A path that is a proper prefix of listed properties (`marker`, `xaxis`)
//! is a subtree and accepts an object whose members are validated
//! recursively. Frames delegate `layout.*` to the layout schema and
//! `data[i].*` to the trace schema.

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::warn;

use crate::models::{NodeKind, NodeRef};
use crate::path::{PathError, PropertyPath, Segment};

/// How unknown property paths are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validation {
    /// Unknown paths are errors
    #[default]
    Strict,
    /// Unknown paths are accepted with a warning
    Lenient,
}

/// Error type for rejected property writes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyError {
    /// The path string itself is malformed
    #[error(transparent)]
    Path(#[from] PathError),
    /// The path does not name a property of this node kind
    #[error("'{path}' is not a valid {kind} property")]
    UnknownPath { kind: NodeKind, path: String },
    /// The value has the wrong shape for the property
    #[error("invalid value for {kind} property '{path}': expected {expected}, got {found}")]
    InvalidValue { kind: NodeKind, path: String, expected: String, found: Value },
    /// The addressed trace or frame index is out of range
    #[error("{0} does not exist")]
    NoSuchNode(NodeRef),
}

/// The kind of value a property accepts. `null` is accepted everywhere and
/// means "unset".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueKind {
    /// CSS color string or colorscale number
    Color { array_ok: bool },
    /// Number, optionally bounded
    Number { min: Option<f64>, max: Option<f64>, array_ok: bool },
    /// Integer with optional lower bound
    Integer { min: Option<i64> },
    /// Free-form string
    String,
    /// true/false
    Boolean,
    /// One of a fixed set of strings, optionally also a boolean
    Enumerated { values: &'static [&'static str], bool_ok: bool },
    /// Data column of any length
    DataArray,
    /// Fixed-length array of scalars (e.g. an axis range)
    InfoArray(usize),
    /// Anything
    Any,
    /// A whole node validated against another node kind's schema
    Node(NodeKind),
    /// An array of nodes validated against another node kind's schema
    Nodes(NodeKind),
}

fn color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(#[0-9a-fA-F]{3,8}|(rgb|rgba|hsl|hsla)\([^)]*\)|[a-zA-Z]+)$")
            .expect("color pattern is valid")
    })
}

fn axis_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([xy]axis)\d+$").expect("axis pattern is valid"))
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

impl ValueKind {
    /// Human-readable description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            ValueKind::Color { array_ok: false } => "a color".to_string(),
            ValueKind::Color { array_ok: true } => "a color or array of colors".to_string(),
            ValueKind::Number { min, max, array_ok } => {
                let mut s = "a number".to_string();
                match (min, max) {
                    (Some(lo), Some(hi)) => s.push_str(&format!(" in [{}, {}]", lo, hi)),
                    (Some(lo), None) => s.push_str(&format!(" >= {}", lo)),
                    (None, Some(hi)) => s.push_str(&format!(" <= {}", hi)),
                    (None, None) => {}
                }
                if *array_ok {
                    s.push_str(" (or array of such numbers)");
                }
                s
            }
            ValueKind::Integer { min: Some(lo) } => format!("an integer >= {}", lo),
            ValueKind::Integer { min: None } => "an integer".to_string(),
            ValueKind::String => "a string".to_string(),
            ValueKind::Boolean => "a boolean".to_string(),
            ValueKind::Enumerated { values, bool_ok } => {
                let mut s = format!("one of {:?}", values);
                if *bool_ok {
                    s.push_str(" or a boolean");
                }
                s
            }
            ValueKind::DataArray => "an array".to_string(),
            ValueKind::InfoArray(n) => format!("an array of {} scalars", n),
            ValueKind::Any => "any value".to_string(),
            ValueKind::Node(kind) => format!("a {} object", kind),
            ValueKind::Nodes(kind) => format!("an array of {} objects", kind),
        }
    }

    /// Whether a leaf value matches this kind. Node kinds are checked by the
    /// owning schema instead.
    fn accepts(&self, value: &Value) -> bool {
        match self {
            ValueKind::Color { array_ok } => {
                let single = |v: &Value| match v {
                    Value::String(s) => color_regex().is_match(s.trim()),
                    Value::Number(_) | Value::Null => true,
                    _ => false,
                };
                match value {
                    Value::Array(items) if *array_ok => items.iter().all(single),
                    other => single(other),
                }
            }
            ValueKind::Number { min, max, array_ok } => {
                let single = |v: &Value| match v {
                    Value::Number(n) => n.as_f64().is_some_and(|n| {
                        min.map_or(true, |lo| n >= lo) && max.map_or(true, |hi| n <= hi)
                    }),
                    Value::Null => true,
                    _ => false,
                };
                match value {
                    Value::Array(items) if *array_ok => items.iter().all(single),
                    other => single(other),
                }
            }
            ValueKind::Integer { min } => match value.as_i64() {
                Some(n) => min.map_or(true, |lo| n >= lo),
                None => value.as_u64().is_some(),
            },
            ValueKind::String => value.is_string(),
            ValueKind::Boolean => value.is_boolean(),
            ValueKind::Enumerated { values, bool_ok } => match value {
                Value::String(s) => values.contains(&s.as_str()),
                Value::Bool(_) => *bool_ok,
                _ => false,
            },
            ValueKind::DataArray => value.is_array(),
            ValueKind::InfoArray(n) => match value {
                Value::Array(items) => items.len() == *n && items.iter().all(is_scalar),
                _ => false,
            },
            ValueKind::Any => true,
            ValueKind::Node(_) | ValueKind::Nodes(_) => false,
        }
    }

    /// Whether `value` may be stored as element `index` of a property of
    /// this kind (`x[3]`, `xaxis.range[0]`).
    fn accepts_element(&self, index: usize, value: &Value) -> bool {
        match self {
            ValueKind::DataArray | ValueKind::Any => true,
            ValueKind::InfoArray(n) => index < *n && is_scalar(value),
            ValueKind::Color { array_ok: true } | ValueKind::Number { array_ok: true, .. } => {
                !value.is_array() && self.accepts(value)
            }
            _ => false,
        }
    }

    /// Whether elements of this kind may be addressed by subscript at all.
    fn is_indexable(&self) -> bool {
        match self {
            ValueKind::DataArray | ValueKind::InfoArray(_) | ValueKind::Any => true,
            ValueKind::Color { array_ok } | ValueKind::Number { array_ok, .. } => *array_ok,
            _ => false,
        }
    }
}

/// Valid properties for one node kind.
#[derive(Debug)]
pub struct Schema {
    kind: NodeKind,
    entries: BTreeMap<String, ValueKind>,
}

fn join(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", base, key)
    }
}

fn normalize_key(key: &str) -> String {
    match axis_regex().captures(key) {
        Some(caps) => caps[1].to_string(),
        None => key.to_string(),
    }
}

impl Schema {
    fn new(kind: NodeKind, entries: Vec<(String, ValueKind)>) -> Self {
        Self { kind, entries: entries.into_iter().collect() }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Leaf kind for a normalized path, if listed.
    pub fn leaf(&self, normalized: &str) -> Option<&ValueKind> {
        self.entries.get(normalized)
    }

    /// Number of listed leaf properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn has_prefix(&self, prefix: &str) -> bool {
        self.entries
            .range(prefix.to_string()..)
            .next()
            .is_some_and(|(key, _)| key.starts_with(prefix))
    }

    fn is_object_subtree(&self, norm: &str) -> bool {
        norm.is_empty() || self.has_prefix(&format!("{}.", norm))
    }

    fn is_array_subtree(&self, norm: &str) -> bool {
        !norm.is_empty() && self.has_prefix(&format!("{}[]", norm))
    }

    fn invalid(&self, shown: &str, expected: String, found: Value) -> PropertyError {
        PropertyError::InvalidValue { kind: self.kind, path: shown.to_string(), expected, found }
    }

    fn unknown(&self, shown: &str, value: Value, mode: Validation) -> Result<Value, PropertyError> {
        match mode {
            Validation::Strict => {
                Err(PropertyError::UnknownPath { kind: self.kind, path: shown.to_string() })
            }
            Validation::Lenient => {
                warn!(kind = %self.kind, path = shown, "accepting unknown property");
                Ok(value)
            }
        }
    }

    /// Validate `value` at the normalized path `norm`, returning the value to
    /// store (title shorthands are expanded to `{"text": ...}`).
    fn check(
        &self,
        norm: &str,
        shown: &str,
        value: Value,
        mode: Validation,
    ) -> Result<Value, PropertyError> {
        if let Some(kind) = self.entries.get(norm) {
            if value.is_null() {
                return Ok(value);
            }
            return match kind {
                ValueKind::Node(sub) => schema_for(*sub).check("", shown, value, mode),
                ValueKind::Nodes(sub) => match value {
                    Value::Array(items) => items
                        .into_iter()
                        .enumerate()
                        .map(|(i, item)| {
                            schema_for(*sub).check("", &format!("{}[{}]", shown, i), item, mode)
                        })
                        .collect::<Result<Vec<_>, _>>()
                        .map(Value::Array),
                    other => Err(self.invalid(shown, kind.describe(), other)),
                },
                leaf if leaf.accepts(&value) => Ok(value),
                leaf => Err(self.invalid(shown, leaf.describe(), value)),
            };
        }

        let object_subtree = self.is_object_subtree(norm);
        let array_subtree = self.is_array_subtree(norm);

        match value {
            Value::Null if object_subtree || array_subtree => Ok(Value::Null),
            Value::Object(members) if object_subtree => {
                let mut out = Map::new();
                for (key, member) in members {
                    let child_norm = join(norm, &normalize_key(&key));
                    let child_shown = join(shown, &key);
                    let checked = self.check(&child_norm, &child_shown, member, mode)?;
                    out.insert(key, checked);
                }
                Ok(Value::Object(out))
            }
            Value::String(text)
                if object_subtree && self.entries.contains_key(&join(norm, "text")) =>
            {
                let mut out = Map::new();
                out.insert("text".to_string(), Value::String(text));
                Ok(Value::Object(out))
            }
            Value::Array(items) if array_subtree => {
                let elem_norm = format!("{}[]", norm);
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.check(&elem_norm, &format!("{}[{}]", shown, i), item, mode)
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            other if object_subtree => Err(self.invalid(shown, "an object".to_string(), other)),
            other if array_subtree => Err(self.invalid(shown, "an array".to_string(), other)),
            other => self.unknown(shown, other, mode),
        }
    }

    fn check_segments(
        &self,
        segments: &[Segment],
        shown: &str,
        value: Value,
        mode: Validation,
    ) -> Result<Value, PropertyError> {
        let mut norm = String::new();

        for (i, segment) in segments.iter().enumerate() {
            match segment {
                Segment::Key(key) => norm = join(&norm, &normalize_key(key)),
                Segment::Index(_) => norm.push_str("[]"),
            }

            let rest = &segments[i + 1..];
            if rest.is_empty() {
                break;
            }
            let Some(kind) = self.entries.get(&norm) else {
                continue;
            };

            return match kind {
                ValueKind::Node(sub) => schema_for(*sub).check_segments(rest, shown, value, mode),
                ValueKind::Nodes(sub) => match rest {
                    [Segment::Index(_)] => schema_for(*sub).check("", shown, value, mode),
                    [Segment::Index(_), tail @ ..] => {
                        schema_for(*sub).check_segments(tail, shown, value, mode)
                    }
                    _ => self.unknown(shown, value, mode),
                },
                ValueKind::Any => Ok(value),
                leaf if leaf.is_indexable() => match rest {
                    [Segment::Index(index)] if leaf.accepts_element(*index, &value) => Ok(value),
                    [Segment::Index(_)] => {
                        let expected = format!("an element of {}", leaf.describe());
                        Err(self.invalid(shown, expected, value))
                    }
                    _ => self.unknown(shown, value, mode),
                },
                _ => self.unknown(shown, value, mode),
            };
        }

        self.check(&norm, shown, value, mode)
    }
}

fn axis_entries(axis: &str, out: &mut Vec<(String, ValueKind)>) {
    const AXIS_TYPES: &[&str] = &["-", "linear", "log", "date", "category", "multicategory"];
    const SIDES: &[&str] = &["top", "bottom", "left", "right"];

    let entries = [
        ("range", ValueKind::InfoArray(2)),
        ("autorange", ValueKind::Enumerated { values: &["reversed"], bool_ok: true }),
        ("type", ValueKind::Enumerated { values: AXIS_TYPES, bool_ok: false }),
        ("title.text", ValueKind::String),
        ("title.font.size", ValueKind::Number { min: Some(1.0), max: None, array_ok: false }),
        ("title.font.color", ValueKind::Color { array_ok: false }),
        ("title.font.family", ValueKind::String),
        ("showgrid", ValueKind::Boolean),
        ("gridcolor", ValueKind::Color { array_ok: false }),
        ("zeroline", ValueKind::Boolean),
        ("visible", ValueKind::Boolean),
        ("tickformat", ValueKind::String),
        ("domain", ValueKind::InfoArray(2)),
        ("anchor", ValueKind::String),
        ("overlaying", ValueKind::String),
        ("side", ValueKind::Enumerated { values: SIDES, bool_ok: false }),
        ("fixedrange", ValueKind::Boolean),
    ];
    for (key, kind) in entries {
        out.push((format!("{}.{}", axis, key), kind));
    }
}

fn font_entries(prefix: &str, out: &mut Vec<(String, ValueKind)>) {
    out.push((
        format!("{}.size", prefix),
        ValueKind::Number { min: Some(1.0), max: None, array_ok: false },
    ));
    out.push((format!("{}.color", prefix), ValueKind::Color { array_ok: false }));
    out.push((format!("{}.family", prefix), ValueKind::String));
}

fn trace_entries() -> Vec<(String, ValueKind)> {
    const TRACE_TYPES: &[&str] = &["scatter", "bar", "histogram", "box", "heatmap", "pie"];
    const LINE_SHAPES: &[&str] = &["linear", "spline", "hv", "vh", "hvh", "vhv"];
    const FILLS: &[&str] =
        &["none", "tozeroy", "tozerox", "tonexty", "tonextx", "toself", "tonext"];
    const ORIENTATIONS: &[&str] = &["v", "h"];

    let unit = ValueKind::Number { min: Some(0.0), max: Some(1.0), array_ok: false };
    let unit_array = ValueKind::Number { min: Some(0.0), max: Some(1.0), array_ok: true };
    let non_negative = ValueKind::Number { min: Some(0.0), max: None, array_ok: false };
    let non_negative_array = ValueKind::Number { min: Some(0.0), max: None, array_ok: true };

    let mut out: Vec<(String, ValueKind)> = [
        ("type", ValueKind::Enumerated { values: TRACE_TYPES, bool_ok: false }),
        ("name", ValueKind::String),
        ("uid", ValueKind::String),
        ("legendgroup", ValueKind::String),
        ("x", ValueKind::DataArray),
        ("y", ValueKind::DataArray),
        ("z", ValueKind::DataArray),
        ("customdata", ValueKind::DataArray),
        ("text", ValueKind::Any),
        ("hovertext", ValueKind::Any),
        ("hoverinfo", ValueKind::String),
        ("textposition", ValueKind::String),
        ("mode", ValueKind::String),
        ("opacity", unit),
        ("visible", ValueKind::Enumerated { values: &["legendonly"], bool_ok: true }),
        ("showlegend", ValueKind::Boolean),
        ("orientation", ValueKind::Enumerated { values: ORIENTATIONS, bool_ok: false }),
        ("xaxis", ValueKind::String),
        ("yaxis", ValueKind::String),
        ("width", non_negative_array),
        ("offset", ValueKind::Number { min: None, max: None, array_ok: true }),
        ("fill", ValueKind::Enumerated { values: FILLS, bool_ok: false }),
        ("fillcolor", ValueKind::Color { array_ok: false }),
        ("marker.color", ValueKind::Color { array_ok: true }),
        ("marker.opacity", unit_array),
        ("marker.size", non_negative_array),
        ("marker.symbol", ValueKind::String),
        ("marker.colorscale", ValueKind::Any),
        ("marker.showscale", ValueKind::Boolean),
        ("marker.line.color", ValueKind::Color { array_ok: true }),
        ("marker.line.width", non_negative_array),
        ("line.color", ValueKind::Color { array_ok: false }),
        ("line.width", non_negative),
        ("line.dash", ValueKind::String),
        ("line.shape", ValueKind::Enumerated { values: LINE_SHAPES, bool_ok: false }),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    font_entries("textfont", &mut out);
    out
}

fn layout_entries() -> Vec<(String, ValueKind)> {
    const HOVERMODES: &[&str] = &["x", "y", "closest", "x unified", "y unified"];
    const BARMODES: &[&str] = &["stack", "group", "overlay", "relative"];
    const ORIENTATIONS: &[&str] = &["v", "h"];
    const SHAPE_TYPES: &[&str] = &["rect", "circle", "line", "path"];

    let dimension = ValueKind::Number { min: Some(10.0), max: None, array_ok: false };
    let non_negative = ValueKind::Number { min: Some(0.0), max: None, array_ok: false };
    let unit = ValueKind::Number { min: Some(0.0), max: Some(1.0), array_ok: false };
    let position = ValueKind::Number { min: Some(-2.0), max: Some(3.0), array_ok: false };

    let mut out: Vec<(String, ValueKind)> = [
        ("title.text", ValueKind::String),
        ("title.x", unit),
        ("title.y", unit),
        ("width", dimension),
        ("height", dimension),
        ("autosize", ValueKind::Boolean),
        ("showlegend", ValueKind::Boolean),
        ("paper_bgcolor", ValueKind::Color { array_ok: false }),
        ("plot_bgcolor", ValueKind::Color { array_ok: false }),
        ("margin.l", non_negative),
        ("margin.r", non_negative),
        ("margin.t", non_negative),
        ("margin.b", non_negative),
        ("margin.pad", non_negative),
        ("hovermode", ValueKind::Enumerated { values: HOVERMODES, bool_ok: true }),
        ("barmode", ValueKind::Enumerated { values: BARMODES, bool_ok: false }),
        ("bargap", unit),
        ("template", ValueKind::Any),
        ("legend.x", position),
        ("legend.y", position),
        ("legend.orientation", ValueKind::Enumerated { values: ORIENTATIONS, bool_ok: false }),
        ("legend.bgcolor", ValueKind::Color { array_ok: false }),
        ("annotations[].text", ValueKind::String),
        ("annotations[].x", ValueKind::Any),
        ("annotations[].y", ValueKind::Any),
        ("annotations[].xref", ValueKind::String),
        ("annotations[].yref", ValueKind::String),
        ("annotations[].showarrow", ValueKind::Boolean),
        ("shapes[].type", ValueKind::Enumerated { values: SHAPE_TYPES, bool_ok: false }),
        ("shapes[].x0", ValueKind::Any),
        ("shapes[].x1", ValueKind::Any),
        ("shapes[].y0", ValueKind::Any),
        ("shapes[].y1", ValueKind::Any),
        ("shapes[].fillcolor", ValueKind::Color { array_ok: false }),
        ("shapes[].line.color", ValueKind::Color { array_ok: false }),
        ("shapes[].line.width", non_negative),
        ("updatemenus", ValueKind::Any),
        ("sliders", ValueKind::Any),
        ("transition.duration", ValueKind::Integer { min: Some(0) }),
        ("transition.easing", ValueKind::String),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    font_entries("font", &mut out);
    font_entries("title.font", &mut out);
    font_entries("legend.font", &mut out);
    font_entries("annotations[].font", &mut out);
    axis_entries("xaxis", &mut out);
    axis_entries("yaxis", &mut out);
    out
}

fn frame_entries() -> Vec<(String, ValueKind)> {
    [
        ("name", ValueKind::String),
        ("group", ValueKind::String),
        ("baseframe", ValueKind::String),
        ("traces", ValueKind::DataArray),
        ("data", ValueKind::Nodes(NodeKind::Trace)),
        ("layout", ValueKind::Node(NodeKind::Layout)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// The schema for a node kind.
pub fn schema_for(kind: NodeKind) -> &'static Schema {
    static TRACE: OnceLock<Schema> = OnceLock::new();
    static LAYOUT: OnceLock<Schema> = OnceLock::new();
    static FRAME: OnceLock<Schema> = OnceLock::new();

    match kind {
        NodeKind::Trace => TRACE.get_or_init(|| Schema::new(kind, trace_entries())),
        NodeKind::Layout => LAYOUT.get_or_init(|| Schema::new(kind, layout_entries())),
        NodeKind::Frame => FRAME.get_or_init(|| Schema::new(kind, frame_entries())),
    }
}

/// Validate a write of `value` to `path` on a node of `kind`.
///
/// Returns the value to store, which may be normalized (a bare string
/// assigned to a `title` becomes `{"text": ...}`).
pub fn validate_property(
    kind: NodeKind,
    path: &PropertyPath,
    value: Value,
    mode: Validation,
) -> Result<Value, PropertyError> {
    let shown = path.to_string();
    schema_for(kind).check_segments(path.segments(), &shown, value, mode)
}

/// Validate a whole node tree of `kind`.
pub fn validate_node(kind: NodeKind, value: Value, mode: Validation) -> Result<Value, PropertyError> {
    let schema = schema_for(kind);
    match value {
        Value::Object(_) => schema.check("", "", value, mode),
        other => Err(schema.invalid(&kind.to_string(), "an object".to_string(), other)),
    }
}

/// Whether `path` names a property of `kind` (strict rules).
pub fn is_known_path(kind: NodeKind, path: &PropertyPath) -> bool {
    !matches!(
        validate_property(kind, path, Value::Null, Validation::Strict),
        Err(PropertyError::UnknownPath { .. })
    )
}
