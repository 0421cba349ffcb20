//! Figure nodes: traces, layout and frames.
//!
//! Each node is a JSON object tree. Reads and raw writes go through the
//! [`PropertyNode`] capability; validation and batching are layered on top
//! by the figure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::path::{PathError, PropertyPath};

/// Which collection a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Trace,
    Layout,
    Frame,
}

impl NodeKind {
    /// Whether writes to this kind of node are deferred inside a batch scope.
    pub fn is_buffered(self) -> bool {
        match self {
            NodeKind::Trace | NodeKind::Layout => true,
            NodeKind::Frame => false,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Trace => write!(f, "trace"),
            NodeKind::Layout => write!(f, "layout"),
            NodeKind::Frame => write!(f, "frame"),
        }
    }
}

/// Address of one node in a figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeRef {
    /// `figure.data[i]`
    Trace(usize),
    /// `figure.layout`
    Layout,
    /// `figure.frames[i]`
    Frame(usize),
}

impl NodeRef {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Trace(_) => NodeKind::Trace,
            NodeRef::Layout => NodeKind::Layout,
            NodeRef::Frame(_) => NodeKind::Frame,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            NodeRef::Trace(i) | NodeRef::Frame(i) => Some(*i),
            NodeRef::Layout => None,
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Trace(i) => write!(f, "trace:{}", i),
            NodeRef::Layout => write!(f, "layout"),
            NodeRef::Frame(i) => write!(f, "frame:{}", i),
        }
    }
}

impl FromStr for NodeRef {
    type Err = String;

    /// Parse `layout`, `trace:N` or `frame:N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "layout" {
            return Ok(NodeRef::Layout);
        }
        let (kind, index) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid node '{}': expected layout, trace:N or frame:N", s))?;
        let index: usize =
            index.parse().map_err(|_| format!("invalid node index '{}' in '{}'", index, s))?;
        match kind {
            "trace" => Ok(NodeRef::Trace(index)),
            "frame" => Ok(NodeRef::Frame(index)),
            _ => Err(format!("invalid node kind '{}': expected trace or frame", kind)),
        }
    }
}

/// Read/write access to a node's property tree.
pub trait PropertyNode {
    const KIND: NodeKind;

    fn tree(&self) -> &Value;

    fn tree_mut(&mut self) -> &mut Value;

    /// Current value at `path`, if set.
    fn property(&self, path: &PropertyPath) -> Option<&Value> {
        path.get(self.tree())
    }

    /// Write `value` at `path` without schema validation. Fails only on a
    /// subscript past the end of its array.
    fn set_property(&mut self, path: &PropertyPath, value: Value) -> Result<(), PathError> {
        path.set(self.tree_mut(), value)
    }
}

macro_rules! object_node {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Value);

        impl Default for $name {
            fn default() -> Self {
                Self(Value::Object(Map::new()))
            }
        }

        impl $name {
            /// Wrap a JSON object. Non-objects are replaced by an empty object.
            pub fn from_value(value: Value) -> Self {
                match value {
                    Value::Object(_) => Self(value),
                    _ => Self::default(),
                }
            }

            /// Builder-style raw write, for constructing fixtures. Malformed
            /// paths and out-of-range subscripts leave the node unchanged.
            pub fn with(mut self, path: &str, value: impl Into<Value>) -> Self {
                if let Ok(path) = PropertyPath::parse(path) {
                    let _ = path.set(&mut self.0, value.into());
                }
                self
            }

            pub fn into_value(self) -> Value {
                self.0
            }
        }

        impl PropertyNode for $name {
            const KIND: NodeKind = $kind;

            fn tree(&self) -> &Value {
                &self.0
            }

            fn tree_mut(&mut self) -> &mut Value {
                &mut self.0
            }
        }
    };
}

object_node!(
    /// One data series (`scatter`, `bar`, ...).
    Trace,
    NodeKind::Trace
);

object_node!(
    /// Display and axis configuration.
    Layout,
    NodeKind::Layout
);

object_node!(
    /// An animation snapshot with its own `data` and `layout`.
    Frame,
    NodeKind::Frame
);

impl Trace {
    /// New trace of the given type (`scatter`, `bar`, ...).
    pub fn new(trace_type: &str) -> Self {
        Self::default().with("type", trace_type)
    }

    /// Trace type, defaulting to `scatter` when unset.
    pub fn trace_type(&self) -> &str {
        self.0.get("type").and_then(Value::as_str).unwrap_or("scatter")
    }
}

impl Frame {
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }
}
