//! The figure: traces, layout, frames and the write router
//!
//! Every property write goes through [`Figure::set`]. Outside a batch scope
//! the write is validated and applied at once. While a scope is open, trace
//! and layout writes are validated and buffered instead, and frame writes
//! still apply at once.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::batch::{BatchError, BatchKind, BatchScope, PendingBatch};
use crate::models::{AnimationOptions, Frame, Layout, NodeKind, NodeRef, PropertyNode, Trace};
use crate::path::{PathError, PropertyPath};
use crate::schema::{validate_node, validate_property, PropertyError, Validation};
use crate::transport::{NullTransport, Transport};

/// Error type for building a figure from JSON.
#[derive(Debug, Error)]
pub enum FigureError {
    /// Input is not valid JSON or not shaped like a figure
    #[error("invalid figure JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A trace, the layout or a frame failed schema validation
    #[error("{node}: {source}")]
    Invalid {
        node: NodeRef,
        #[source]
        source: PropertyError,
    },
}

/// Serialized figure shape: `{"data": [...], "layout": {...}, "frames": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FigureDoc {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default = "empty_object")]
    layout: Value,
    #[serde(default)]
    frames: Vec<Value>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// A plotting figure with batched property editing.
pub struct Figure {
    pub(crate) data: Vec<Trace>,
    pub(crate) layout: Layout,
    pub(crate) frames: Vec<Frame>,
    pub(crate) validation: Validation,
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) pending: Option<PendingBatch>,
}

impl fmt::Debug for Figure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Figure")
            .field("data", &self.data)
            .field("layout", &self.layout)
            .field("frames", &self.frames)
            .field("validation", &self.validation)
            .field("batching", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Figure {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            layout: Layout::default(),
            frames: Vec::new(),
            validation: Validation::Strict,
            transport: Box::new(NullTransport),
            pending: None,
        }
    }
}

impl Figure {
    /// Empty figure with strict validation and no transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a figure from nodes, validating each one.
    pub fn from_parts(
        data: Vec<Trace>,
        layout: Layout,
        frames: Vec<Frame>,
    ) -> Result<Self, FigureError> {
        let doc = FigureDoc {
            data: data.into_iter().map(Trace::into_value).collect(),
            layout: layout.into_value(),
            frames: frames.into_iter().map(Frame::into_value).collect(),
        };
        Self::from_doc(doc, Validation::Strict)
    }

    /// Build a figure from its JSON value with strict validation.
    pub fn from_value(value: Value) -> Result<Self, FigureError> {
        Self::from_value_with(value, Validation::Strict)
    }

    /// Build a figure from its JSON value with the given validation mode.
    pub fn from_value_with(value: Value, validation: Validation) -> Result<Self, FigureError> {
        let doc: FigureDoc = serde_json::from_value(value)?;
        Self::from_doc(doc, validation)
    }

    /// Parse a figure from a JSON string with strict validation.
    pub fn from_json(json: &str) -> Result<Self, FigureError> {
        let doc: FigureDoc = serde_json::from_str(json)?;
        Self::from_doc(doc, Validation::Strict)
    }

    fn from_doc(doc: FigureDoc, validation: Validation) -> Result<Self, FigureError> {
        let invalid = |node: NodeRef| move |source| FigureError::Invalid { node, source };

        let mut data = Vec::with_capacity(doc.data.len());
        for (i, trace) in doc.data.into_iter().enumerate() {
            let trace = validate_node(NodeKind::Trace, trace, validation)
                .map_err(invalid(NodeRef::Trace(i)))?;
            data.push(Trace::from_value(trace));
        }

        let layout = validate_node(NodeKind::Layout, doc.layout, validation)
            .map_err(invalid(NodeRef::Layout))?;

        let mut frames = Vec::with_capacity(doc.frames.len());
        for (i, frame) in doc.frames.into_iter().enumerate() {
            let frame = validate_node(NodeKind::Frame, frame, validation)
                .map_err(invalid(NodeRef::Frame(i)))?;
            frames.push(Frame::from_value(frame));
        }

        Ok(Self { data, layout: Layout::from_value(layout), frames, validation, ..Self::default() })
    }

    /// Replace the transport that receives flushed batch messages.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Box::new(transport);
        self
    }

    pub fn set_transport(&mut self, transport: Box<dyn Transport>) {
        self.transport = transport;
    }

    /// Change how unknown property paths are treated for later writes.
    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    pub fn validation(&self) -> Validation {
        self.validation
    }

    pub fn data(&self) -> &[Trace] {
        &self.data
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn trace(&self, index: usize) -> Option<&Trace> {
        self.data.get(index)
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// Whether a batch scope is currently open.
    pub fn is_batching(&self) -> bool {
        self.pending.is_some()
    }

    /// Append a validated trace, returning its index.
    pub fn add_trace(&mut self, trace: Trace) -> Result<usize, PropertyError> {
        let value = validate_node(NodeKind::Trace, trace.into_value(), self.validation)?;
        self.data.push(Trace::from_value(value));
        Ok(self.data.len() - 1)
    }

    /// Append a validated frame, returning its index.
    pub fn add_frame(&mut self, frame: Frame) -> Result<usize, PropertyError> {
        let value = validate_node(NodeKind::Frame, frame.into_value(), self.validation)?;
        self.frames.push(Frame::from_value(value));
        Ok(self.frames.len() - 1)
    }

    fn check_node(&self, node: NodeRef) -> Result<(), PropertyError> {
        let exists = match node {
            NodeRef::Trace(i) => i < self.data.len(),
            NodeRef::Layout => true,
            NodeRef::Frame(i) => i < self.frames.len(),
        };
        if exists {
            Ok(())
        } else {
            Err(PropertyError::NoSuchNode(node))
        }
    }

    /// Live value at `path` on `node`.
    ///
    /// Inside a batch scope, buffered writes are not visible here until the
    /// scope exits.
    pub fn get(&self, node: NodeRef, path: &str) -> Result<Option<&Value>, PropertyError> {
        let path = PropertyPath::parse(path)?;
        self.get_path(node, &path)
    }

    pub fn get_path(
        &self,
        node: NodeRef,
        path: &PropertyPath,
    ) -> Result<Option<&Value>, PropertyError> {
        self.check_node(node)?;
        Ok(match node {
            NodeRef::Trace(i) => self.data[i].property(path),
            NodeRef::Layout => self.layout.property(path),
            NodeRef::Frame(i) => self.frames[i].property(path),
        })
    }

    /// Write `value` at `path` on `node`.
    ///
    /// Fails immediately on a malformed path, an unknown path (strict mode),
    /// a value of the wrong kind or a missing node, whether or not a batch
    /// scope is open.
    pub fn set(
        &mut self,
        node: NodeRef,
        path: &str,
        value: impl Into<Value>,
    ) -> Result<(), PropertyError> {
        let path = PropertyPath::parse(path)?;
        self.set_path(node, path, value.into())
    }

    pub fn set_path(
        &mut self,
        node: NodeRef,
        path: PropertyPath,
        value: Value,
    ) -> Result<(), PropertyError> {
        self.check_node(node)?;
        let value = validate_property(node.kind(), &path, value, self.validation)?;

        if node.kind().is_buffered() {
            if let Some(batch) = self.pending.as_ref() {
                check_indexes_buffered(batch, self.tree(node), node, &path)?;
            }
            if let Some(batch) = self.pending.as_mut() {
                debug!(%node, %path, "buffering property write");
                batch.record(node, path, value);
                return Ok(());
            }
        }

        debug!(%node, %path, "applying property write");
        self.apply(node, &path, value)?;
        Ok(())
    }

    fn tree(&self, node: NodeRef) -> &Value {
        match node {
            NodeRef::Trace(i) => self.data[i].tree(),
            NodeRef::Layout => self.layout.tree(),
            NodeRef::Frame(i) => self.frames[i].tree(),
        }
    }

    /// Raw write to the live tree. The node must exist.
    pub(crate) fn apply(
        &mut self,
        node: NodeRef,
        path: &PropertyPath,
        value: Value,
    ) -> Result<(), PathError> {
        match node {
            NodeRef::Trace(i) => self.data[i].set_property(path, value),
            NodeRef::Layout => self.layout.set_property(path, value),
            NodeRef::Frame(i) => self.frames[i].set_property(path, value),
        }
    }

    /// Open a scope that defers trace and layout writes and flushes them as
    /// one animate message on exit.
    pub fn batch_animate(&mut self, options: AnimationOptions) -> BatchScope<'_> {
        BatchScope::open(self, BatchKind::Animate(options))
    }

    /// Open a scope that defers trace and layout writes and flushes them as
    /// one update message on exit.
    pub fn batch_update(&mut self) -> BatchScope<'_> {
        BatchScope::open(self, BatchKind::Update)
    }

    /// Run `body` inside an animate scope. The scope always flushes, even
    /// when `body` fails.
    pub fn with_batch_animate<T, E, F>(
        &mut self,
        options: AnimationOptions,
        body: F,
    ) -> Result<T, BatchError<E>>
    where
        F: FnOnce(&mut BatchScope<'_>) -> Result<T, E>,
        E: fmt::Display,
    {
        self.batch_animate(options).run(body)
    }

    /// Run `body` inside an update scope. The scope always flushes, even
    /// when `body` fails.
    pub fn with_batch_update<T, E, F>(&mut self, body: F) -> Result<T, BatchError<E>>
    where
        F: FnOnce(&mut BatchScope<'_>) -> Result<T, E>,
        E: fmt::Display,
    {
        self.batch_update().run(body)
    }

    /// Serialize back to `{"data": [...], "layout": {...}, "frames": [...]}`.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert(
            "data".to_string(),
            Value::Array(self.data.iter().map(|t| t.tree().clone()).collect()),
        );
        out.insert("layout".to_string(), self.layout.tree().clone());
        out.insert(
            "frames".to_string(),
            Value::Array(self.frames.iter().map(|f| f.tree().clone()).collect()),
        );
        Value::Object(out)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_value())
    }
}

/// Check the subscripts of `path` against the value the figure will hold
/// once the buffered edits are applied: the longest buffered prefix of
/// `path` if there is one, the live tree otherwise.
fn check_indexes_buffered(
    batch: &PendingBatch,
    live: &Value,
    node: NodeRef,
    path: &PropertyPath,
) -> Result<(), PathError> {
    let segments = path.segments();
    for cut in (1..segments.len()).rev() {
        let prefix = PropertyPath::from_segments(segments[..cut].to_vec());
        if let Some(buffered) = batch.pending_value(node, &prefix) {
            let rest = PropertyPath::from_segments(segments[cut..].to_vec());
            return rest.check_indexes(buffered).map_err(|e| match e {
                PathError::IndexOutOfRange { index, len, .. } => {
                    PathError::IndexOutOfRange { path: path.to_string(), index, len }
                }
                other => other,
            });
        }
    }
    path.check_indexes(live)
}
