//! Batch scopes: deferred, coalesced trace and layout edits
//!
//! A [`BatchScope`] mutably borrows its figure for as long as it is open.
//! While open:
//!
//! - trace and layout writes are validated, then buffered by (node, path).
//!   A repeated write to the same key replaces the value but keeps the key's
//!   first-insertion position. Reads still see the pre-scope values.
//! - frame writes are applied at once and never appear in the message.
//!
//! On exit the buffered edits are applied in first-insertion order and one
//! message is sent through the figure's transport. Exit happens through
//! [`BatchScope::finish`], which reports transport failures, or through
//! `Drop` on every other path (early return, `?`, panic unwinding), which
//! logs them.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;
use tracing::{error, info};

use crate::figure::Figure;
use crate::message::{AnimateMessage, UpdateMessage};
use crate::models::{AnimationOptions, NodeRef};
use crate::path::PropertyPath;
use crate::schema::PropertyError;
use crate::transport::TransportError;

/// Error type for the closure form of batch scopes.
#[derive(Debug, Error)]
pub enum BatchError<E> {
    /// The scope body failed. Buffered edits were still applied and sent.
    #[error("batch body failed: {0}")]
    Body(E),
    /// The body succeeded but the flushed message could not be delivered.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// What a scope sends when it flushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// One animate message with these options
    Animate(AnimationOptions),
    /// One update message
    Update,
}

/// One buffered write.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEdit {
    pub node: NodeRef,
    pub path: PropertyPath,
    pub value: Value,
}

/// Buffered trace and layout edits for the open scope.
#[derive(Debug, Default)]
pub struct PendingBatch {
    edits: Vec<PendingEdit>,
    positions: HashMap<(NodeRef, PropertyPath), usize>,
}

impl PendingBatch {
    /// Record a write, replacing any earlier value for the same key.
    pub fn record(&mut self, node: NodeRef, path: PropertyPath, value: Value) {
        match self.positions.get(&(node, path.clone())) {
            Some(&pos) => self.edits[pos].value = value,
            None => {
                self.positions.insert((node, path.clone()), self.edits.len());
                self.edits.push(PendingEdit { node, path, value });
            }
        }
    }

    /// Buffered value for a key, if any.
    pub fn pending_value(&self, node: NodeRef, path: &PropertyPath) -> Option<&Value> {
        self.positions.get(&(node, path.clone())).map(|&pos| &self.edits[pos].value)
    }

    /// Edits in first-insertion order.
    pub fn edits(&self) -> &[PendingEdit] {
        &self.edits
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Per-trace edit maps keyed by ascending trace index, plus merged layout
    /// edits.
    fn split(&self) -> (BTreeMap<usize, Map<String, Value>>, Map<String, Value>) {
        let mut styles: BTreeMap<usize, Map<String, Value>> = BTreeMap::new();
        let mut relayout = Map::new();
        for edit in &self.edits {
            match edit.node {
                NodeRef::Trace(i) => {
                    styles.entry(i).or_default().insert(edit.path.to_string(), edit.value.clone());
                }
                NodeRef::Layout => {
                    relayout.insert(edit.path.to_string(), edit.value.clone());
                }
                NodeRef::Frame(_) => {}
            }
        }
        (styles, relayout)
    }

    /// Build the animate message for these edits.
    pub fn animate_message(&self, options: &AnimationOptions) -> AnimateMessage {
        let (styles, relayout_data) = self.split();
        let trace_indexes = styles.keys().copied().collect();
        AnimateMessage {
            styles_data: styles.into_values().collect(),
            relayout_data,
            trace_indexes,
            animation_opts: options.to_animation_opts(),
        }
    }

    /// Build the update message for these edits.
    pub fn update_message(&self) -> UpdateMessage {
        let (styles, relayout_data) = self.split();
        let trace_indexes: Vec<usize> = styles.keys().copied().collect();

        let paths: BTreeSet<&String> = styles.values().flat_map(|m| m.keys()).collect();
        let mut restyle_data = Map::new();
        for path in paths {
            let column = styles
                .values()
                .map(|m| m.get(path.as_str()).cloned().unwrap_or(Value::Null))
                .collect();
            restyle_data.insert(path.clone(), Value::Array(column));
        }

        UpdateMessage { restyle_data, relayout_data, trace_indexes }
    }
}

/// An open batch scope on a figure.
pub struct BatchScope<'a> {
    figure: &'a mut Figure,
    kind: BatchKind,
}

impl fmt::Debug for BatchScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchScope")
            .field("kind", &self.kind)
            .field("pending", &self.figure.pending)
            .finish()
    }
}

impl<'a> BatchScope<'a> {
    pub(crate) fn open(figure: &'a mut Figure, kind: BatchKind) -> Self {
        figure.pending = Some(PendingBatch::default());
        Self { figure, kind }
    }

    pub fn kind(&self) -> BatchKind {
        self.kind
    }

    /// The figure as it currently reads (buffered edits not yet applied).
    pub fn figure(&self) -> &Figure {
        &*self.figure
    }

    /// Number of distinct buffered (node, path) keys.
    pub fn pending_len(&self) -> usize {
        self.figure.pending.as_ref().map_or(0, PendingBatch::len)
    }

    /// Value buffered for `path` on `node`, if any.
    pub fn pending_value(&self, node: NodeRef, path: &str) -> Option<&Value> {
        let path = PropertyPath::parse(path).ok()?;
        self.figure.pending.as_ref()?.pending_value(node, &path)
    }

    /// Write through the figure's router (buffered for traces and layout).
    pub fn set(
        &mut self,
        node: NodeRef,
        path: &str,
        value: impl Into<Value>,
    ) -> Result<(), PropertyError> {
        self.figure.set(node, path, value)
    }

    pub fn set_path(
        &mut self,
        node: NodeRef,
        path: PropertyPath,
        value: Value,
    ) -> Result<(), PropertyError> {
        self.figure.set_path(node, path, value)
    }

    pub fn set_trace(
        &mut self,
        index: usize,
        path: &str,
        value: impl Into<Value>,
    ) -> Result<(), PropertyError> {
        self.set(NodeRef::Trace(index), path, value)
    }

    pub fn set_layout(&mut self, path: &str, value: impl Into<Value>) -> Result<(), PropertyError> {
        self.set(NodeRef::Layout, path, value)
    }

    pub fn set_frame(
        &mut self,
        index: usize,
        path: &str,
        value: impl Into<Value>,
    ) -> Result<(), PropertyError> {
        self.set(NodeRef::Frame(index), path, value)
    }

    /// Live value of `path` on `node`.
    pub fn get(&self, node: NodeRef, path: &str) -> Result<Option<&Value>, PropertyError> {
        self.figure.get(node, path)
    }

    /// Apply the buffered edits and send the message, reporting transport
    /// failures.
    pub fn finish(mut self) -> Result<(), TransportError> {
        self.flush()
    }

    /// Run `body` in this scope, then flush regardless of its outcome.
    pub fn run<T, E, F>(mut self, body: F) -> Result<T, BatchError<E>>
    where
        F: FnOnce(&mut BatchScope<'a>) -> Result<T, E>,
        E: fmt::Display,
    {
        let outcome = body(&mut self);
        let sent = self.finish();

        match (outcome, sent) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(BatchError::Transport(e)),
            (Err(e), Ok(())) => Err(BatchError::Body(e)),
            (Err(e), Err(transport)) => {
                error!(body = %e, %transport, "batch body and transport both failed");
                Err(BatchError::Body(e))
            }
        }
    }

    /// Apply and send once. A second call is a no-op.
    fn flush(&mut self) -> Result<(), TransportError> {
        let Some(batch) = self.figure.pending.take() else {
            return Ok(());
        };

        for edit in batch.edits() {
            if let Err(e) = self.figure.apply(edit.node, &edit.path, edit.value.clone()) {
                error!(
                    node = %edit.node,
                    path = %edit.path,
                    error = %e,
                    "buffered edit not applied"
                );
            }
        }

        match &self.kind {
            BatchKind::Animate(options) => {
                let message = batch.animate_message(options);
                info!(
                    edits = batch.len(),
                    traces = message.trace_indexes.len(),
                    easing = %options.easing,
                    duration = options.duration,
                    "flushing batch animate"
                );
                self.figure.transport.send_animate(&message)
            }
            BatchKind::Update => {
                let message = batch.update_message();
                info!(
                    edits = batch.len(),
                    traces = message.trace_indexes.len(),
                    "flushing batch update"
                );
                self.figure.transport.send_update(&message)
            }
        }
    }
}

impl Drop for BatchScope<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            error!(error = %e, "failed to send batch message on scope exit");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RecordingTransport;
    use serde_json::json;

    fn sample(transport: RecordingTransport) -> Figure {
        Figure::from_value(json!({
            "data": [
                {"type": "scatter", "marker": {"color": "green"}},
                {"type": "bar", "marker": {"opacity": 0.5}},
                {"type": "bar"}
            ],
            "layout": {"xaxis": {"range": [-1, 4]}},
            "frames": [{"name": "f1"}]
        }))
        .unwrap()
        .with_transport(transport)
    }

    #[test]
    fn test_pending_batch_last_write_wins_keeps_position() {
        let mut batch = PendingBatch::default();
        let a = PropertyPath::parse("marker.color").unwrap();
        let b = PropertyPath::parse("xaxis.range").unwrap();
        batch.record(NodeRef::Trace(0), a.clone(), json!("red"));
        batch.record(NodeRef::Layout, b.clone(), json!([0, 1]));
        batch.record(NodeRef::Trace(0), a.clone(), json!("blue"));

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.edits()[0].path, a);
        assert_eq!(batch.edits()[0].value, json!("blue"));
        assert_eq!(batch.edits()[1].path, b);
        assert_eq!(batch.pending_value(NodeRef::Trace(0), &a), Some(&json!("blue")));
    }

    #[test]
    fn test_animate_message_orders_traces() {
        let mut batch = PendingBatch::default();
        batch.record(NodeRef::Trace(2), PropertyPath::parse("opacity").unwrap(), json!(0.1));
        batch.record(NodeRef::Trace(0), PropertyPath::parse("name").unwrap(), json!("a"));
        let msg = batch.animate_message(&AnimationOptions::default());

        assert_eq!(msg.trace_indexes, vec![0, 2]);
        assert_eq!(msg.styles_data[0]["name"], json!("a"));
        assert_eq!(msg.styles_data[1]["opacity"], json!(0.1));
        assert!(msg.relayout_data.is_empty());
    }

    #[test]
    fn test_update_message_aligns_restyle_columns() {
        let mut batch = PendingBatch::default();
        batch.record(NodeRef::Trace(1), PropertyPath::parse("marker.color").unwrap(), json!("red"));
        batch.record(NodeRef::Trace(0), PropertyPath::parse("opacity").unwrap(), json!(0.3));
        batch.record(NodeRef::Layout, PropertyPath::parse("width").unwrap(), json!(400));
        let msg = batch.update_message();

        assert_eq!(msg.trace_indexes, vec![0, 1]);
        assert_eq!(msg.restyle_data["marker.color"], json!([null, "red"]));
        assert_eq!(msg.restyle_data["opacity"], json!([0.3, null]));
        assert_eq!(msg.relayout_data["width"], json!(400));
    }

    #[test]
    fn test_scope_defers_until_finish() {
        let recorder = RecordingTransport::new();
        let mut fig = sample(recorder.clone());

        let mut scope = fig.batch_animate(AnimationOptions::default());
        scope.set_trace(0, "marker.color", "yellow").unwrap();
        assert_eq!(scope.get(NodeRef::Trace(0), "marker.color").unwrap(), Some(&json!("green")));
        assert_eq!(scope.pending_value(NodeRef::Trace(0), "marker.color"), Some(&json!("yellow")));
        assert!(scope.figure().is_batching());
        assert!(recorder.is_empty());
        scope.finish().unwrap();

        assert!(!fig.is_batching());
        assert_eq!(fig.get(NodeRef::Trace(0), "marker.color").unwrap(), Some(&json!("yellow")));
        assert_eq!(recorder.animate_messages().len(), 1);
    }

    #[test]
    fn test_frames_apply_immediately_and_stay_out_of_message() {
        let recorder = RecordingTransport::new();
        let mut fig = sample(recorder.clone());

        let mut scope = fig.batch_animate(AnimationOptions::default());
        scope.set_frame(0, "name", "f2").unwrap();
        assert_eq!(scope.get(NodeRef::Frame(0), "name").unwrap(), Some(&json!("f2")));
        assert_eq!(scope.pending_len(), 0);
        scope.finish().unwrap();

        let msg = &recorder.animate_messages()[0];
        assert!(msg.is_empty());
        assert!(msg.trace_indexes.is_empty());
    }

    #[test]
    fn test_drop_flushes_once() {
        let recorder = RecordingTransport::new();
        let mut fig = sample(recorder.clone());
        {
            let mut scope = fig.batch_update();
            scope.set_layout("xaxis.range", json!([10, 20])).unwrap();
        }
        assert_eq!(fig.get(NodeRef::Layout, "xaxis.range").unwrap(), Some(&json!([10, 20])));
        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.update_messages()[0].relayout_data["xaxis.range"], json!([10, 20]));
    }

    #[test]
    fn test_empty_scope_still_sends() {
        let recorder = RecordingTransport::new();
        let mut fig = sample(recorder.clone());
        fig.batch_animate(AnimationOptions::default()).finish().unwrap();
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_invalid_write_fails_at_write_time() {
        let recorder = RecordingTransport::new();
        let mut fig = sample(recorder.clone());

        let mut scope = fig.batch_animate(AnimationOptions::default());
        assert!(matches!(
            scope.set_trace(0, "marker.colour", "red"),
            Err(PropertyError::UnknownPath { .. })
        ));
        assert!(matches!(
            scope.set_trace(9, "opacity", 0.5),
            Err(PropertyError::NoSuchNode(NodeRef::Trace(9)))
        ));
        assert_eq!(scope.pending_len(), 0);
        scope.finish().unwrap();
    }

    #[test]
    fn test_flush_skips_edit_invalidated_by_coalescing() {
        let recorder = RecordingTransport::new();
        let mut fig = sample(recorder.clone());

        let mut scope = fig.batch_update();
        scope.set_trace(2, "y", json!([1, 2, 3])).unwrap();
        scope.set_trace(2, "y[3]", 4).unwrap();
        // replaces the first buffered value, which is applied before y[3]
        scope.set_trace(2, "y", json!([])).unwrap();
        scope.set_layout("width", 400).unwrap();
        scope.finish().unwrap();

        assert_eq!(fig.get(NodeRef::Trace(2), "y").unwrap(), Some(&json!([])));
        assert_eq!(fig.get(NodeRef::Layout, "width").unwrap(), Some(&json!(400)));
        assert_eq!(recorder.len(), 1);
    }
}
