//! Outgoing messages produced when a batch scope flushes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::AnimationOpts;

/// One coalesced animation step.
///
/// `styles_data[i]` holds the edits for trace `trace_indexes[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimateMessage {
    /// Per-trace `path -> value` maps, ascending by trace index
    pub styles_data: Vec<Map<String, Value>>,
    /// Merged layout `path -> value` edits
    pub relayout_data: Map<String, Value>,
    /// Sorted distinct trace indexes that were edited
    pub trace_indexes: Vec<usize>,
    /// Transition and frame timing
    pub animation_opts: AnimationOpts,
}

/// One coalesced non-animated update.
///
/// Each `restyle_data` entry is an array aligned with `trace_indexes`;
/// traces that did not touch the path contribute `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMessage {
    pub restyle_data: Map<String, Value>,
    pub relayout_data: Map<String, Value>,
    pub trace_indexes: Vec<usize>,
}

/// Any message a transport can carry, tagged for line-oriented output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Animate(AnimateMessage),
    Update(UpdateMessage),
}

impl AnimateMessage {
    /// True when the scope buffered nothing.
    pub fn is_empty(&self) -> bool {
        self.styles_data.is_empty() && self.relayout_data.is_empty()
    }
}

impl UpdateMessage {
    pub fn is_empty(&self) -> bool {
        self.restyle_data.is_empty() && self.relayout_data.is_empty()
    }
}
