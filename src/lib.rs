//! Figbatch - batched, coalesced property edits for plotting figures
//!
//! This library provides functionality to:
//! - Hold a figure (traces, layout, frames) with schema-validated properties
//! - Open batch scopes that defer trace and layout writes and flush them as
//!   one animate or update message on exit
//! - Deliver flushed messages through a pluggable [`Transport`]
//! - Parse edit scripts (JSONL or JSON5) and drive them from the `figb` CLI
//!
//! ```no_run
//! use figbatch::{AnimationOptions, Figure, RecordingTransport};
//! use serde_json::json;
//!
//! let recorder = RecordingTransport::new();
//! let mut fig = Figure::from_value(json!({"data": [{"type": "bar"}]}))
//!     .unwrap()
//!     .with_transport(recorder.clone());
//!
//! let mut scope = fig.batch_animate(AnimationOptions::default());
//! scope.set_trace(0, "marker.color", "yellow").unwrap();
//! scope.set_layout("xaxis.range", json!([10, 20])).unwrap();
//! drop(scope);
//!
//! assert_eq!(recorder.animate_messages().len(), 1);
//! ```

pub mod batch;
pub mod cli;
pub mod config;
pub mod figure;
pub mod message;
pub mod models;
pub mod parser;
pub mod path;
pub mod schema;
pub mod transport;

pub use batch::{BatchError, BatchKind, BatchScope};
pub use figure::{Figure, FigureError};
pub use message::{AnimateMessage, Message, UpdateMessage};
pub use models::{AnimationOptions, Easing, Frame, Layout, NodeKind, NodeRef, Trace};
pub use path::{PathError, PropertyPath};
pub use schema::{PropertyError, Validation};
pub use transport::{JsonlTransport, NullTransport, RecordingTransport, Transport, TransportError};
