//! Transports that carry flushed batch messages to a front-end
//!
//! The figure owns one `Box<dyn Transport>`. Each completed batch scope
//! calls exactly one of the send methods exactly once.

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

use crate::message::{AnimateMessage, Message, UpdateMessage};

/// Error type for failed sends.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Write to the underlying sink failed
    #[error("transport IO error: {0}")]
    Io(#[from] io::Error),
    /// Message could not be serialized
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    /// The receiving side is gone or refused the message
    #[error("transport rejected message: {0}")]
    Rejected(String),
}

/// Sink for flushed batch messages.
pub trait Transport {
    /// Deliver one coalesced animation.
    fn send_animate(&mut self, message: &AnimateMessage) -> Result<(), TransportError>;

    /// Deliver one coalesced update.
    fn send_update(&mut self, message: &UpdateMessage) -> Result<(), TransportError>;
}

/// Discards every message. Used by figures with no attached front-end.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn send_animate(&mut self, _message: &AnimateMessage) -> Result<(), TransportError> {
        Ok(())
    }

    fn send_update(&mut self, _message: &UpdateMessage) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Keeps every message in a shared log.
///
/// Clones share the same log, so a test can hand one clone to a figure and
/// inspect the other afterwards.
#[derive(Debug, Default, Clone)]
pub struct RecordingTransport {
    log: Rc<RefCell<Vec<Message>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all messages received so far.
    pub fn messages(&self) -> Vec<Message> {
        self.log.borrow().clone()
    }

    /// Animate messages received so far, in order.
    pub fn animate_messages(&self) -> Vec<AnimateMessage> {
        self.log
            .borrow()
            .iter()
            .filter_map(|m| match m {
                Message::Animate(a) => Some(a.clone()),
                Message::Update(_) => None,
            })
            .collect()
    }

    /// Update messages received so far, in order.
    pub fn update_messages(&self) -> Vec<UpdateMessage> {
        self.log
            .borrow()
            .iter()
            .filter_map(|m| match m {
                Message::Update(u) => Some(u.clone()),
                Message::Animate(_) => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.borrow().is_empty()
    }
}

impl Transport for RecordingTransport {
    fn send_animate(&mut self, message: &AnimateMessage) -> Result<(), TransportError> {
        self.log.borrow_mut().push(Message::Animate(message.clone()));
        Ok(())
    }

    fn send_update(&mut self, message: &UpdateMessage) -> Result<(), TransportError> {
        self.log.borrow_mut().push(Message::Update(message.clone()));
        Ok(())
    }
}

/// Writes each message as one JSON object per line, tagged with `"type"`.
pub struct JsonlTransport<W: Write> {
    writer: W,
}

impl<W: Write> JsonlTransport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_message(&mut self, message: &Message) -> Result<(), TransportError> {
        let json = serde_json::to_string(message)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl JsonlTransport<BufWriter<File>> {
    /// Append messages to a JSONL file, creating it if needed.
    pub fn append(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> Transport for JsonlTransport<W> {
    fn send_animate(&mut self, message: &AnimateMessage) -> Result<(), TransportError> {
        self.write_message(&Message::Animate(message.clone()))
    }

    fn send_update(&mut self, message: &UpdateMessage) -> Result<(), TransportError> {
        self.write_message(&Message::Update(message.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnimationOptions;
    use serde_json::Map;
    use std::fs;
    use tempfile::TempDir;

    fn animate() -> AnimateMessage {
        AnimateMessage {
            styles_data: vec![],
            relayout_data: Map::new(),
            trace_indexes: vec![],
            animation_opts: AnimationOptions::default().to_animation_opts(),
        }
    }

    fn update() -> UpdateMessage {
        UpdateMessage { restyle_data: Map::new(), relayout_data: Map::new(), trace_indexes: vec![] }
    }

    #[test]
    fn test_recording_clones_share_log() {
        let recorder = RecordingTransport::new();
        let mut handle = recorder.clone();
        handle.send_animate(&animate()).unwrap();
        handle.send_update(&update()).unwrap();

        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.animate_messages().len(), 1);
        assert_eq!(recorder.update_messages().len(), 1);
    }

    #[test]
    fn test_jsonl_in_memory() {
        let mut transport = JsonlTransport::new(Vec::new());
        transport.send_animate(&animate()).unwrap();
        transport.send_update(&update()).unwrap();

        let out = String::from_utf8(transport.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Message = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, Message::Animate(animate()));
        assert!(lines[1].contains("\"type\":\"update\""));
    }

    #[test]
    fn test_jsonl_append_mode() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("messages.jsonl");

        JsonlTransport::append(&path).unwrap().send_animate(&animate()).unwrap();
        JsonlTransport::append(&path).unwrap().send_update(&update()).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn test_null_transport_accepts_everything() {
        let mut transport = NullTransport;
        assert!(transport.send_animate(&animate()).is_ok());
        assert!(transport.send_update(&update()).is_ok());
    }
}
