//! Server-sent event decoding
//!
//! Implements the line protocol from the HTML living standard: `field: value`
//! lines accumulate into an event, a blank line dispatches it, lines starting
//! with `:` are comments. Chunks may split lines (and UTF-8 sequences)
//! anywhere, so the decoder buffers raw bytes until a full line is present.

use std::pin::Pin;

use futures_util::Stream;

use crate::error::Result;
use crate::response::Response;

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event name; `"message"` when the server sent none.
    pub event: String,
    /// `data` lines joined with `\n`.
    pub data: String,
    pub id: Option<String>,
}

/// Stream of decoded events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event>> + Send>>;

/// Outcome of opening a stream.
pub enum StreamResponse {
    /// The server accepted the request; events follow.
    Open(EventStream),
    /// The server answered with a non-success status before streaming.
    Rejected(Response),
}

/// Incremental decoder fed with raw body chunks.
#[derive(Debug, Default)]
pub struct EventDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Event> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<Event> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => self.data.push(value.to_owned()),
            "id" => self.id = Some(value.to_owned()),
            // `retry` and unknown fields are ignored
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<Event> {
        let event = self.event.take();
        let id = self.id.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(Event {
            event: event.unwrap_or_else(|| "message".to_owned()),
            data,
            id,
        })
    }
}
