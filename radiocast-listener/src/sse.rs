//! `text/event-stream` frame parsing
//!
//! Bytes arrive in arbitrary chunks; [`SseParser`] buffers partial lines and
//! yields complete events on the blank-line boundary. Comment lines (leading
//! `:`) carry the server keepalive and are discarded.

use radiocast_common::RadioMessage;
use tracing::warn;

/// One dispatched server-sent event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// `event:` field; `None` means the default `message` type
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every event it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
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

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
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
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            // id and retry are not used by this channel
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent { event, data })
    }
}

/// Decode an event's JSON payload
///
/// Malformed payloads are logged and dropped; the connection is unaffected.
pub fn decode_event(event: &SseEvent) -> Option<RadioMessage> {
    match serde_json::from_str::<RadioMessage>(&event.data) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!(
                "Dropping malformed {} event: {}",
                event.event.as_deref().unwrap_or("message"),
                e
            );
            None
        }
    }
}
