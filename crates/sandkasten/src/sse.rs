//! Incremental Server-Sent-Events parser for the exec stream.
//!
//! The daemon frames each event as `event: <type>\ndata: <json>\n\n`. A
//! `data:` line never repeats its event type, so the parser carries the most
//! recently seen `event:` field as state until the blank-line separator
//! closes the frame.

/// A parsed SSE frame.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

impl SseEvent {
    fn is_empty(&self) -> bool {
        self.event.is_none() && self.data.is_empty()
    }
}

/// Accepts body chunks at arbitrary boundaries and yields completed events.
///
/// Buffers raw bytes and decodes only at line boundaries. A newline byte
/// never occurs inside a multi-byte UTF-8 sequence, so a character split
/// across two network chunks is reassembled before decoding.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    current: SseEvent,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a body chunk and return any events completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&byte| byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            let line = line.trim_end_matches('\r');
            self.process_line(line, &mut events);
        }

        events
    }

    /// Flush the trailing event when the stream ends without a final blank line.
    pub fn finish(mut self) -> Option<SseEvent> {
        let buffer = std::mem::take(&mut self.buffer);
        if !buffer.is_empty() {
            let line = String::from_utf8_lossy(&buffer);
            let line = line.trim_end_matches('\r').to_string();
            let mut ignored = Vec::new();
            self.process_line(&line, &mut ignored);
        }
        if self.current.is_empty() {
            None
        } else {
            Some(self.current)
        }
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<SseEvent>) {
        if line.is_empty() {
            if !self.current.is_empty() {
                events.push(std::mem::take(&mut self.current));
            }
            return;
        }

        if line.starts_with(':') {
            return;
        }

        let mut parts = line.splitn(2, ':');
        let field = parts.next().unwrap_or("");
        let value = parts.next().unwrap_or("");
        let value = value.strip_prefix(' ').unwrap_or(value);

        match field {
            "event" => self.current.event = Some(value.to_string()),
            "data" => {
                if !self.current.data.is_empty() {
                    self.current.data.push('\n');
                }
                self.current.data.push_str(value);
            }
            _ => {}
        }
    }
}
