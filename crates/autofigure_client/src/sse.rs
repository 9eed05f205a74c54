//! Incremental decoder for `text/event-stream` bodies.
//!
//! Bytes arrive in arbitrary chunks; complete lines are processed as they show
//! up and a frame is emitted on each blank line. Comment lines (the server's
//! `: keepalive`) and the `id`/`retry` fields are dropped.

use crate::ChannelError;

/// Longest line accepted before the connection is treated as broken.
pub const MAX_PENDING_LINE: usize = 4 * 1024 * 1024;

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    max_line: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_PENDING_LINE)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            event: None,
            data: Vec::new(),
            max_line,
        }
    }

    /// Decodes every frame completed by `chunk`. Fails once an unterminated
    /// line outgrows the limit; the decoder is then reset.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseFrame>, ChannelError> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(end) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        if self.buffer.len() > self.max_line {
            let pending = self.buffer.len();
            *self = Self::with_max_line(self.max_line);
            return Err(ChannelError::Interrupted(format!(
                "event line exceeds {} bytes ({pending} pending)",
                self.max_line
            )));
        }
        Ok(frames)
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
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
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame {
            event: event.unwrap_or_else(|| "message".to_string()),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: artifact\nda").unwrap().is_empty());
        let frames = decoder.feed(b"ta: {\"path\":\"a\"}\n\n").unwrap();
        assert_eq!(
            frames,
            vec![SseFrame {
                event: "artifact".into(),
                data: "{\"path\":\"a\"}".into()
            }]
        );
    }

    #[test]
    fn keepalive_comments_are_not_events() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b": keepalive\n\nevent: log\ndata: {}\n\n").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "log");
    }

    #[test]
    fn crlf_and_multi_line_data() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: one\r\ndata: two\r\n\r\n").unwrap();
        assert_eq!(
            frames,
            vec![SseFrame {
                event: "message".into(),
                data: "one\ntwo".into()
            }]
        );
    }

    #[test]
    fn event_without_data_is_dropped() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: status\n\n").unwrap().is_empty());
        // The stale name must not leak into the next frame.
        let frames = decoder.feed(b"data: x\n\n").unwrap();
        assert_eq!(frames[0].event, "message");
    }

    #[test]
    fn oversized_line_breaks_the_connection() {
        let mut decoder = SseDecoder::with_max_line(16);
        assert!(decoder.feed(b"data: 0123456").unwrap().is_empty());
        let err = decoder.feed(b"789abcdef").unwrap_err();
        assert!(matches!(err, ChannelError::Interrupted(_)));

        // The decoder starts clean afterwards.
        let frames = decoder.feed(b"data: ok\n\n").unwrap();
        assert_eq!(frames[0].data, "ok");
    }
}
