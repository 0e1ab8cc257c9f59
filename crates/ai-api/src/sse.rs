//! Incremental Server-Sent Events parser shared by both HTTP clients.
//!
//! The native client feeds it line by line from a blocking reader, the
//! OpenAI-compatible client feeds it arbitrary byte chunks. Either way an
//! event is only produced once its terminating blank line has arrived.

/// Sentinel `data:` payload that ends an OpenAI-compatible stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A single SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event_type: Option<String>,
    pub data: String,
}

impl SseEvent {
    /// Whether this is the `data: [DONE]` terminator.
    pub fn is_done(&self) -> bool {
        self.data.trim() == DONE_SENTINEL
    }
}

/// Buffers partial input and splits it into complete events.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    /// Trailing bytes of an incomplete UTF-8 sequence from the last chunk.
    partial: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of text and return any events it completes.
    pub fn feed(&mut self, chunk: &str) -> Vec<SseEvent> {
        self.buffer.push_str(chunk);
        // A `\r\n` pair may straddle two chunks, so normalize the whole buffer.
        if self.buffer.contains("\r\n") {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let block: String = self.buffer.drain(..pos + 2).collect();
            if let Some(event) = parse_block(&block[..pos]) {
                events.push(event);
            }
        }
        events
    }

    /// Feed raw bytes. A multi-byte character split across chunks is held
    /// back until its remaining bytes arrive.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.partial.extend_from_slice(bytes);
        let complete = match std::str::from_utf8(&self.partial) {
            Ok(_) => self.partial.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => self.partial.len(),
        };
        let rest = self.partial.split_off(complete);
        let text = String::from_utf8_lossy(&self.partial).into_owned();
        self.partial = rest;
        self.feed(&text)
    }

    /// Parse whatever is left once the input has ended without a final
    /// blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.partial.is_empty() {
            let tail = std::mem::take(&mut self.partial);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }
        let rest = std::mem::take(&mut self.buffer).replace("\r\n", "\n");
        parse_block(rest.trim_end_matches(['\n', '\r']))
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event_type = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in block.lines() {
        if line.starts_with(':') {
            continue;
        }
        match line.split_once(':') {
            Some((field, value)) => {
                let value = value.strip_prefix(' ').unwrap_or(value);
                match field {
                    "event" => event_type = Some(value.to_string()),
                    "data" => data_lines.push(value),
                    _ => {}
                }
            }
            None if line == "data" => data_lines.push(""),
            None => {}
        }
    }

    if data_lines.is_empty() {
        return None;
    }

    Some(SseEvent {
        event_type,
        data: data_lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_event() {
        let mut parser = SseParser::new();
        let events = parser.feed("event: content_block_delta\ndata: {\"a\":1}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type.as_deref(), Some("content_block_delta"));
        assert_eq!(events[0].data, "{\"a\":1}");
    }

    #[test]
    fn data_only_events() {
        let mut parser = SseParser::new();
        let events = parser.feed("data: one\n\ndata: two\n\n");
        assert_eq!(events.len(), 2);
        assert!(events[0].event_type.is_none());
        assert_eq!(events[1].data, "two");
    }

    #[test]
    fn event_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed("data: {\"cho").is_empty());
        assert!(parser.feed("ices\":[]}\n").is_empty());
        let events = parser.feed("\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"choices\":[]}");
    }

    #[test]
    fn crlf_line_endings() {
        let mut parser = SseParser::new();
        let events = parser.feed("data: hello\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn crlf_pair_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed("data: hello\r").is_empty());
        assert!(parser.feed("\n\r").is_empty());
        let events = parser.feed("\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn multibyte_char_split_across_byte_chunks() {
        let body = "data: Привет\n\n".as_bytes();
        // Split after the first byte of 'П'.
        let (head, tail) = body.split_at(7);
        let mut parser = SseParser::new();
        assert!(parser.feed_bytes(head).is_empty());
        let events = parser.feed_bytes(tail);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "Привет");
    }

    #[test]
    fn byte_by_byte_feed_keeps_text_intact() {
        let body = "data: 日本語 ok\r\n\r\n".as_bytes();
        let mut parser = SseParser::new();
        let mut events = Vec::new();
        for byte in body {
            events.extend(parser.feed_bytes(std::slice::from_ref(byte)));
        }
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "日本語 ok");
    }

    #[test]
    fn comments_are_skipped() {
        let mut parser = SseParser::new();
        let events = parser.feed(": keep-alive\n\n: again\ndata: x\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }

    #[test]
    fn multi_line_data_is_joined() {
        let mut parser = SseParser::new();
        let events = parser.feed("data: a\ndata: b\n\n");
        assert_eq!(events[0].data, "a\nb");
    }

    #[test]
    fn done_sentinel() {
        let mut parser = SseParser::new();
        let events = parser.feed("data: [DONE]\n\n");
        assert!(events[0].is_done());
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut parser = SseParser::new();
        assert!(parser.feed("data: tail\n").is_empty());
        let event = parser.finish().expect("trailing event");
        assert_eq!(event.data, "tail");
        assert!(parser.finish().is_none());
    }
}
