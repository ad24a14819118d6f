use tracing::trace;

/// Prefix a frame must carry to produce a payload.
pub const DATA_PREFIX: &str = "data:";
/// Payload that ends the stream on purpose.
pub const DONE_SENTINEL: &str = "[DONE]";

const FRAME_DELIMITER: &str = "\n\n";

/// One decoded SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFrame {
    /// Text payload to append to the reply.
    DataChunk(String),
    /// The `[DONE]` sentinel.
    Terminator,
}

/// Accumulates decoded text and splits it into complete blank-line-delimited frames.
///
/// Whatever follows the last delimiter stays buffered until a later fragment
/// completes it.
#[derive(Debug, Default, Clone)]
pub struct FrameBuffer {
    buf: String,
}

impl FrameBuffer {
    /// Appends `fragment` and returns every frame it completed, oldest first.
    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        self.buf.push_str(fragment);
        let mut frames = Vec::new();
        while let Some(idx) = self.buf.find(FRAME_DELIMITER) {
            frames.push(self.buf[..idx].to_string());
            self.buf.drain(..idx + FRAME_DELIMITER.len());
        }
        frames
    }

    /// Text not yet resolved into a complete frame.
    pub fn remainder(&self) -> &str {
        &self.buf
    }
}

/// Decodes one complete frame.
///
/// Returns `None` for frames without the `data:` prefix (comments, other
/// event types). Those are dropped on purpose and never reach the reply.
pub fn decode_frame(frame: &str) -> Option<EventFrame> {
    let trimmed = frame.trim();
    let Some(rest) = trimmed.strip_prefix(DATA_PREFIX) else {
        trace!(frame_len = frame.len() as u64, "dropping SSE frame without data prefix");
        return None;
    };
    let payload = rest.trim_start();
    if payload == DONE_SENTINEL {
        Some(EventFrame::Terminator)
    } else {
        Some(EventFrame::DataChunk(payload.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_buffer_keeps_partial_frame_until_delimiter() {
        let mut buffer = FrameBuffer::default();
        assert!(buffer.push("data:Hel").is_empty());
        assert_eq!(buffer.remainder(), "data:Hel");
        assert_eq!(buffer.push("lo\n\n"), vec!["data:Hello".to_string()]);
        assert_eq!(buffer.remainder(), "");
    }

    #[test]
    fn frame_buffer_handles_delimiter_split_across_fragments() {
        let mut buffer = FrameBuffer::default();
        assert!(buffer.push("data:a\n").is_empty());
        assert_eq!(
            buffer.push("\ndata:b\n\ndata:c"),
            vec!["data:a".to_string(), "data:b".to_string()]
        );
        assert_eq!(buffer.remainder(), "data:c");
    }

    #[test]
    fn decode_strips_prefix_and_leading_whitespace() {
        assert_eq!(
            decode_frame("data:   hello world"),
            Some(EventFrame::DataChunk("hello world".into()))
        );
        assert_eq!(
            decode_frame("\n data:x  \n"),
            Some(EventFrame::DataChunk("x".into()))
        );
    }

    #[test]
    fn decode_recognizes_sentinel_only_exactly() {
        assert_eq!(decode_frame("data: [DONE]"), Some(EventFrame::Terminator));
        assert_eq!(decode_frame("data:[DONE]"), Some(EventFrame::Terminator));
        assert_eq!(
            decode_frame("data: [DONE] soon"),
            Some(EventFrame::DataChunk("[DONE] soon".into()))
        );
    }

    #[test]
    fn whitespace_only_payload_is_an_empty_chunk() {
        assert_eq!(
            decode_frame("data:    "),
            Some(EventFrame::DataChunk(String::new()))
        );
    }

    #[test]
    fn frames_without_data_prefix_are_dropped() {
        assert_eq!(decode_frame(": keep-alive"), None);
        assert_eq!(decode_frame("event: ping"), None);
        assert_eq!(decode_frame(""), None);
        assert_eq!(decode_frame("Data: shouting"), None);
    }
}
