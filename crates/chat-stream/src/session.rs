use std::fmt;
use std::pin::Pin;

use futures::StreamExt as _;
use tracing::{debug, trace, warn};

use crate::errors::ChatError;
use crate::frame::{EventFrame, FrameBuffer, decode_frame};
use crate::utf8::Utf8Decoder;

/// Response body as a stream of byte chunks.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, ChatError>> + Send + 'static>>;

/// Payload prefix the backend uses to report a generation failure mid-stream.
const SERVER_ERROR_MARKER: &str = "[ERROR]";

/// Transport-free state of one streamed reply.
///
/// Every read step takes this by `&mut`, so the splitter and decoder can be
/// driven directly in tests without a network body.
#[derive(Debug, Default, Clone)]
pub struct StreamState {
    frames: FrameBuffer,
    decoder: Utf8Decoder,
    full_text: String,
    finished: bool,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes raw body bytes and processes the resulting text.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<EventFrame> {
        if self.finished {
            return Vec::new();
        }
        let text = self.decoder.decode(bytes);
        self.push_text(&text)
    }

    /// Processes one decoded fragment and returns the frames it produced.
    ///
    /// Data chunks are appended to the accumulated text before being returned.
    /// After the sentinel nothing else is processed, including frames that
    /// were already buffered behind it.
    pub fn push_text(&mut self, fragment: &str) -> Vec<EventFrame> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }
        for frame in self.frames.push(fragment) {
            match decode_frame(&frame) {
                Some(EventFrame::Terminator) => {
                    self.finished = true;
                    events.push(EventFrame::Terminator);
                    break;
                }
                Some(EventFrame::DataChunk(text)) => {
                    self.full_text.push_str(&text);
                    events.push(EventFrame::DataChunk(text));
                }
                None => {}
            }
        }
        events
    }

    /// Handles transport end-of-data: flushes the decoder and processes any
    /// frame that completes.
    ///
    /// A trailing frame without its blank-line terminator is discarded.
    pub fn end_of_input(&mut self) -> Vec<EventFrame> {
        let tail = self.decoder.finish();
        let events = if tail.is_empty() {
            Vec::new()
        } else {
            self.push_text(&tail)
        };
        if !self.finished && !self.frames.remainder().trim().is_empty() {
            debug!(
                remainder_len = self.frames.remainder().len() as u64,
                "discarding unterminated SSE frame at end of stream"
            );
        }
        events
    }

    /// Accumulated reply text so far.
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    /// Whether the `[DONE]` sentinel has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Text buffered but not yet resolved into a frame.
    pub fn pending(&self) -> &str {
        self.frames.remainder()
    }

    pub fn into_full_text(self) -> String {
        self.full_text
    }
}

/// A streamed reply bound to its unread response body.
pub struct StreamSession {
    state: StreamState,
    transport: ByteStream,
}

impl fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSession")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl StreamSession {
    /// Creates an empty session that will read from `transport`.
    pub fn new(transport: ByteStream) -> Self {
        Self {
            state: StreamState::new(),
            transport,
        }
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Reads the body until the sentinel or end-of-data and returns the full reply.
    ///
    /// `on_chunk(chunk, full_text_so_far)` runs once per data chunk, in frame
    /// order. Reaching end-of-data without the sentinel is a normal completion.
    pub async fn run<F>(mut self, mut on_chunk: F) -> Result<String, ChatError>
    where
        F: FnMut(&str, &str),
    {
        let mut chunks = 0_u64;
        while !self.state.is_finished() {
            match self.transport.next().await {
                Some(Ok(bytes)) => {
                    trace!(bytes = bytes.len() as u64, "stream read");
                    let events = self.state.push_bytes(&bytes);
                    chunks += deliver(&self.state, &events, &mut on_chunk);
                }
                Some(Err(err)) => {
                    debug!(chunks, error = %err, "stream read failed");
                    return Err(err);
                }
                None => {
                    let events = self.state.end_of_input();
                    chunks += deliver(&self.state, &events, &mut on_chunk);
                    if !self.state.is_finished() {
                        debug!(chunks, "stream ended without [DONE] sentinel");
                    }
                    break;
                }
            }
        }
        debug!(
            chunks,
            reply_len = self.state.full_text().len() as u64,
            "stream session complete"
        );
        Ok(self.state.into_full_text())
    }
}

/// Invokes `on_chunk` for each data chunk in `events`.
///
/// `state` already holds every chunk of the batch, so the cumulative text for
/// each callback is a prefix of `state.full_text()`.
fn deliver<F>(state: &StreamState, events: &[EventFrame], on_chunk: &mut F) -> u64
where
    F: FnMut(&str, &str),
{
    let batch_len: usize = events
        .iter()
        .map(|event| match event {
            EventFrame::DataChunk(text) => text.len(),
            EventFrame::Terminator => 0,
        })
        .sum();
    let full_text = state.full_text();
    let mut end = full_text.len() - batch_len;
    let mut delivered = 0;
    for event in events {
        if let EventFrame::DataChunk(text) = event {
            if text.starts_with(SERVER_ERROR_MARKER) {
                warn!(payload = %text, "backend reported an error inside the stream");
            }
            end += text.len();
            on_chunk(text, &full_text[..end]);
            delivered += 1;
        }
    }
    delivered
}
