use std::sync::Arc;

use tracing::{debug, warn};

use crate::classify::{ResponseOutcome, classify_response};
use crate::errors::ChatError;
use crate::sink::ChatSink;
use crate::transport::{ChatRequest, ChatTransport};

/// Runs one user send at a time: request, classification, and rendering.
#[derive(Clone)]
pub struct ChatOrchestrator {
    transport: Arc<dyn ChatTransport>,
}

impl ChatOrchestrator {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    /// Sends `message` and classifies the response.
    pub async fn request(&self, message: &str) -> Result<ResponseOutcome, ChatError> {
        let request = ChatRequest::new(message);
        let raw = self.transport.send(&request).await?;
        debug!(
            status = raw.status,
            content_type = ?raw.content_type,
            "chat response received"
        );
        classify_response(raw).await
    }

    /// Sends `message` and returns the final reply text.
    ///
    /// `on_chunk(chunk, full_text_so_far)` runs for every streamed chunk. A
    /// one-shot reply is reported as a single call with the whole text.
    /// Rendered server errors are returned as `Ok` text.
    pub async fn send_and_stream<F>(&self, message: &str, mut on_chunk: F) -> Result<String, ChatError>
    where
        F: FnMut(&str, &str),
    {
        match self.request(message).await? {
            ResponseOutcome::Full { text } => {
                on_chunk(&text, &text);
                Ok(text)
            }
            ResponseOutcome::Stream { session } => session.run(on_chunk).await,
        }
    }

    /// Handles one user send end to end and renders the result into `sink`.
    ///
    /// Blank input is ignored and returns `None`. Otherwise the user message
    /// and a bot placeholder are rendered, and the placeholder ends up
    /// holding the final reply or an `Error: ...` line. The displayed text is
    /// returned; errors are never propagated.
    pub async fn send<S: ChatSink>(&self, input: &str, sink: &mut S) -> Option<String> {
        let message = input.trim();
        if message.is_empty() {
            debug!("ignoring blank chat input");
            return None;
        }
        let reply_id = uuid::Uuid::new_v4();
        debug!(reply_id = %reply_id, message_len = message.len() as u64, "chat send started");

        sink.render_user(message);
        let handle = sink.render_placeholder();

        let shown = match self.reply_into(message, sink, &handle).await {
            Ok(text) => {
                debug!(reply_id = %reply_id, reply_len = text.len() as u64, "chat send completed");
                text
            }
            Err(err) => {
                warn!(reply_id = %reply_id, error = %err, "chat send failed");
                let text = err.display_text();
                sink.update(&handle, &text);
                text
            }
        };
        Some(shown)
    }

    async fn reply_into<S: ChatSink>(
        &self,
        message: &str,
        sink: &mut S,
        handle: &S::Handle,
    ) -> Result<String, ChatError> {
        match self.request(message).await? {
            ResponseOutcome::Full { text } => {
                sink.update(handle, &text);
                Ok(text)
            }
            ResponseOutcome::Stream { session } => {
                sink.update(handle, "");
                session.run(|_, full_text| sink.update(handle, full_text)).await
            }
        }
    }
}
