//! Streaming chat client core.
//!
//! A message is POSTed as `{"message": ...}`; the reply comes back either as
//! a one-shot JSON/text body or as a server-sent-event stream of `data:`
//! frames ending in `data: [DONE]`. Streamed chunks are decoded incrementally
//! and rendered through a caller-supplied [`ChatSink`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chat_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ChatError> {
//! let transport = ReqwestTransport::new(ChatClientConfig::new("http://127.0.0.1:5000"))?;
//! let orchestrator = ChatOrchestrator::new(Arc::new(transport));
//!
//! let reply = orchestrator
//!     .send_and_stream("What's the weather like?", |chunk, _full| print!("{chunk}"))
//!     .await?;
//! println!("\n({} bytes)", reply.len());
//! # Ok(())
//! # }
//! ```

/// Response mode selection over a received response head.
pub mod classify;
/// HTTP client configuration.
pub mod config;
/// Public error type.
pub mod errors;
/// SSE frame splitting and decoding.
pub mod frame;
/// Logging setup.
pub mod observability;
/// Per-send flow from input to rendered reply.
pub mod orchestrator;
/// Common imports for typical usage.
pub mod prelude;
/// Stream state and the transport-bound stream session.
pub mod session;
/// UI sink contract.
pub mod sink;
/// Transport contract and the reqwest implementation.
pub mod transport;
mod utf8;

pub use classify::{EVENT_STREAM_MEDIA_TYPE, RawResponse, ResponseOutcome, classify_response};
pub use config::ChatClientConfig;
pub use errors::ChatError;
pub use frame::{EventFrame, FrameBuffer, decode_frame};
pub use observability::init_observability;
pub use orchestrator::ChatOrchestrator;
pub use session::{ByteStream, StreamSession, StreamState};
pub use sink::{ChatSink, Role, TranscriptEntry, TranscriptSink};
pub use transport::{ChatRequest, ChatTransport, ReqwestTransport};
pub use utf8::Utf8Decoder;
