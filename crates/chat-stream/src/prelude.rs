//! Common imports for typical client usage.
pub use crate::{
    ChatClientConfig, ChatError, ChatOrchestrator, ChatRequest, ChatSink, ChatTransport,
    ReqwestTransport, ResponseOutcome, StreamSession, TranscriptSink,
};
