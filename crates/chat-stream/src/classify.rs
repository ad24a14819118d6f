use futures::StreamExt as _;
use tracing::debug;

use crate::errors::ChatError;
use crate::session::{ByteStream, StreamSession};

/// Media type that selects stream handling.
pub const EVENT_STREAM_MEDIA_TYPE: &str = "text/event-stream";

/// Response head plus the unread body, as handed over by a transport.
pub struct RawResponse {
    pub status: u16,
    /// Raw `Content-Type` header value, parameters included.
    pub content_type: Option<String>,
    pub body: ByteStream,
}

impl RawResponse {
    pub fn new(status: u16, content_type: Option<String>, body: ByteStream) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }

    /// Builds a response whose body arrives as the given chunks, in order.
    pub fn from_chunks(
        status: u16,
        content_type: Option<&str>,
        chunks: impl IntoIterator<Item = bytes::Bytes>,
    ) -> Self {
        let items: Vec<Result<bytes::Bytes, ChatError>> = chunks.into_iter().map(Ok).collect();
        Self::new(
            status,
            content_type.map(ToOwned::to_owned),
            Box::pin(futures::stream::iter(items)),
        )
    }

    /// Builds a response with a single-chunk body.
    pub fn from_body(status: u16, content_type: Option<&str>, body: impl Into<bytes::Bytes>) -> Self {
        Self::from_chunks(status, content_type, [body.into()])
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<reqwest::Response> for RawResponse {
    fn from(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        let body = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| ChatError::transport(format!("response body read failed: {e}")))
        });
        Self::new(status, content_type, Box::pin(body))
    }
}

/// How a reply should be displayed.
#[derive(Debug)]
pub enum ResponseOutcome {
    /// Complete reply text (also used for rendered server errors).
    Full { text: String },
    /// SSE reply still to be read.
    Stream { session: StreamSession },
}

/// Decides between one-shot and streamed handling for a received response.
///
/// Failure statuses always become `Full` with a rendered error message. A
/// transport error is only returned when reading a success body fails.
pub async fn classify_response(raw: RawResponse) -> Result<ResponseOutcome, ChatError> {
    let success = raw.is_success();
    let RawResponse {
        status,
        content_type,
        body,
    } = raw;
    let media = media_type(content_type.as_deref());

    if !success {
        let text = match read_body(body).await {
            Ok(bytes) => error_text(status, media.as_deref(), &bytes),
            Err(err) => {
                debug!(status, error = %err, "error response body unreadable");
                status_text(status)
            }
        };
        debug!(status, "classified failure response");
        return Ok(ResponseOutcome::Full { text });
    }

    if media.as_deref() == Some(EVENT_STREAM_MEDIA_TYPE) {
        debug!(status, "classified stream response");
        return Ok(ResponseOutcome::Stream {
            session: StreamSession::new(body),
        });
    }

    let bytes = read_body(body).await?;
    debug!(status, body_bytes = bytes.len() as u64, media = ?media, "classified full response");
    Ok(ResponseOutcome::Full {
        text: reply_text(media.as_deref(), &bytes),
    })
}

/// Text shown for a failure status, preferring the backend's `error` field.
pub fn error_text(status: u16, media: Option<&str>, body: &[u8]) -> String {
    if is_json(media)
        && let Ok(value) = serde_json::from_slice::<serde_json::Value>(body)
        && let Some(error) = value.get("error").filter(|v| !v.is_null())
    {
        return format!("Error: {}", json_text(error));
    }
    status_text(status)
}

/// Text of a one-shot success reply.
///
/// JSON bodies yield their `reply` field, or the whole payload when it is
/// missing. Anything else, including JSON that fails to parse, is shown raw.
pub fn reply_text(media: Option<&str>, body: &[u8]) -> String {
    if is_json(media)
        && let Ok(value) = serde_json::from_slice::<serde_json::Value>(body)
    {
        return match value.get("reply").filter(|v| !v.is_null()) {
            Some(reply) => json_text(reply),
            None => value.to_string(),
        };
    }
    String::from_utf8_lossy(body).into_owned()
}

fn status_text(status: u16) -> String {
    format!("Server error ({status})")
}

fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Lowercased media type without parameters.
fn media_type(content_type: Option<&str>) -> Option<String> {
    content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
}

fn is_json(media: Option<&str>) -> bool {
    matches!(media, Some(m) if m == "application/json" || m.ends_with("+json"))
}

async fn read_body(mut body: ByteStream) -> Result<Vec<u8>, ChatError> {
    let mut out = Vec::new();
    while let Some(chunk) = body.next().await {
        out.extend_from_slice(&chunk?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn full_text(raw: RawResponse) -> String {
        match classify_response(raw).await.expect("classify") {
            ResponseOutcome::Full { text } => text,
            ResponseOutcome::Stream { .. } => panic!("expected full outcome"),
        }
    }

    fn failing_body(status: u16, content_type: &str) -> RawResponse {
        let items: Vec<Result<bytes::Bytes, ChatError>> = vec![
            Ok(bytes::Bytes::from_static(b"{\"err")),
            Err(ChatError::transport("reset")),
        ];
        RawResponse::new(
            status,
            Some(content_type.to_string()),
            Box::pin(futures::stream::iter(items)),
        )
    }

    #[tokio::test]
    async fn json_error_field_is_rendered() {
        let raw = RawResponse::from_body(401, Some("application/json"), r#"{"error":"bad key"}"#);
        assert_eq!(full_text(raw).await, "Error: bad key");
    }

    #[tokio::test]
    async fn non_string_error_field_is_stringified() {
        let raw = RawResponse::from_body(
            422,
            Some("application/json"),
            r#"{"error":{"code":7}}"#,
        );
        assert_eq!(full_text(raw).await, r#"Error: {"code":7}"#);
    }

    #[tokio::test]
    async fn error_without_json_falls_back_to_status() {
        let raw = RawResponse::from_body(502, Some("text/html"), "<h1>Bad gateway</h1>");
        assert_eq!(full_text(raw).await, "Server error (502)");

        let raw = RawResponse::from_body(500, Some("application/json"), "not json");
        assert_eq!(full_text(raw).await, "Server error (500)");

        let raw = RawResponse::from_body(400, Some("application/json"), r#"{"detail":"x"}"#);
        assert_eq!(full_text(raw).await, "Server error (400)");
    }

    #[tokio::test]
    async fn unreadable_error_body_falls_back_to_status() {
        assert_eq!(
            full_text(failing_body(503, "application/json")).await,
            "Server error (503)"
        );
    }

    #[tokio::test]
    async fn error_status_with_sse_content_type_is_still_full() {
        let raw = RawResponse::from_body(500, Some("text/event-stream"), "data: nope\n\n");
        assert_eq!(full_text(raw).await, "Server error (500)");
    }

    #[tokio::test]
    async fn json_reply_field_is_extracted() {
        let raw = RawResponse::from_body(200, Some("application/json"), r#"{"reply":"hi"}"#);
        assert_eq!(full_text(raw).await, "hi");
    }

    #[tokio::test]
    async fn json_without_reply_is_stringified() {
        let raw = RawResponse::from_body(
            200,
            Some("application/json; charset=utf-8"),
            r#"{"status":"ok"}"#,
        );
        assert_eq!(full_text(raw).await, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn plain_text_and_broken_json_are_shown_raw() {
        let raw = RawResponse::from_body(200, Some("text/plain"), "just text");
        assert_eq!(full_text(raw).await, "just text");

        let raw = RawResponse::from_body(200, None, "no header");
        assert_eq!(full_text(raw).await, "no header");

        let raw = RawResponse::from_body(200, Some("application/json"), "{broken");
        assert_eq!(full_text(raw).await, "{broken");
    }

    #[tokio::test]
    async fn unreadable_success_body_is_a_transport_error() {
        let err = classify_response(failing_body(200, "application/json"))
            .await
            .expect_err("should fail");
        assert_eq!(err, ChatError::transport("reset"));
    }

    #[tokio::test]
    async fn event_stream_yields_unread_session() {
        let raw = RawResponse::from_chunks(
            200,
            Some("Text/Event-Stream; charset=utf-8"),
            [
                bytes::Bytes::from_static(b"data:a\n\n"),
                bytes::Bytes::from_static(b"data:[DONE]\n\n"),
            ],
        );
        let session = match classify_response(raw).await.expect("classify") {
            ResponseOutcome::Stream { session } => session,
            ResponseOutcome::Full { text } => panic!("expected stream, got {text}"),
        };
        assert_eq!(session.state().full_text(), "");
        assert_eq!(session.run(|_, _| {}).await.expect("run"), "a");
    }

    #[test]
    fn media_type_ignores_parameters_and_case() {
        assert_eq!(
            media_type(Some(" Application/JSON ; charset=utf-8")).as_deref(),
            Some("application/json")
        );
        assert_eq!(media_type(Some("")), None);
        assert!(is_json(Some("application/problem+json")));
        assert!(!is_json(Some("text/plain")));
    }
}
