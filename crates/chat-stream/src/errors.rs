/// Errors returned by the chat client before they are rendered for the user.
///
/// Malformed UTF-8 never shows up here (it is replaced with U+FFFD by the
/// stream decoder), and neither do SSE frames without a `data:` prefix (they
/// are dropped by the frame decoder).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Network failure before the response head arrived or while reading the body.
    #[error("transport error: {0}")]
    Transport(String),
    /// Backend answered with a non-success status.
    #[error("server error ({status}): {message}")]
    Http { status: u16, message: String },
}

impl ChatError {
    /// Creates a transport-level error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates an HTTP status error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Text shown in the reply placeholder when a send fails.
    pub fn display_text(&self) -> String {
        format!("Error: {self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_text_prefixes_error() {
        let err = ChatError::transport("connection refused");
        assert_eq!(err.display_text(), "Error: transport error: connection refused");
    }

    #[test]
    fn http_error_mentions_status() {
        let err = ChatError::http(503, "unavailable");
        assert_eq!(err.to_string(), "server error (503): unavailable");
    }
}
