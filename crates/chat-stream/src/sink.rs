//! UI sink abstraction for decoupling the chat flow from presentation.
//!
//! The orchestrator only renders through `ChatSink`; terminals, GUIs and
//! tests each bring their own implementation.

/// Receives everything the user should see for a conversation.
pub trait ChatSink {
    /// Identifies one rendered bot message so it can be updated later.
    type Handle;

    /// Shows the user's message.
    fn render_user(&mut self, text: &str);

    /// Shows an empty bot message and returns a handle to it.
    fn render_placeholder(&mut self) -> Self::Handle;

    /// Replaces the whole text of the bot message behind `handle`.
    fn update(&mut self, handle: &Self::Handle, text: &str);
}

/// Who wrote a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// One message as currently displayed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
}

/// In-memory sink that keeps the displayed conversation.
///
/// Every update is also recorded, so callers can replay how a reply grew.
#[derive(Debug, Default, Clone)]
pub struct TranscriptSink {
    entries: Vec<TranscriptEntry>,
    updates: Vec<(usize, String)>,
}

impl TranscriptSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages in display order.
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Every `(entry index, text)` update in call order.
    pub fn updates(&self) -> &[(usize, String)] {
        &self.updates
    }
}

impl ChatSink for TranscriptSink {
    type Handle = usize;

    fn render_user(&mut self, text: &str) {
        self.entries.push(TranscriptEntry {
            role: Role::User,
            text: text.to_string(),
        });
    }

    fn render_placeholder(&mut self) -> usize {
        self.entries.push(TranscriptEntry {
            role: Role::Bot,
            text: String::new(),
        });
        self.entries.len() - 1
    }

    fn update(&mut self, handle: &usize, text: &str) {
        if let Some(entry) = self.entries.get_mut(*handle) {
            entry.text.clear();
            entry.text.push_str(text);
        }
        self.updates.push((*handle, text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_replaces_placeholder_text() {
        let mut sink = TranscriptSink::new();
        sink.render_user("hi");
        let handle = sink.render_placeholder();
        sink.update(&handle, "Hel");
        sink.update(&handle, "Hello");
        assert_eq!(
            sink.entries(),
            &[
                TranscriptEntry {
                    role: Role::User,
                    text: "hi".into()
                },
                TranscriptEntry {
                    role: Role::Bot,
                    text: "Hello".into()
                },
            ]
        );
        assert_eq!(sink.updates().len(), 2);
    }

    #[test]
    fn entries_serialize_with_lowercase_role() {
        let entry = TranscriptEntry {
            role: Role::Bot,
            text: "Hello".into(),
        };
        assert_eq!(
            serde_json::to_value(&entry).expect("serialize"),
            serde_json::json!({"role": "bot", "text": "Hello"})
        );
    }
}
