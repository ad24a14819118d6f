use std::io::Write;

use chat_stream::ChatSink;
use tracing::warn;

const USER_PREFIX: &str = "you> ";
const BOT_PREFIX: &str = "bot> ";

/// Identifies a reply printed by `TerminalSink`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyHandle(u64);

/// `ChatSink` that prints the conversation to a terminal.
///
/// Cumulative updates are printed as appended text. An update that does not
/// extend what is already on screen (an error replacing a partial reply) is
/// printed on a fresh line.
pub struct TerminalSink<W: Write> {
    out: W,
    echo_user: bool,
    next_id: u64,
    current: Option<(u64, String)>,
}

impl<W: Write> TerminalSink<W> {
    /// Sink that echoes user messages (one-shot mode).
    pub fn new(out: W) -> Self {
        Self {
            out,
            echo_user: true,
            next_id: 0,
            current: None,
        }
    }

    /// Sink for a prompt loop, where the user's typing is already on screen.
    pub fn interactive(out: W) -> Self {
        Self {
            echo_user: false,
            ..Self::new(out)
        }
    }

    pub fn prompt(&mut self) {
        self.write(USER_PREFIX);
    }

    /// Ends the line of the current reply, if any.
    pub fn finish_reply(&mut self) {
        if self.current.take().is_some() {
            self.write("\n");
        }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        let result = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush());
        if let Err(err) = result {
            warn!(error = %err, "terminal write failed");
        }
    }
}

impl<W: Write> ChatSink for TerminalSink<W> {
    type Handle = ReplyHandle;

    fn render_user(&mut self, text: &str) {
        if self.echo_user {
            self.write(&format!("{USER_PREFIX}{text}\n"));
        }
    }

    fn render_placeholder(&mut self) -> ReplyHandle {
        self.finish_reply();
        self.next_id += 1;
        self.current = Some((self.next_id, String::new()));
        self.write(BOT_PREFIX);
        ReplyHandle(self.next_id)
    }

    fn update(&mut self, handle: &ReplyHandle, text: &str) {
        let output = match &self.current {
            Some((id, shown)) if *id == handle.0 => match text.strip_prefix(shown.as_str()) {
                Some(appended) => appended.to_string(),
                None => format!("\n{BOT_PREFIX}{text}"),
            },
            _ => return,
        };
        if !output.is_empty() {
            self.write(&output);
        }
        if let Some((_, shown)) = self.current.as_mut() {
            shown.clear();
            shown.push_str(text);
        }
    }
}
