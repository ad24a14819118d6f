use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::warn;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::config::parse_bool;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "warn";
const DEFAULT_LOG_FILE: &str = "chat-stream.logs.jsonl";

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogOutput {
    /// Compact lines on stderr; stdout stays free for the chat.
    Console,
    /// JSONL lines appended to this file.
    JsonFile(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LogSettings {
    enabled: bool,
    filter: String,
    output: LogOutput,
}

impl LogSettings {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = [
            "CHAT_STREAM_OBSERVABILITY_ENABLED",
            "CHAT_STREAM_OBSERVABILITY",
        ]
        .into_iter()
        .find_map(|key| lookup(key))
        .map(|value| parse_bool(&value).unwrap_or(true))
        .unwrap_or(true);

        let filter = lookup("CHAT_STREAM_LOG_LEVEL")
            .filter(|level| EnvFilter::try_new(level).is_ok())
            .or_else(|| lookup("RUST_LOG").filter(|level| EnvFilter::try_new(level).is_ok()))
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());

        let output = match lookup("CHAT_STREAM_JSON_LOG_PATH") {
            Some(path) if !path.trim().is_empty() => LogOutput::JsonFile(PathBuf::from(path.trim())),
            _ => LogOutput::Console,
        };

        Self {
            enabled,
            filter,
            output,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Opens the JSONL log file, creating its directory when needed.
fn open_log_file(path: &Path) -> Result<RollingFileAppender, String> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|err| err.to_string())
}

/// Resolved writer for the subscriber.
enum LogWriter {
    Console,
    JsonFile(RollingFileAppender),
}

/// Picks the writer for `output`. A log file that cannot be opened falls back
/// to the console and reports why.
fn resolve_writer(output: &LogOutput) -> (LogWriter, Option<(PathBuf, String)>) {
    match output {
        LogOutput::Console => (LogWriter::Console, None),
        LogOutput::JsonFile(path) => match open_log_file(path) {
            Ok(appender) => (LogWriter::JsonFile(appender), None),
            Err(err) => (LogWriter::Console, Some((path.clone(), err))),
        },
    }
}

fn install(settings: &LogSettings) {
    let (writer, fallback) = resolve_writer(&settings.output);
    match writer {
        LogWriter::JsonFile(appender) => {
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(false)
                .with_writer(appender);
            let _ = tracing_subscriber::registry()
                .with(settings.env_filter())
                .with(json_layer)
                .try_init();
        }
        LogWriter::Console => {
            let console_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr);
            let _ = tracing_subscriber::registry()
                .with(settings.env_filter())
                .with(console_layer)
                .try_init();
        }
    }
    if let Some((path, error)) = fallback {
        warn!(
            path = %path.display(),
            error = %error,
            "cannot open JSON log file, logging to stderr instead"
        );
    }
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `CHAT_STREAM_OBSERVABILITY_ENABLED` / `CHAT_STREAM_OBSERVABILITY`: optional enable/disable flag (default enabled).
/// - `CHAT_STREAM_LOG_LEVEL`: optional level/filter override (`info`, `debug`, etc.).
/// - `RUST_LOG`: filter used when `CHAT_STREAM_LOG_LEVEL` is unset or invalid.
/// - `CHAT_STREAM_JSON_LOG_PATH`: optional log file path. If set, logs are JSONL in that file.
///   If unset, or the file cannot be opened, logs go to stderr in a compact format.
pub fn init_observability() {
    INIT.get_or_init(|| {
        let settings = LogSettings::from_lookup(|key| std::env::var(key).ok());
        if settings.enabled {
            install(&settings);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn init_is_idempotent() {
        init_observability();
        init_observability();
        assert!(INIT.get().is_some());
    }

    #[test]
    fn defaults_to_warn_on_console() {
        let settings = LogSettings::from_lookup(lookup(&[]));
        assert!(settings.enabled);
        assert_eq!(settings.filter, "warn");
        assert_eq!(settings.output, LogOutput::Console);
    }

    #[test]
    fn settings_follow_lookup() {
        let settings = LogSettings::from_lookup(lookup(&[
            ("CHAT_STREAM_OBSERVABILITY", "off"),
            ("CHAT_STREAM_LOG_LEVEL", "chat_stream=debug"),
            ("RUST_LOG", "trace"),
            ("CHAT_STREAM_JSON_LOG_PATH", " logs/chat.jsonl "),
        ]));
        assert!(!settings.enabled);
        assert_eq!(settings.filter, "chat_stream=debug");
        assert_eq!(
            settings.output,
            LogOutput::JsonFile(PathBuf::from("logs/chat.jsonl"))
        );
    }

    #[test]
    fn invalid_level_falls_back_to_rust_log() {
        let settings = LogSettings::from_lookup(lookup(&[
            ("CHAT_STREAM_LOG_LEVEL", "chat_stream=loud"),
            ("RUST_LOG", "info"),
        ]));
        assert_eq!(settings.filter, "info");
    }

    #[test]
    fn unopenable_log_file_falls_back_to_console() {
        let path = PathBuf::from("/proc/no_such_dir/chat.jsonl");
        let (writer, fallback) = resolve_writer(&LogOutput::JsonFile(path.clone()));
        assert!(matches!(writer, LogWriter::Console));
        let (reported, error) = fallback.expect("fallback reason");
        assert_eq!(reported, path);
        assert!(!error.is_empty());
    }

    #[test]
    fn log_file_directory_is_created() {
        let dir = std::env::temp_dir().join(format!("chat-stream-logs-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("chat.jsonl");
        let (writer, fallback) = resolve_writer(&LogOutput::JsonFile(path));
        assert!(matches!(writer, LogWriter::JsonFile(_)));
        assert!(fallback.is_none());
        assert!(dir.join("nested").is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
