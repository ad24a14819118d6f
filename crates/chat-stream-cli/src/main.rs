//! Terminal chat client: sends each message to the chat backend and prints
//! the reply as it streams in.

mod terminal;

use std::sync::Arc;
use std::time::Duration;

use chat_stream::prelude::*;
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _, BufReader};

use crate::terminal::TerminalSink;

#[derive(Debug, Parser)]
#[command(name = "chat-stream", about = "Chat with a streaming backend from the terminal")]
struct Cli {
    /// Backend base URL (overrides CHAT_API_BASE_URL).
    #[arg(long)]
    base_url: Option<String>,
    /// Use the one-shot reply endpoint instead of the SSE stream.
    #[arg(long)]
    no_stream: bool,
    /// HTTP timeout in seconds (overrides CHAT_TIMEOUT_SECS).
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Check backend health and exit.
    #[arg(long)]
    health: bool,
    /// Message to send. Starts a prompt loop on stdin when omitted.
    message: Vec<String>,
}

impl Cli {
    fn client_config(&self) -> Result<ChatClientConfig, ChatError> {
        let mut config = ChatClientConfig::from_env()?;
        if let Some(base_url) = &self.base_url {
            config = config.base_url(base_url.clone());
        }
        if self.no_stream {
            config = config.streaming(false);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    chat_stream::init_observability();

    let cli = Cli::parse();
    let transport = Arc::new(ReqwestTransport::new(cli.client_config()?)?);

    if cli.health {
        println!("{}", transport.health().await?);
        return Ok(());
    }

    let orchestrator = ChatOrchestrator::new(transport);

    if !cli.message.is_empty() {
        let mut sink = TerminalSink::new(std::io::stdout());
        orchestrator.send(&cli.message.join(" "), &mut sink).await;
        sink.finish_reply();
        return Ok(());
    }

    let mut sink = TerminalSink::interactive(std::io::stdout());
    prompt_loop(&orchestrator, BufReader::new(tokio::io::stdin()), &mut sink).await?;
    Ok(())
}

/// Sends each input line until end of input. Returns the number of lines read.
async fn prompt_loop<R, W>(
    orchestrator: &ChatOrchestrator,
    input: R,
    sink: &mut TerminalSink<W>,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: std::io::Write,
{
    let mut lines = input.lines();
    let mut read = 0;
    loop {
        sink.prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        read += 1;
        orchestrator.send(&line, sink).await;
        sink.finish_reply();
    }
    Ok(read)
}
