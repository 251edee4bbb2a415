//! Terminal stand-in for a chat client.
//!
//! Every stdin line is a direct message from a peer into one conversation;
//! lines starting with `/` are commands for the local user.

use std::sync::Arc;

use {
    afk_auto_reply::{AutoResponder, Command, commands},
    afk_channels::{ChannelEvent, ChannelEventSink, ChannelOutbound, NoticeLevel},
    afk_common::types::{InboundMessage, MessageAuthor, MessageCreateEvent, OutboundMessage},
    async_trait::async_trait,
    tokio::io::{AsyncBufReadExt, BufReader},
    tracing::{debug, info},
};

pub const CONSOLE_CHANNEL: &str = "console";
pub const CONSOLE_PEER: &str = "console-peer";

/// Prints outbound traffic and notices to the terminal.
#[derive(Debug, Default)]
pub struct ConsoleChannel;

#[async_trait]
impl ChannelOutbound for ConsoleChannel {
    async fn send_message(
        &self,
        channel_id: &str,
        message: &OutboundMessage,
    ) -> afk_channels::Result<()> {
        println!("[{channel_id}] assistant: {}", message.content);
        Ok(())
    }

    async fn send_typing(&self, channel_id: &str) -> afk_channels::Result<()> {
        eprintln!("[{channel_id}] assistant is typing...");
        Ok(())
    }

    async fn stop_typing(&self, channel_id: &str) -> afk_channels::Result<()> {
        debug!(channel_id, "typing cleared");
        Ok(())
    }
}

#[async_trait]
impl ChannelEventSink for ConsoleChannel {
    async fn emit(&self, event: ChannelEvent) {
        let marker = match event.level() {
            NoticeLevel::Success => "notice",
            NoticeLevel::Failure => "warning",
        };
        eprintln!("({marker}) {}", event.text());
    }
}

/// What a console line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Message(String),
    Command(Command),
    Status,
    Quit,
    Invalid(String),
}

fn classify(line: &str) -> Line {
    let trimmed = line.trim();
    match trimmed {
        "/quit" | "/exit" => Line::Quit,
        "/status" => Line::Status,
        _ if trimmed.starts_with('/') => match Command::parse(trimmed) {
            Ok(command) => Line::Command(command),
            Err(e) => Line::Invalid(e.to_string()),
        },
        _ => Line::Message(line.to_string()),
    }
}

fn inbound(seq: u64, content: String) -> MessageCreateEvent {
    MessageCreateEvent::new(InboundMessage {
        id: format!("console-{seq}"),
        content,
        author: MessageAuthor {
            id: CONSOLE_PEER.into(),
            username: Some("peer".into()),
            bot: false,
        },
        channel_id: CONSOLE_CHANNEL.into(),
        guild_id: None,
    })
}

/// Feed stdin into `responder` until EOF, `/quit` or Ctrl-C.
pub async fn run(responder: Arc<AutoResponder>) -> anyhow::Result<()> {
    eprintln!(
        "afk console: type messages as the peer; /afk [reason], /afk-global, /status, /quit"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seq = 0u64;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                None
            },
        };
        let Some(line) = line else { break };

        match classify(&line) {
            Line::Quit => break,
            Line::Status => {
                let state = responder.state();
                eprintln!(
                    "status: {:?} (global mode: {}, enabled: {:?}, in flight: {})",
                    responder.status(CONSOLE_CHANNEL),
                    state.global_mode(),
                    state.enabled_channels(),
                    state.processing_count(),
                );
            },
            Line::Command(command) => {
                let confirmation =
                    commands::execute(&responder, &command, Some(CONSOLE_CHANNEL)).await;
                eprintln!("{confirmation}");
            },
            Line::Invalid(reason) => eprintln!("{reason}"),
            Line::Message(content) => {
                seq += 1;
                println!("[{CONSOLE_CHANNEL}] peer: {}", content.trim());
                if let Some(reason) = responder.handle_event(&inbound(seq, content)).rejection() {
                    eprintln!("(ignored: {})", reason.as_str());
                }
            },
        }
    }

    responder.shutdown().await;
    Ok(())
}
