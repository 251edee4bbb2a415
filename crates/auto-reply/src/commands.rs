//! User-invocable `afk` and `afk-global` commands.

use crate::{
    error::{Context, Error, Result},
    responder::AutoResponder,
    text,
};

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Toggle the current channel, optionally recording why the user is away.
    Toggle { away_reason: Option<String> },
    /// Toggle global mode.
    ToggleGlobal,
}

impl Command {
    pub const TOGGLE: &'static str = "afk";
    pub const TOGGLE_GLOBAL: &'static str = "afk-global";

    /// Parse `afk [reason]` or `afk-global`; a leading `/` is accepted.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let input = input.strip_prefix('/').unwrap_or(input).trim_start();
        let name = input.split_whitespace().next().context("empty command")?;
        let rest = input[name.len()..].trim();

        match name {
            Self::TOGGLE => Ok(Self::Toggle {
                away_reason: (!rest.is_empty()).then(|| rest.to_string()),
            }),
            Self::TOGGLE_GLOBAL if rest.is_empty() => Ok(Self::ToggleGlobal),
            Self::TOGGLE_GLOBAL => Err(Error::message(format!(
                "{} takes no arguments",
                Self::TOGGLE_GLOBAL
            ))),
            _ => Err(Error::UnknownCommand(name.to_string())),
        }
    }
}

/// Run `command` and return the confirmation to show the user.
///
/// `current_channel` is the conversation the command was issued from.
pub async fn execute(
    responder: &AutoResponder,
    command: &Command,
    current_channel: Option<&str>,
) -> String {
    let name = responder.user().display_name().to_string();
    let custom_key = responder.config().uses_custom_key();

    match command {
        Command::Toggle { away_reason } => {
            let Some(channel_id) = current_channel.filter(|c| !c.is_empty()) else {
                return text::NO_CHANNEL_SELECTED.to_string();
            };
            let enabled = responder
                .toggle_channel(channel_id, away_reason.as_deref())
                .await;
            text::toggle_confirmation(&name, responder.state().global_mode(), enabled, custom_key)
        },
        Command::ToggleGlobal => {
            let enabled = responder.toggle_global().await;
            text::global_confirmation(&name, enabled, custom_key)
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use {
        afk_channels::{ChannelEvent, ChannelEventSink, ChannelOutbound},
        afk_common::types::{LocalUser, OutboundMessage},
        afk_config::ResponderConfig,
        async_trait::async_trait,
        rstest::rstest,
    };

    use {
        super::*,
        crate::{
            completion::ReplyGenerator,
            delay::NoDelays,
            responder::ResponderParts,
            state::StateStore,
        },
    };

    struct Quiet;

    #[async_trait]
    impl ChannelOutbound for Quiet {
        async fn send_message(
            &self,
            _channel_id: &str,
            _message: &OutboundMessage,
        ) -> afk_channels::Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl ChannelEventSink for Quiet {
        async fn emit(&self, _event: ChannelEvent) {}
    }

    #[async_trait]
    impl ReplyGenerator for Quiet {
        async fn generate_reply(
            &self,
            _message: &str,
            _use_custom_key: bool,
            _display_name: &str,
            _channel_id: &str,
        ) -> String {
            String::new()
        }
    }

    fn responder() -> AutoResponder {
        AutoResponder::new(ResponderParts {
            user: LocalUser {
                id: "me".into(),
                global_name: None,
                username: Some("ada".into()),
            },
            config: ResponderConfig::default(),
            typing_interval: Duration::from_secs(8),
            state: Arc::new(StateStore::default()),
            outbound: Arc::new(Quiet),
            events: Arc::new(Quiet),
            replies: Arc::new(Quiet),
            delays: Arc::new(NoDelays),
        })
    }

    #[rstest]
    #[case("afk", Command::Toggle { away_reason: None })]
    #[case("/afk", Command::Toggle { away_reason: None })]
    #[case("afk  at the dentist ", Command::Toggle { away_reason: Some("at the dentist".into()) })]
    #[case(" /afk-global ", Command::ToggleGlobal)]
    fn parses_commands(#[case] input: &str, #[case] expected: Command) {
        assert_eq!(Command::parse(input).unwrap(), expected);
    }

    #[rstest]
    #[case("status")]
    #[case("")]
    #[case("afk-global now")]
    fn rejects_other_input(#[case] input: &str) {
        assert!(Command::parse(input).is_err());
    }

    #[tokio::test]
    async fn toggle_reports_new_state() {
        let responder = responder();
        let toggle = Command::Toggle { away_reason: None };

        assert_eq!(
            execute(&responder, &toggle, Some("C1")).await,
            "✅ **AI active** for ada! (Multiple Fallback Keys)"
        );
        assert_eq!(
            execute(&responder, &toggle, Some("C1")).await,
            "❌ **AI disabled** for ada! (Multiple Fallback Keys)"
        );
    }

    #[tokio::test]
    async fn toggle_without_channel() {
        let responder = responder();
        let toggle = Command::Toggle { away_reason: None };
        assert_eq!(execute(&responder, &toggle, None).await, text::NO_CHANNEL_SELECTED);
        assert!(responder.state().enabled_channels().is_empty());
    }

    #[tokio::test]
    async fn global_toggle_round_trip() {
        let responder = responder();
        let on = execute(&responder, &Command::ToggleGlobal, None).await;
        assert!(on.contains("Global AI enabled"));
        assert_eq!(
            execute(&responder, &Command::Toggle { away_reason: None }, Some("C1")).await,
            "✨ **Global AI active** for ada! (Multiple Fallback Keys)"
        );
        let off = execute(&responder, &Command::ToggleGlobal, None).await;
        assert!(off.contains("Global AI disabled"));
    }
}
