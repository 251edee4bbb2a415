//! Message orchestrator: eligibility checks, greeting latch, reply pipeline,
//! and the toggle operations.
//!
//! Eligibility is decided synchronously in [`AutoResponder::handle_event`],
//! which also claims the channel's processing guard before anything is
//! awaited. Only the greet/reply pipeline runs on a spawned task, so two
//! messages can never both pass the guard.

use std::{sync::Arc, time::Duration};

use {
    afk_channels::{
        ChannelEvent, ChannelEventSink, ChannelOutbound,
        gating::{is_blocked, parse_blocklist},
    },
    afk_common::types::{LocalUser, MessageCreateEvent, OutboundMessage},
    afk_config::{AfkConfig, ResponderConfig, UserConfig},
    tokio::task::JoinHandle,
    tracing::{debug, error, info, warn},
};

#[cfg(feature = "metrics")]
use afk_metrics::{auto_reply as reply_metrics, counter, gauge, histogram, labels};

use crate::{
    completion::{CompletionClient, ReplyGenerator},
    delay::{DelayKind, Delays, HumanDelays},
    state::{ChannelStatus, ProcessingGuard, StateStore},
    text,
    typing::TypingIndicator,
};

/// Why an inbound message was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoMessage,
    OwnMessage,
    BotAuthor,
    NotDirect,
    Blocked,
    EmptyContent,
    /// Channel neither enabled nor covered by global mode.
    Inactive,
    /// A response is already being composed for the channel.
    Busy,
}

impl Rejection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoMessage => "no_message",
            Self::OwnMessage => "own_message",
            Self::BotAuthor => "bot_author",
            Self::NotDirect => "not_direct",
            Self::Blocked => "blocked",
            Self::EmptyContent => "empty_content",
            Self::Inactive => "inactive",
            Self::Busy => "busy",
        }
    }
}

/// Outcome of [`AutoResponder::handle_event`].
#[derive(Debug)]
pub enum Dispatch {
    /// The pipeline was spawned; the handle resolves when it is done.
    Accepted(JoinHandle<()>),
    Rejected(Rejection),
}

impl Dispatch {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    #[must_use]
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Accepted(_) => None,
            Self::Rejected(reason) => Some(*reason),
        }
    }
}

/// Everything an [`AutoResponder`] is built from.
pub struct ResponderParts {
    pub user: LocalUser,
    pub config: ResponderConfig,
    pub typing_interval: Duration,
    pub state: Arc<StateStore>,
    pub outbound: Arc<dyn ChannelOutbound>,
    pub events: Arc<dyn ChannelEventSink>,
    pub replies: Arc<dyn ReplyGenerator>,
    pub delays: Arc<dyn Delays>,
}

/// The local account described by the `[user]` config section.
pub fn local_user(user: &UserConfig) -> LocalUser {
    LocalUser {
        id: user.id.clone(),
        global_name: user.global_name.clone(),
        username: user.username.clone(),
    }
}

/// Answers direct messages on behalf of an absent user.
pub struct AutoResponder {
    user: LocalUser,
    config: ResponderConfig,
    blocklist: Vec<String>,
    state: Arc<StateStore>,
    typing: TypingIndicator,
    outbound: Arc<dyn ChannelOutbound>,
    events: Arc<dyn ChannelEventSink>,
    replies: Arc<dyn ReplyGenerator>,
    delays: Arc<dyn Delays>,
}

impl AutoResponder {
    pub fn new(parts: ResponderParts) -> Self {
        let ResponderParts {
            user,
            config,
            typing_interval,
            state,
            outbound,
            events,
            replies,
            delays,
        } = parts;
        let blocklist = parse_blocklist(&config.blacklisted_users);
        let typing = TypingIndicator::new(Arc::clone(&outbound), Arc::clone(&state), typing_interval);
        Self {
            user,
            config,
            blocklist,
            state,
            typing,
            outbound,
            events,
            replies,
            delays,
        }
    }

    /// Wire a responder to the completion endpoint with human-like pacing.
    pub fn from_config(
        config: &AfkConfig,
        outbound: Arc<dyn ChannelOutbound>,
        events: Arc<dyn ChannelEventSink>,
    ) -> crate::Result<Self> {
        let state = Arc::new(StateStore::new(config.responder.auto_respond_all_dms));
        let replies = CompletionClient::new(
            config.endpoint.clone(),
            config.responder.clone(),
            Arc::clone(&state),
            Arc::clone(&events),
        )?;
        Ok(Self::new(ResponderParts {
            user: local_user(&config.user),
            config: config.responder.clone(),
            typing_interval: config.timing.typing_interval(),
            state,
            outbound,
            events,
            replies: Arc::new(replies),
            delays: Arc::new(HumanDelays::new(config.timing.clone())),
        }))
    }

    pub fn state(&self) -> &Arc<StateStore> {
        &self.state
    }

    pub fn user(&self) -> &LocalUser {
        &self.user
    }

    pub fn config(&self) -> &ResponderConfig {
        &self.config
    }

    pub fn status(&self, channel_id: &str) -> ChannelStatus {
        self.state.channel_status(channel_id)
    }

    // ── Inbound ─────────────────────────────────────────────────────────────

    /// Decide whether to answer `event` and, if so, spawn the pipeline.
    ///
    /// Never fails; rejections leave all state untouched.
    pub fn handle_event(self: &Arc<Self>, event: &MessageCreateEvent) -> Dispatch {
        #[cfg(feature = "metrics")]
        counter!(reply_metrics::MESSAGES_RECEIVED_TOTAL).increment(1);

        let Some(message) = event.message.as_ref() else {
            return self.reject(Rejection::NoMessage, None);
        };
        let channel_id = message.channel_id.as_str();

        if message.author.id == self.user.id {
            return self.reject(Rejection::OwnMessage, Some(channel_id));
        }
        if message.author.bot {
            return self.reject(Rejection::BotAuthor, Some(channel_id));
        }
        if !message.is_direct() {
            return self.reject(Rejection::NotDirect, Some(channel_id));
        }
        if is_blocked(&message.author.id, &self.blocklist) {
            return self.reject(Rejection::Blocked, Some(channel_id));
        }
        let content = message.content.trim();
        if content.is_empty() {
            return self.reject(Rejection::EmptyContent, Some(channel_id));
        }
        if !self.state.is_active(channel_id) {
            return self.reject(Rejection::Inactive, Some(channel_id));
        }
        let Some(guard) = self.state.try_begin_processing(channel_id) else {
            return self.reject(Rejection::Busy, Some(channel_id));
        };

        let epoch = self.state.epoch(channel_id);
        info!(
            channel_id,
            message_id = %message.id,
            author_id = %message.author.id,
            "answering message"
        );

        #[cfg(feature = "metrics")]
        gauge!(reply_metrics::PROCESSING_CHANNELS).set(self.state.processing_count() as f64);

        let responder = Arc::clone(self);
        let content = content.to_string();
        Dispatch::Accepted(tokio::spawn(async move {
            responder.run_pipeline(guard, content, epoch).await;
        }))
    }

    fn reject(&self, reason: Rejection, channel_id: Option<&str>) -> Dispatch {
        debug!(channel_id, reason = reason.as_str(), "message ignored");

        #[cfg(feature = "metrics")]
        counter!(reply_metrics::MESSAGES_REJECTED_TOTAL, labels::REASON => reason.as_str())
            .increment(1);

        Dispatch::Rejected(reason)
    }

    async fn run_pipeline(&self, guard: ProcessingGuard, content: String, epoch: u64) {
        #[cfg(feature = "metrics")]
        let start = std::time::Instant::now();

        let channel_id = guard.channel_id().to_string();
        self.respond(&channel_id, &content, epoch).await;
        drop(guard);

        #[cfg(feature = "metrics")]
        {
            histogram!(reply_metrics::PIPELINE_DURATION_SECONDS)
                .record(start.elapsed().as_secs_f64());
            gauge!(reply_metrics::PROCESSING_CHANNELS).set(self.state.processing_count() as f64);
        }
    }

    async fn respond(&self, channel_id: &str, content: &str, epoch: u64) {
        let name = self.user.display_name().to_string();

        if self.config.send_greeting && !self.state.is_greeted(channel_id) {
            self.pause(DelayKind::BeforeGreeting).await;
            self.typing.start(channel_id).await;
            self.pause(DelayKind::GreetingTyping).await;
            self.stop_typing(channel_id, epoch).await;

            if !self.is_current(channel_id, epoch) {
                debug!(channel_id, "activation ended before greeting was sent");
                return;
            }
            let away_reason = self.state.away_reason(channel_id);
            let greeting = text::greeting(&name, away_reason.as_deref());
            if !self.send(channel_id, greeting).await {
                return;
            }
            self.state.mark_greeted(channel_id);
            debug!(channel_id, "greeting sent");

            #[cfg(feature = "metrics")]
            counter!(reply_metrics::GREETINGS_SENT_TOTAL).increment(1);

            self.pause(DelayKind::AfterGreeting).await;
        } else {
            self.pause(DelayKind::BeforeReply).await;
        }

        self.typing.start(channel_id).await;
        // No await between this check and the generator reading the epoch.
        if !self.is_current(channel_id, epoch) {
            self.stop_typing(channel_id, epoch).await;
            debug!(channel_id, "activation ended before reply was requested");
            return;
        }
        let reply = self
            .replies
            .generate_reply(content, self.config.uses_custom_key(), &name, channel_id)
            .await;
        self.stop_typing(channel_id, epoch).await;

        if !self.is_current(channel_id, epoch) {
            if !self.state.is_active(channel_id) {
                self.state.clear_history(channel_id);
            }
            info!(channel_id, "activation ended while composing, reply discarded");
            return;
        }

        if self.send(channel_id, reply).await {
            debug!(channel_id, "reply sent");

            #[cfg(feature = "metrics")]
            counter!(reply_metrics::REPLIES_SENT_TOTAL).increment(1);
        }
    }

    /// Still the activation the message was accepted under.
    fn is_current(&self, channel_id: &str, epoch: u64) -> bool {
        self.state.epoch(channel_id) == epoch && self.state.is_active(channel_id)
    }

    /// A toggle already released this pipeline's lease; after one, the lease
    /// in the store may belong to a newer pipeline.
    async fn stop_typing(&self, channel_id: &str, epoch: u64) {
        if self.state.epoch(channel_id) == epoch {
            self.typing.stop(channel_id).await;
        }
    }

    async fn pause(&self, kind: DelayKind) {
        let delay = self.delays.delay(kind);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    async fn send(&self, channel_id: &str, content: String) -> bool {
        let message = OutboundMessage::text(content);
        match self.outbound.send_message(channel_id, &message).await {
            Ok(()) => true,
            Err(e) => {
                error!(channel_id, error = %e, "failed to send message");

                #[cfg(feature = "metrics")]
                counter!(reply_metrics::SEND_ERRORS_TOTAL).increment(1);

                false
            },
        }
    }

    // ── Toggles ─────────────────────────────────────────────────────────────

    /// Flip auto-response for one channel and return the new state.
    ///
    /// Disabling resets the channel completely and stops its typing signal.
    /// Enabling starts a fresh context carrying `away_reason`.
    pub async fn toggle_channel(&self, channel_id: &str, away_reason: Option<&str>) -> bool {
        let enabled = if self.state.is_enabled(channel_id) {
            self.state.disable(channel_id);
            self.typing.stop(channel_id).await;
            false
        } else {
            let reason = away_reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string);
            self.state.enable(channel_id, reason);
            true
        };
        info!(channel_id, enabled, "auto-response toggled");

        if self.config.show_notifications {
            let text = if enabled {
                text::enabled_notice(self.user.display_name())
            } else {
                text::DISABLED_NOTICE.to_string()
            };
            self.events
                .emit(ChannelEvent::Toggled {
                    channel_id: channel_id.to_string(),
                    enabled,
                    text,
                })
                .await;
        }
        enabled
    }

    /// Flip global mode and return the new state.
    ///
    /// Enabling clears the per-channel enabled set.
    pub async fn toggle_global(&self) -> bool {
        let enabled = !self.state.global_mode();
        self.state.set_global_mode(enabled);
        if enabled {
            let covered = self.state.enabled_channels();
            if !covered.is_empty() {
                debug!(channels = ?covered, "global mode supersedes per-channel activation");
            }
            self.state.clear_enabled();
        }
        info!(enabled, "global mode toggled");

        if self.config.show_notifications {
            self.events
                .emit(ChannelEvent::GlobalModeChanged {
                    enabled,
                    text: text::global_notice(self.user.display_name(), enabled),
                })
                .await;
        }
        enabled
    }

    /// Stop every typing signal and drop all channel state.
    pub async fn shutdown(&self) {
        let in_flight = self.state.processing_count();
        if in_flight > 0 {
            warn!(in_flight, "shutting down with responses in flight");
        }
        self.typing.stop_all().await;
        self.state.clear_all();
        info!("auto-responder stopped");
    }
}
