//! Wire and domain types shared between the host seams and the responder.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Display name used when the local user has neither a global name nor a
/// username.
pub const DEFAULT_DISPLAY_NAME: &str = "User";

// ── Inbound ─────────────────────────────────────────────────────────────────

/// "message created" notification delivered by the host application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageCreateEvent {
    pub message: Option<InboundMessage>,
}

impl MessageCreateEvent {
    /// Parse an event from its JSON form.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    #[must_use]
    pub fn new(message: InboundMessage) -> Self {
        Self {
            message: Some(message),
        }
    }
}

/// A single inbound chat message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    #[serde(default)]
    pub content: String,
    pub author: MessageAuthor,
    pub channel_id: String,
    /// Present for multi-party (server) contexts; direct messages carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
}

impl InboundMessage {
    /// Whether the message was posted in a one-to-one conversation.
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.guild_id.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageAuthor {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

// ── Local user ──────────────────────────────────────────────────────────────

/// The account the responder speaks for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalUser {
    pub id: String,
    pub global_name: Option<String>,
    pub username: Option<String>,
}

impl LocalUser {
    /// Global name, else username, else [`DEFAULT_DISPLAY_NAME`].
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.global_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.username.as_deref().filter(|n| !n.trim().is_empty()))
            .unwrap_or(DEFAULT_DISPLAY_NAME)
    }
}

// ── Conversation history ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of a channel's conversation context, as sent to the completion
/// endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ── Outbound ────────────────────────────────────────────────────────────────

/// Message posted back into a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub content: String,
    pub tts: bool,
    pub invalid_emojis: Vec<String>,
    pub valid_non_shortcut_emojis: Vec<String>,
}

impl OutboundMessage {
    /// Plain text message: no text-to-speech, no emoji validation lists.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tts: false,
            invalid_emojis: Vec::new(),
            valid_non_shortcut_emojis: Vec::new(),
        }
    }
}
