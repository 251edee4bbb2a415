use {afk_common::types::OutboundMessage, async_trait::async_trait};

use crate::Result;

// ── Channel events (pub/sub) ────────────────────────────────────────────────

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Failure,
}

/// Events the responder reports to the host for toasts and status refresh.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// Auto-response was switched on or off for one channel.
    Toggled {
        channel_id: String,
        enabled: bool,
        text: String,
    },
    /// Global mode was switched on or off.
    GlobalModeChanged { enabled: bool, text: String },
    /// The completion endpoint reported exhausted request limits.
    RateLimited {
        display_name: String,
        custom_key: bool,
        text: String,
        /// How long the host should keep the notice visible.
        duration_ms: u64,
    },
}

impl ChannelEvent {
    #[must_use]
    pub fn level(&self) -> NoticeLevel {
        match self {
            Self::Toggled { .. } | Self::GlobalModeChanged { .. } => NoticeLevel::Success,
            Self::RateLimited { .. } => NoticeLevel::Failure,
        }
    }

    /// Text to display.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Toggled { text, .. }
            | Self::GlobalModeChanged { text, .. }
            | Self::RateLimited { text, .. } => text,
        }
    }
}

/// Sink for channel events; the host provides the concrete implementation.
#[async_trait]
pub trait ChannelEventSink: Send + Sync {
    async fn emit(&self, event: ChannelEvent);
}

/// Send messages and typing signals to a channel.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    async fn send_message(&self, channel_id: &str, message: &OutboundMessage) -> Result<()>;

    /// Send a "typing" indicator. No-op by default.
    async fn send_typing(&self, _channel_id: &str) -> Result<()> {
        Ok(())
    }

    /// Clear the typing indicator. No-op by default.
    async fn stop_typing(&self, _channel_id: &str) -> Result<()> {
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    struct TextOnly;

    #[async_trait]
    impl ChannelOutbound for TextOnly {
        async fn send_message(&self, _channel_id: &str, _message: &OutboundMessage) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn typing_signals_default_to_noop() {
        let outbound = TextOnly;
        assert!(outbound.send_typing("C1").await.is_ok());
        assert!(outbound.stop_typing("C1").await.is_ok());
    }

    #[test]
    fn rate_limit_events_are_failures() {
        let event = ChannelEvent::RateLimited {
            display_name: "Ada".into(),
            custom_key: false,
            text: "limit".into(),
            duration_ms: 10_000,
        };
        assert_eq!(event.level(), NoticeLevel::Failure);
        assert_eq!(event.text(), "limit");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "rate_limited");
    }

    #[test]
    fn toggle_events_are_successes() {
        let event = ChannelEvent::GlobalModeChanged {
            enabled: true,
            text: "on".into(),
        };
        assert_eq!(event.level(), NoticeLevel::Success);
    }
}
