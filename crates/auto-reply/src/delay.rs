//! Human-like pacing between pipeline steps.

use std::time::Duration;

use {
    afk_config::{DelayRange, TimingConfig},
    rand::Rng,
};

/// Pause points of the response pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayKind {
    /// Between accepting a first message and starting the greeting.
    BeforeGreeting,
    /// Simulated typing of the greeting.
    GreetingTyping,
    /// Between the greeting and the reply.
    AfterGreeting,
    /// Between accepting a message and starting the reply.
    BeforeReply,
}

/// Source of pipeline delays.
pub trait Delays: Send + Sync {
    fn delay(&self, kind: DelayKind) -> Duration;
}

/// Uniformly random delays within the configured ranges.
#[derive(Debug, Clone, Default)]
pub struct HumanDelays {
    timing: TimingConfig,
}

impl HumanDelays {
    pub fn new(timing: TimingConfig) -> Self {
        Self { timing }
    }

    fn range(&self, kind: DelayKind) -> DelayRange {
        match kind {
            DelayKind::BeforeGreeting => self.timing.before_greeting,
            DelayKind::GreetingTyping => self.timing.greeting_typing,
            DelayKind::AfterGreeting => self.timing.after_greeting,
            DelayKind::BeforeReply => self.timing.before_reply,
        }
    }
}

impl Delays for HumanDelays {
    fn delay(&self, kind: DelayKind) -> Duration {
        let (lo, hi) = self.range(kind).bounds();
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }
}

/// Zero delays, for deterministic tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelays;

impl Delays for NoDelays {
    fn delay(&self, _kind: DelayKind) -> Duration {
        Duration::ZERO
    }
}
