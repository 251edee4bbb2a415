//! Config schema types (user identity, responder behaviour, endpoint, timing).

use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Completion proxy used when no endpoint URL is configured.
pub const DEFAULT_ENDPOINT_URL: &str = "https://www.syva.uk/syva-bot/api/openrouter.php";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AfkConfig {
    pub user: UserConfig,
    pub responder: ResponderConfig,
    pub endpoint: EndpointConfig,
    pub timing: TimingConfig,
}

/// The local account the responder answers for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Account id; messages authored by it are never answered.
    pub id: String,
    pub global_name: Option<String>,
    pub username: Option<String>,
}

/// Model the completion proxy should try first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreferredModel {
    #[default]
    #[serde(rename = "meta-llama/llama-3.1-8b-instruct:free")]
    Llama31_8b,
    #[serde(rename = "meta-llama/llama-3.1-70b-instruct:free")]
    Llama31_70b,
    #[serde(rename = "meta-llama/llama-3.2-3b-instruct:free")]
    Llama32_3b,
    #[serde(rename = "qwen/qwen-2.5-7b-instruct:free")]
    Qwen25_7b,
    /// Let the server pick.
    #[serde(rename = "auto")]
    Auto,
}

impl PreferredModel {
    pub const ALL: &'static [PreferredModel] = &[
        Self::Llama31_8b,
        Self::Llama31_70b,
        Self::Llama32_3b,
        Self::Qwen25_7b,
        Self::Auto,
    ];

    /// Identifier sent to the endpoint.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Llama31_8b => "meta-llama/llama-3.1-8b-instruct:free",
            Self::Llama31_70b => "meta-llama/llama-3.1-70b-instruct:free",
            Self::Llama32_3b => "meta-llama/llama-3.2-3b-instruct:free",
            Self::Qwen25_7b => "qwen/qwen-2.5-7b-instruct:free",
            Self::Auto => "auto",
        }
    }
}

/// User-facing responder settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    /// Send `custom_api_key` with each request instead of relying on the
    /// proxy's shared keys.
    pub use_custom_api_key: bool,
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub custom_api_key: Option<Secret<String>>,
    /// Emit notifications when a channel or global mode is toggled.
    pub show_notifications: bool,
    /// Announce the user's absence before the first reply of an activation.
    pub send_greeting: bool,
    /// Emit remediation notices when the endpoint reports exhausted limits.
    pub show_rate_limit_help: bool,
    /// Raise the responder's log level to debug.
    pub debug_mode: bool,
    /// Answer every direct message without per-channel activation.
    pub auto_respond_all_dms: bool,
    /// Comma-separated author ids to ignore.
    pub blacklisted_users: String,
    pub preferred_model: PreferredModel,
}

impl ResponderConfig {
    /// The configured credential, when opted in and not blank.
    #[must_use]
    pub fn active_api_key(&self) -> Option<&str> {
        if !self.use_custom_api_key {
            return None;
        }
        self.custom_api_key
            .as_ref()
            .map(|k| k.expose_secret().trim())
            .filter(|k| !k.is_empty())
    }

    /// Whether requests should carry the custom credential.
    #[must_use]
    pub fn uses_custom_key(&self) -> bool {
        self.active_api_key().is_some()
    }
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            use_custom_api_key: false,
            custom_api_key: None,
            show_notifications: true,
            send_greeting: true,
            show_rate_limit_help: true,
            debug_mode: false,
            auto_respond_all_dms: false,
            blacklisted_users: String::new(),
            preferred_model: PreferredModel::default(),
        }
    }
}

impl std::fmt::Debug for ResponderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponderConfig")
            .field("use_custom_api_key", &self.use_custom_api_key)
            .field(
                "custom_api_key",
                &self.custom_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("send_greeting", &self.send_greeting)
            .field("auto_respond_all_dms", &self.auto_respond_all_dms)
            .field("preferred_model", &self.preferred_model)
            .finish_non_exhaustive()
    }
}

/// External completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub url: String,
    /// Whole-request timeout.
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Client identifier sent in `User-Agent` and `X-Title`.
    pub client_name: String,
    /// Server version this client was built against; a mismatch is logged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_server_version: Option<String>,
}

impl EndpointConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT_URL.into(),
            timeout_secs: 30,
            max_tokens: 300,
            temperature: 0.9,
            client_name: "afk".into(),
            expected_server_version: None,
        }
    }
}

/// Inclusive range of milliseconds a randomized delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    #[must_use]
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Bounds ordered low to high, tolerating swapped config values.
    #[must_use]
    pub fn bounds(self) -> (u64, u64) {
        (self.min_ms.min(self.max_ms), self.min_ms.max(self.max_ms))
    }
}

/// Human-like pacing of the response pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Renewal period of the typing indicator.
    pub typing_interval_ms: u64,
    pub before_greeting: DelayRange,
    /// Simulated typing before the greeting is sent.
    pub greeting_typing: DelayRange,
    pub after_greeting: DelayRange,
    pub before_reply: DelayRange,
}

impl TimingConfig {
    #[must_use]
    pub fn typing_interval(&self) -> Duration {
        Duration::from_millis(self.typing_interval_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            typing_interval_ms: 8_000,
            before_greeting: DelayRange::new(200, 500),
            greeting_typing: DelayRange::new(1_500, 2_500),
            after_greeting: DelayRange::new(1_000, 1_500),
            before_reply: DelayRange::new(200, 500),
        }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
