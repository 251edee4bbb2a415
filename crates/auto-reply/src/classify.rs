//! Failure classification for completion errors.

use serde::Serialize;

/// Category a failed completion falls into; selects the fallback reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RateLimit,
    Network,
    Timeout,
    Generic,
}

impl FailureKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Generic => "generic",
        }
    }
}

/// Substrings of the endpoint's `error` field that signal exhausted limits.
const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit",
    "quota",
    "limit exceeded",
    "429",
    "all keys exhausted",
];

/// Whether an unsuccessful endpoint response reports a rate limit.
///
/// Requires a non-empty `error`; then matches it against the known patterns,
/// or the `message` field against "limit". Case-insensitive.
#[must_use]
pub fn is_rate_limit_text(error: Option<&str>, message: Option<&str>) -> bool {
    let Some(error) = error.map(str::to_lowercase).filter(|e| !e.trim().is_empty()) else {
        return false;
    };
    RATE_LIMIT_PATTERNS.iter().any(|p| error.contains(p))
        || message.is_some_and(|m| m.to_lowercase().contains("limit"))
}

/// Category of a free-text failure reason reported by the endpoint.
#[must_use]
pub fn kind_from_text(text: &str) -> FailureKind {
    let text = text.to_lowercase();
    if RATE_LIMIT_PATTERNS.iter().any(|p| text.contains(p)) {
        FailureKind::RateLimit
    } else if text.contains("timeout") || text.contains("timed out") {
        FailureKind::Timeout
    } else if text.contains("network") || text.contains("fetch") {
        FailureKind::Network
    } else {
        FailureKind::Generic
    }
}
