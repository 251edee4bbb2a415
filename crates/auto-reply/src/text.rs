//! User-visible text: greetings, fallback replies, notices, confirmations.

use rand::seq::IndexedRandom;

use crate::classify::FailureKind;

pub const NETWORK_FALLBACK: &str =
    "Sorry, I'm having connection issues right now. Can you try again in a moment?";

pub const TIMEOUT_FALLBACK: &str =
    "That took too long to process. Could you rephrase your message?";

pub const GENERIC_FALLBACKS: [&str; 4] = [
    "I'm having some technical difficulties right now. What did you want to chat about?",
    "Sorry, I encountered an error. Could you tell me what you're looking for help with?",
    "I'm experiencing some issues, but I'm still here! What's on your mind?",
    "Technical hiccup on my end. What would you like to discuss?",
];

/// How long a rate-limit notice stays visible.
pub const RATE_LIMIT_NOTICE_MS: u64 = 10_000;

fn pick(options: &[String]) -> String {
    options
        .choose(&mut rand::rng())
        .cloned()
        .unwrap_or_default()
}

/// Every greeting variant for `name`, mentioning `away_reason` when set.
pub fn greeting_templates(name: &str, away_reason: Option<&str>) -> Vec<String> {
    let reason = away_reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| format!(" ({r})"))
        .unwrap_or_default();
    vec![
        format!(
            "Hey! 👋 I'm {name}'s AI assistant. {name} is currently away{reason}, but feel free to chat with me until they return! I can help with questions, have conversations, or just chat about anything you'd like. What's on your mind?"
        ),
        format!(
            "Hi there! 🤖 This is {name}'s AI assistant speaking. {name} isn't available right now{reason}, but I'm here to chat! I can discuss topics, answer questions, or just have a friendly conversation until {name} gets back. How can I help you today?"
        ),
        format!(
            "Hello! ✨ I'm an AI assistant responding for {name} who is currently away{reason}. Feel free to ask me anything or just have a conversation until {name} returns. What would you like to talk about?"
        ),
        format!(
            "Hey! 🌟 {name}'s AI assistant here! {name} is away at the moment{reason}, but I'm happy to chat with you in the meantime. What brings you here today?"
        ),
        format!(
            "Hi! I'm {name}'s AI companion. {name} is currently unavailable{reason}, but I'm here to keep you company until they're back. What's up?"
        ),
    ]
}

/// A randomly chosen greeting.
pub fn greeting(name: &str, away_reason: Option<&str>) -> String {
    pick(&greeting_templates(name, away_reason))
}

/// Every rate-limit fallback variant for `name`.
pub fn rate_limit_fallbacks(name: &str) -> Vec<String> {
    vec![
        format!(
            "Hey! I've reached my daily chat limit (~1,000 requests/day), but {name} will be back soon! 😅"
        ),
        "Oops! Hit my daily limit. Free OpenRouter.ai accounts have ~1,000 requests/day limit."
            .to_string(),
        format!(
            "Daily limit reached! 📊 OpenRouter.ai free accounts have ~1,000 requests/day. {name} will respond when they return!"
        ),
        format!("I'm at my daily limit, but {name} will respond personally when they return! 💬"),
    ]
}

/// Conversational stand-in for a failed completion.
pub fn fallback_reply(kind: FailureKind, name: &str) -> String {
    match kind {
        FailureKind::RateLimit => pick(&rate_limit_fallbacks(name)),
        FailureKind::Network => NETWORK_FALLBACK.to_string(),
        FailureKind::Timeout => TIMEOUT_FALLBACK.to_string(),
        FailureKind::Generic => {
            let generic: Vec<String> = GENERIC_FALLBACKS.iter().map(|s| s.to_string()).collect();
            pick(&generic)
        },
    }
}

/// Remediation notice shown when request limits are exhausted.
pub fn rate_limit_notice(name: &str, custom_key: bool) -> String {
    if custom_key {
        format!(
            "⚠️ **API Limit Reached for {name}**\n\n\
             Your custom OpenRouter.ai API key has reached its daily limit (~1,000 requests/day for free accounts).\n\n\
             **Solutions:**\n\
             • Wait 24 hours for limit reset\n\
             • Create a new OpenRouter.ai account and get a new API key\n\
             • Update your API key in the config\n\
             • Consider upgrading to a paid plan on OpenRouter.ai"
        )
    } else {
        format!(
            "⚠️ **All Fallback Keys Exhausted for {name}**\n\n\
             All available fallback API keys have reached their daily limits.\n\n\
             **Solutions:**\n\
             • Create your own free OpenRouter.ai account\n\
             • Get your own API key (limited to ~1,000 requests/day)\n\
             • Set `use_custom_api_key` and `custom_api_key` in the config"
        )
    }
}

/// Instructions sent to the remote model with every request.
pub fn system_prompt(name: &str) -> String {
    format!(
        "You are {name}'s AI assistant. {name} is currently away, so you're responding on their behalf.\n\
         \n\
         IMPORTANT INSTRUCTIONS:\n\
         - You are having a normal conversation with someone who messaged {name}\n\
         - Answer their questions directly and helpfully\n\
         - Be conversational, friendly, and engaging\n\
         - Don't keep saying generic greetings - actually respond to what they're asking\n\
         - You can discuss any topic, help with problems, answer questions, etc.\n\
         - Keep responses concise but helpful (1-3 sentences usually)\n\
         - VARY your responses - don't repeat the same phrases\n\
         \n\
         Remember: RESPOND TO THEIR ACTUAL MESSAGE, don't just give generic responses!"
    )
}

// ── Toggle notices and command confirmations ────────────────────────────────

pub fn enabled_notice(name: &str) -> String {
    format!("AI Responder Enabled for {name}")
}

pub const DISABLED_NOTICE: &str = "AI Responder Disabled";

pub fn global_notice(name: &str, enabled: bool) -> String {
    if enabled {
        format!("Global AI Responder Enabled for {name}")
    } else {
        "Global AI Responder Disabled".to_string()
    }
}

pub const NO_CHANNEL_SELECTED: &str = "❌ No channel selected";

pub fn key_info(custom_key: bool) -> &'static str {
    if custom_key {
        "(Custom API Key)"
    } else {
        "(Multiple Fallback Keys)"
    }
}

pub fn toggle_confirmation(name: &str, global_mode: bool, enabled: bool, custom_key: bool) -> String {
    let info = key_info(custom_key);
    if global_mode {
        format!("✨ **Global AI active** for {name}! {info}")
    } else if enabled {
        format!("✅ **AI active** for {name}! {info}")
    } else {
        format!("❌ **AI disabled** for {name}! {info}")
    }
}

pub fn global_confirmation(name: &str, enabled: bool, custom_key: bool) -> String {
    let info = key_info(custom_key);
    if enabled {
        format!("✨ **Global AI enabled** for {name}! {info}")
    } else {
        format!("✨ **Global AI disabled** for {name}! {info}")
    }
}
