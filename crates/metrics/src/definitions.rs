//! Metric name and label definitions.

/// Inbound message handling
pub mod auto_reply {
    /// Messages delivered to the responder
    pub const MESSAGES_RECEIVED_TOTAL: &str = "afk_auto_reply_messages_received_total";
    /// Messages dropped by eligibility checks (label: reason)
    pub const MESSAGES_REJECTED_TOTAL: &str = "afk_auto_reply_messages_rejected_total";
    /// Greetings posted
    pub const GREETINGS_SENT_TOTAL: &str = "afk_auto_reply_greetings_sent_total";
    /// Replies posted
    pub const REPLIES_SENT_TOTAL: &str = "afk_auto_reply_replies_sent_total";
    /// Outbound sends that failed
    pub const SEND_ERRORS_TOTAL: &str = "afk_auto_reply_send_errors_total";
    /// Duration of the full greet/reply pipeline in seconds
    pub const PIPELINE_DURATION_SECONDS: &str = "afk_auto_reply_pipeline_duration_seconds";
    /// Channels currently composing a response
    pub const PROCESSING_CHANNELS: &str = "afk_auto_reply_processing_channels";
}

/// Completion endpoint calls
pub mod completion {
    /// Completion requests sent
    pub const REQUESTS_TOTAL: &str = "afk_completion_requests_total";
    /// Failed completions (label: kind)
    pub const FAILURES_TOTAL: &str = "afk_completion_failures_total";
    /// Round-trip duration in seconds
    pub const DURATION_SECONDS: &str = "afk_completion_duration_seconds";
}

/// Common label keys
pub mod labels {
    pub const REASON: &str = "reason";
    pub const KIND: &str = "kind";
    pub const MODEL: &str = "model";
}
