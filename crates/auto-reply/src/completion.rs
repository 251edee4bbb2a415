//! Client for the external completion proxy.
//!
//! One POST per message; failures never reach the caller, they turn into a
//! conversational fallback string chosen by [`FailureKind`].

use std::sync::Arc;

use {
    afk_channels::{ChannelEvent, ChannelEventSink},
    afk_common::types::ConversationMessage,
    afk_config::{EndpointConfig, ResponderConfig},
    async_trait::async_trait,
    reqwest::{
        StatusCode,
        header::{ACCEPT, USER_AGENT},
    },
    serde::{Deserialize, Serialize},
    tracing::{debug, error, warn},
};

#[cfg(feature = "metrics")]
use afk_metrics::{completion as completion_metrics, counter, histogram, labels};

use crate::{
    classify::{FailureKind, is_rate_limit_text, kind_from_text},
    state::StateStore,
    text,
};

/// Version reported in the client headers.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Produces the reply text for an accepted message.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Always yields displayable text; failures become fallback replies.
    ///
    /// History is recorded only into the channel activation that was current
    /// when the call started.
    async fn generate_reply(
        &self,
        message: &str,
        use_custom_key: bool,
        display_name: &str,
        channel_id: &str,
    ) -> String;
}

// ── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest<'a> {
    message: &'a str,
    conversation_history: &'a [ConversationMessage],
    system_prompt: String,
    max_tokens: u32,
    temperature: f32,
    use_custom_key: bool,
    preferred_model: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_api_key: Option<&'a str>,
}

/// Body returned by the completion proxy.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    #[serde(default)]
    pub success: bool,
    pub response: Option<String>,
    pub error: Option<String>,
    pub message: Option<String>,
    pub model_used: Option<String>,
    pub key_used: Option<String>,
    pub version: Option<String>,
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("API error: {status} - {body}")]
    Http { status: StatusCode, body: String },

    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("network error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("{0}")]
    Remote(String),

    #[error("invalid response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("invalid API response format - no response field")]
    InvalidFormat,

    #[error("empty response from API")]
    EmptyResponse,
}

impl CompletionError {
    fn transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err)
        } else {
            Self::Transport(err)
        }
    }

    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Http { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS => {
                FailureKind::RateLimit
            },
            Self::Http { .. } | Self::Transport(_) => FailureKind::Network,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::RateLimited(_) => FailureKind::RateLimit,
            Self::Remote(reason) => kind_from_text(reason),
            Self::Decode(_) | Self::InvalidFormat | Self::EmptyResponse => FailureKind::Generic,
        }
    }
}

// ── Client ──────────────────────────────────────────────────────────────────

/// HTTP client for the completion proxy.
pub struct CompletionClient {
    http: reqwest::Client,
    endpoint: EndpointConfig,
    responder: ResponderConfig,
    state: Arc<StateStore>,
    events: Arc<dyn ChannelEventSink>,
}

impl CompletionClient {
    pub fn new(
        endpoint: EndpointConfig,
        responder: ResponderConfig,
        state: Arc<StateStore>,
        events: Arc<dyn ChannelEventSink>,
    ) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(endpoint.timeout())
            .build()?;
        Ok(Self {
            http,
            endpoint,
            responder,
            state,
            events,
        })
    }

    /// Perform one request and interpret the response.
    ///
    /// `history` is sent as-is and must already contain `message`.
    pub async fn request_completion(
        &self,
        message: &str,
        history: &[ConversationMessage],
        use_custom_key: bool,
        display_name: &str,
    ) -> Result<String, CompletionError> {
        let body = CompletionRequest {
            message: message.trim(),
            conversation_history: history,
            system_prompt: text::system_prompt(display_name),
            max_tokens: self.endpoint.max_tokens,
            temperature: self.endpoint.temperature,
            use_custom_key,
            preferred_model: self.responder.preferred_model.as_str(),
            custom_api_key: use_custom_key
                .then(|| self.responder.active_api_key())
                .flatten(),
        };

        debug!(
            url = %self.endpoint.url,
            message_len = message.len(),
            history_len = history.len(),
            use_custom_key,
            preferred_model = body.preferred_model,
            "sending completion request"
        );

        #[cfg(feature = "metrics")]
        counter!(completion_metrics::REQUESTS_TOTAL, labels::MODEL => body.preferred_model)
            .increment(1);

        let client_name = &self.endpoint.client_name;
        let resp = self
            .http
            .post(&self.endpoint.url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, format!("{client_name}/{CLIENT_VERSION}"))
            .header("X-Title", format!("{client_name} away responder v{CLIENT_VERSION}"))
            .json(&body)
            .send()
            .await
            .map_err(CompletionError::transport)?;

        let status = resp.status();
        debug!(%status, "completion response received");

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            debug!(%status, body, "completion endpoint returned an error status");
            return Err(CompletionError::Http { status, body });
        }

        let raw = resp.text().await.map_err(CompletionError::transport)?;
        let data: CompletionResponse =
            serde_json::from_str(&raw).map_err(CompletionError::Decode)?;

        if let (Some(expected), Some(actual)) = (
            self.endpoint.expected_server_version.as_deref(),
            data.version.as_deref(),
        ) && expected != actual
        {
            warn!(client = expected, server = actual, "completion server version mismatch");
        }

        if !data.success {
            if is_rate_limit_text(data.error.as_deref(), data.message.as_deref()) {
                return Err(CompletionError::RateLimited(
                    data.error.unwrap_or_default(),
                ));
            }
            let reason = data
                .message
                .filter(|m| !m.trim().is_empty())
                .or(data.error)
                .unwrap_or_else(|| "API request failed".to_string());
            return Err(CompletionError::Remote(reason));
        }

        let reply = data
            .response
            .ok_or(CompletionError::InvalidFormat)?
            .trim()
            .to_string();
        if reply.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }

        debug!(
            reply_len = reply.len(),
            model_used = data.model_used.as_deref().unwrap_or("unknown"),
            key_used = data.key_used.as_deref().unwrap_or("unknown"),
            server_version = data.version.as_deref().unwrap_or("unknown"),
            "completion succeeded"
        );
        Ok(reply)
    }

    async fn notify_rate_limit(&self, use_custom_key: bool, display_name: &str) {
        warn!(
            display_name,
            custom_key = use_custom_key,
            "completion rate limit reached"
        );
        if !self.responder.show_rate_limit_help {
            return;
        }
        self.events
            .emit(ChannelEvent::RateLimited {
                display_name: display_name.to_string(),
                custom_key: use_custom_key,
                text: text::rate_limit_notice(display_name, use_custom_key),
                duration_ms: text::RATE_LIMIT_NOTICE_MS,
            })
            .await;
    }
}

#[async_trait]
impl ReplyGenerator for CompletionClient {
    async fn generate_reply(
        &self,
        message: &str,
        use_custom_key: bool,
        display_name: &str,
        channel_id: &str,
    ) -> String {
        #[cfg(feature = "metrics")]
        let start = std::time::Instant::now();

        // History writes belong to the activation current when the call starts.
        let epoch = self.state.epoch(channel_id);
        let history = self
            .state
            .push_history(channel_id, ConversationMessage::user(message.trim()));

        let result = self
            .request_completion(message, &history, use_custom_key, display_name)
            .await;

        #[cfg(feature = "metrics")]
        histogram!(completion_metrics::DURATION_SECONDS).record(start.elapsed().as_secs_f64());

        match result {
            Ok(reply) => {
                if !self.state.push_history_if_epoch(
                    channel_id,
                    epoch,
                    ConversationMessage::assistant(&reply),
                ) {
                    debug!(channel_id, "activation changed during completion, reply not recorded");
                }
                reply
            },
            Err(err) => {
                let kind = err.kind();
                error!(channel_id, kind = kind.as_str(), error = %err, "completion failed");

                #[cfg(feature = "metrics")]
                counter!(completion_metrics::FAILURES_TOTAL, labels::KIND => kind.as_str())
                    .increment(1);

                if kind == FailureKind::RateLimit {
                    self.notify_rate_limit(use_custom_key, display_name).await;
                }
                text::fallback_reply(kind, display_name)
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use {
        mockito::Matcher,
        secrecy::Secret,
        serde_json::json,
        tokio::{
            io::{AsyncReadExt, AsyncWriteExt},
            net::{TcpListener, TcpStream},
            sync::{Notify, oneshot},
        },
    };

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<ChannelEvent>>,
    }

    #[async_trait]
    impl ChannelEventSink for RecordingSink {
        async fn emit(&self, event: ChannelEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl RecordingSink {
        fn rate_limit_count(&self) -> usize {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| matches!(e, ChannelEvent::RateLimited { .. }))
                .count()
        }
    }

    struct Fixture {
        client: CompletionClient,
        state: Arc<StateStore>,
        sink: Arc<RecordingSink>,
    }

    fn fixture(url: String, responder: ResponderConfig) -> Fixture {
        fixture_with_timeout(url, responder, 5)
    }

    fn fixture_with_timeout(
        url: String,
        responder: ResponderConfig,
        timeout_secs: u64,
    ) -> Fixture {
        let state = Arc::new(StateStore::default());
        let sink = Arc::new(RecordingSink::default());
        let endpoint = EndpointConfig {
            url,
            timeout_secs,
            ..Default::default()
        };
        let client = CompletionClient::new(
            endpoint,
            responder,
            Arc::clone(&state),
            Arc::clone(&sink) as Arc<dyn ChannelEventSink>,
        )
        .unwrap();
        Fixture {
            client,
            state,
            sink,
        }
    }

    /// Read one HTTP request (headers plus `content-length` body).
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let len = text[..end]
                    .lines()
                    .find_map(|line| {
                        line.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serve one request: hand the raw request to the test, wait for
    /// `release` when given, then answer 200 with `body`.
    async fn scripted_endpoint(
        body: &'static str,
        release: Option<Arc<Notify>>,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let _ = tx.send(request);
            if let Some(release) = release {
                release.notified().await;
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        (format!("http://{addr}/api"), rx)
    }

    /// Accept connections and never answer them.
    async fn silent_endpoint() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{addr}/api")
    }

    fn request_json(raw: &str) -> serde_json::Value {
        let (_, body) = raw.split_once("\r\n\r\n").unwrap();
        serde_json::from_str(body).unwrap()
    }

    async fn endpoint_returning(
        server: &mut mockito::ServerGuard,
        status: usize,
        body: &str,
    ) -> mockito::Mock {
        server
            .mock("POST", "/api")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn success_returns_trimmed_reply_and_records_history() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api")
            .match_header("content-type", "application/json")
            .match_header("accept", "application/json")
            .match_header("user-agent", Matcher::Regex(r"^afk/".into()))
            .match_body(Matcher::PartialJson(json!({
                "message": "hi",
                "conversationHistory": [{"role": "user", "content": "hi"}],
                "maxTokens": 300,
                "useCustomKey": false,
                "preferredModel": "meta-llama/llama-3.1-8b-instruct:free"
            })))
            .with_status(200)
            .with_body(json!({"success": true, "response": "  hello there  ", "modelUsed": "m"}).to_string())
            .create_async()
            .await;

        let fx = fixture(format!("{}/api", server.url()), ResponderConfig::default());
        let reply = fx.client.generate_reply("hi", false, "Ada", "C1").await;

        assert_eq!(reply, "hello there");
        assert_eq!(fx.state.history("C1"), vec![
            ConversationMessage::user("hi"),
            ConversationMessage::assistant("hello there"),
        ]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn custom_key_is_sent_only_when_opted_in() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api")
            .match_body(Matcher::PartialJson(json!({
                "useCustomKey": true,
                "customApiKey": "sk-or-v1-test"
            })))
            .with_status(200)
            .with_body(json!({"success": true, "response": "ok"}).to_string())
            .create_async()
            .await;

        let responder = ResponderConfig {
            use_custom_api_key: true,
            custom_api_key: Some(Secret::new("sk-or-v1-test".into())),
            ..Default::default()
        };
        let fx = fixture(format!("{}/api", server.url()), responder);
        assert_eq!(fx.client.generate_reply("hi", true, "Ada", "C1").await, "ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn configured_key_is_withheld_without_opt_in() {
        let (url, request) =
            scripted_endpoint(r#"{"success": true, "response": "ok"}"#, None).await;
        let fx = fixture(url, ResponderConfig {
            use_custom_api_key: true,
            custom_api_key: Some(Secret::new("sk-or-v1-test".into())),
            ..Default::default()
        });

        assert_eq!(fx.client.generate_reply("hi", false, "Ada", "C1").await, "ok");

        let raw = request.await.unwrap();
        assert!(!raw.contains("sk-or-v1-test"));
        let body = request_json(&raw);
        assert!(body.get("customApiKey").is_none());
        assert_eq!(body["useCustomKey"], false);
    }

    #[tokio::test]
    async fn stalled_endpoint_times_out() {
        let fx = fixture_with_timeout(silent_endpoint().await, ResponderConfig::default(), 1);
        let reply = fx.client.generate_reply("hi", false, "Ada", "C1").await;
        assert_eq!(reply, text::TIMEOUT_FALLBACK);
        assert_eq!(fx.sink.rate_limit_count(), 0);
    }

    #[tokio::test]
    async fn reply_finishing_after_reactivation_is_not_recorded() {
        let release = Arc::new(Notify::new());
        let (url, request) = scripted_endpoint(
            r#"{"success": true, "response": "late"}"#,
            Some(Arc::clone(&release)),
        )
        .await;
        let Fixture { client, state, .. } = fixture(url, ResponderConfig::default());
        let client = Arc::new(client);
        state.enable("C1", None);

        let pending = tokio::spawn({
            let client = Arc::clone(&client);
            async move { client.generate_reply("hi", false, "Ada", "C1").await }
        });
        request.await.unwrap();
        state.disable("C1");
        state.enable("C1", None);
        release.notify_one();

        assert_eq!(pending.await.unwrap(), "late");
        assert!(state.history("C1").is_empty());
    }

    #[tokio::test]
    async fn server_error_yields_network_fallback() {
        let mut server = mockito::Server::new_async().await;
        let _mock = endpoint_returning(&mut server, 500, "boom").await;

        let fx = fixture(format!("{}/api", server.url()), ResponderConfig::default());
        let reply = fx.client.generate_reply("hi", false, "Ada", "C1").await;

        assert_eq!(reply, text::NETWORK_FALLBACK);
        // only the user turn is retained on failure
        assert_eq!(fx.state.history("C1"), vec![ConversationMessage::user("hi")]);
        assert_eq!(fx.sink.rate_limit_count(), 0);
    }

    #[tokio::test]
    async fn http_429_is_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _mock = endpoint_returning(&mut server, 429, "slow down").await;

        let fx = fixture(format!("{}/api", server.url()), ResponderConfig::default());
        let reply = fx.client.generate_reply("hi", false, "Ada", "C1").await;

        assert!(text::rate_limit_fallbacks("Ada").contains(&reply));
        assert_eq!(fx.sink.rate_limit_count(), 1);
    }

    #[tokio::test]
    async fn rate_limit_body_notifies_exactly_once() {
        let mut server = mockito::Server::new_async().await;
        let _mock = endpoint_returning(
            &mut server,
            200,
            r#"{"success": false, "error": "rate limit exceeded 429"}"#,
        )
        .await;

        let fx = fixture(format!("{}/api", server.url()), ResponderConfig::default());
        let reply = fx.client.generate_reply("hi", false, "Ada", "C1").await;

        assert!(text::rate_limit_fallbacks("Ada").contains(&reply));
        assert_eq!(fx.sink.rate_limit_count(), 1);
        let events = fx.sink.events.lock().unwrap();
        assert!(matches!(
            &events[0],
            ChannelEvent::RateLimited { custom_key: false, duration_ms: 10_000, .. }
        ));
    }

    #[tokio::test]
    async fn rate_limit_notice_respects_setting() {
        let mut server = mockito::Server::new_async().await;
        let _mock = endpoint_returning(
            &mut server,
            200,
            r#"{"success": false, "error": "all keys exhausted"}"#,
        )
        .await;

        let responder = ResponderConfig {
            show_rate_limit_help: false,
            ..Default::default()
        };
        let fx = fixture(format!("{}/api", server.url()), responder);
        let reply = fx.client.generate_reply("hi", false, "Ada", "C1").await;

        assert!(text::rate_limit_fallbacks("Ada").contains(&reply));
        assert_eq!(fx.sink.rate_limit_count(), 0);
    }

    #[tokio::test]
    async fn malformed_json_yields_generic_fallback() {
        let mut server = mockito::Server::new_async().await;
        let _mock = endpoint_returning(&mut server, 200, "{not valid json}").await;

        let fx = fixture(format!("{}/api", server.url()), ResponderConfig::default());
        let reply = fx.client.generate_reply("hi", false, "Ada", "C1").await;

        assert!(text::GENERIC_FALLBACKS.contains(&reply.as_str()));
    }

    #[tokio::test]
    async fn missing_or_blank_response_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        let _mock = endpoint_returning(&mut server, 200, r#"{"success": true}"#).await;
        let fx = fixture(format!("{}/api", server.url()), ResponderConfig::default());
        let err = fx
            .client
            .request_completion("hi", &[], false, "Ada")
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::InvalidFormat));

        let mut server = mockito::Server::new_async().await;
        let _mock =
            endpoint_returning(&mut server, 200, r#"{"success": true, "response": "   "}"#).await;
        let fx = fixture(format!("{}/api", server.url()), ResponderConfig::default());
        let err = fx
            .client
            .request_completion("hi", &[], false, "Ada")
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::EmptyResponse));
        assert_eq!(err.kind(), FailureKind::Generic);
    }

    #[tokio::test]
    async fn remote_failure_prefers_message_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = endpoint_returning(
            &mut server,
            200,
            r#"{"success": false, "error": "E_MODEL", "message": "upstream timeout"}"#,
        )
        .await;

        let fx = fixture(format!("{}/api", server.url()), ResponderConfig::default());
        let err = fx
            .client
            .request_completion("hi", &[], false, "Ada")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "upstream timeout");
        assert_eq!(err.kind(), FailureKind::Timeout);
    }

    #[tokio::test]
    async fn unreachable_endpoint_yields_network_fallback() {
        // Port 9 (discard) is closed on test hosts.
        let fx = fixture("http://127.0.0.1:9/api".into(), ResponderConfig::default());
        let reply = fx.client.generate_reply("hi", false, "Ada", "C1").await;
        assert_eq!(reply, text::NETWORK_FALLBACK);
    }

    #[tokio::test]
    async fn history_sent_is_capped() {
        let mut server = mockito::Server::new_async().await;
        let _mock = endpoint_returning(
            &mut server,
            200,
            r#"{"success": true, "response": "ok"}"#,
        )
        .await;

        let fx = fixture(format!("{}/api", server.url()), ResponderConfig::default());
        for i in 0..8 {
            fx.client
                .generate_reply(&format!("m{i}"), false, "Ada", "C1")
                .await;
        }
        let history = fx.state.history("C1");
        assert_eq!(history.len(), crate::state::MAX_HISTORY);
        assert_eq!(history.last(), Some(&ConversationMessage::assistant("ok")));
        assert_eq!(history[0], ConversationMessage::user("m3"));
    }
}
