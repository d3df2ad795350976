/// HTTP transport to the upstream AI-catalog service.
///
/// One pooled reqwest client for the process; the chat URL is injected from
/// configuration so tests can point the proxy at a fake upstream.
use std::time::Duration;

use serde_json::json;

use crate::api::chat::Message;
use crate::config::UpstreamConfig;
use crate::error::ProxyError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct UpstreamClient {
    client: reqwest::Client,
    chat_url: String,
}

impl UpstreamClient {
    /// Build the client from upstream configuration.
    ///
    /// Streaming responses must not be bounded by a whole-request timeout,
    /// so only connect and idle-read timeouts apply.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Transport`] when the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: &UpstreamConfig) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .tcp_nodelay(true)
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(Duration::from_secs(config.timeout))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| ProxyError::Transport(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            chat_url: config.chat_url.clone(),
        })
    }

    #[must_use]
    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    /// Forward a conversation upstream with `stream: true`.
    ///
    /// The session id and caller IP ride along as headers so the upstream
    /// can enforce its own rate limits; this proxy never enforces any.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Transport`] when the request cannot be sent.
    /// Non-2xx responses are not errors at this layer; the handler maps them.
    pub async fn send_chat(
        &self,
        messages: &[Message],
        session_id: &str,
        forwarded_for: Option<&str>,
    ) -> Result<reqwest::Response, ProxyError> {
        let payload = json!({
            "messages": messages,
            "stream": true,
        });
        let body = serde_json::to_vec(&payload)
            .map_err(|err| ProxyError::Internal(format!("failed to encode upstream body: {err}")))?;

        let mut request = self
            .client
            .post(&self.chat_url)
            .header("content-type", "application/json")
            .header("x-session-id", session_id)
            .body(body);
        if let Some(ip) = forwarded_for {
            request = request.header("x-forwarded-for", ip);
        }

        request
            .send()
            .await
            .map_err(|err| ProxyError::Transport(format!("upstream request failed: {err}")))
    }
}
