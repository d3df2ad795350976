/// `POST /api/chat` — the streaming proxy endpoint.
///
/// Ensures a session cookie, forwards the conversation to the upstream
/// AI-catalog service with `stream: true`, and relays the SSE response
/// through the reframer so every chunk the browser sees ends on an event
/// boundary. Rate-limit headers and 429 payload fields pass through; all
/// other failures surface as structured JSON errors with stable codes.
use std::net::IpAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::session::ensure_session;
use crate::error::{error_body, ErrorCode, ProxyError};
use crate::state::AppState;
use crate::stream::reframe_sse_stream;

/// Marker header telling the Vercel AI SDK client how to parse the stream.
pub const UI_MESSAGE_STREAM_HEADER: &str = "x-vercel-ai-ui-message-stream";

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const RATE_LIMIT_HEADER_PREFIX: &str = "x-ratelimit-";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
}

/// One chat message as the browser client sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_steps: Option<Vec<ProcessStep>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub index: u32,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Like,
    Dislike,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessStep {
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub content: String,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Tool,
    Thinking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Done,
}

pub async fn handler(
    state: Arc<AppState>,
    headers: HeaderMap,
    peer_ip: Option<IpAddr>,
    body: bytes::Bytes,
) -> Response {
    match handler_inner(state, headers, peer_ip, body).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn handler_inner(
    state: Arc<AppState>,
    headers: HeaderMap,
    peer_ip: Option<IpAddr>,
    body: bytes::Bytes,
) -> Result<Response, ProxyError> {
    let request: ChatRequest = serde_json::from_slice(&body)
        .map_err(|err| ProxyError::InvalidRequest(format!("invalid chat request body: {err}")))?;

    let (session_id, set_cookie) = ensure_session(&headers);
    let forwarded_for = headers
        .get(X_FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| peer_ip.map(|ip| ip.to_string()));

    let upstream = state
        .upstream
        .send_chat(&request.messages, &session_id, forwarded_for.as_deref())
        .await?;

    let status = upstream.status();
    let rate_limit_headers = collect_rate_limit_headers(upstream.headers());

    if !status.is_success() {
        let detail = upstream
            .bytes()
            .await
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok());
        return Ok(upstream_error_response(
            status,
            detail,
            rate_limit_headers,
            set_cookie,
        ));
    }

    let reframed = reframe_sse_stream(
        upstream.bytes_stream(),
        state.config.upstream.max_buffered_event_bytes,
    );

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/event-stream")
        .header(CACHE_CONTROL, "no-cache")
        .header(CONNECTION, "keep-alive")
        .header(UI_MESSAGE_STREAM_HEADER, "v1");
    for (name, value) in rate_limit_headers {
        builder = builder.header(name, value);
    }
    if let Some(cookie) = set_cookie {
        builder = builder.header(SET_COOKIE, cookie);
    }

    builder
        .body(Body::from_stream(reframed))
        .map_err(|err| ProxyError::Internal(format!("failed to build response: {err}")))
}

fn upstream_error_response(
    status: StatusCode,
    detail: Option<Value>,
    rate_limit_headers: Vec<(HeaderName, HeaderValue)>,
    set_cookie: Option<String>,
) -> Response {
    let (status, body) = if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!("upstream rate limit hit");
        (StatusCode::TOO_MANY_REQUESTS, rate_limit_body(detail))
    } else {
        tracing::warn!(status = status.as_u16(), "upstream returned an error");
        (status, server_error_body(detail))
    };

    let mut response = (status, axum::Json(body)).into_response();
    let response_headers = response.headers_mut();
    for (name, value) in rate_limit_headers {
        response_headers.insert(name, value);
    }
    if let Some(cookie) = set_cookie {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response_headers.insert(SET_COOKIE, value);
        }
    }
    response
}

/// 429 body: upstream JSON fields are spread in, then `code` is re-pinned so
/// the discriminant stays stable whatever the upstream sent.
fn rate_limit_body(detail: Option<Value>) -> Value {
    let mut body = serde_json::Map::new();
    body.insert(
        "error".to_string(),
        Value::String("요청 한도를 초과했습니다. 잠시 후 다시 시도해주세요.".to_string()),
    );
    if let Some(Value::Object(fields)) = detail {
        for (key, value) in fields {
            body.insert(key, value);
        }
    }
    body.insert(
        "code".to_string(),
        Value::String(ErrorCode::RateLimitExceeded.as_str().to_string()),
    );
    Value::Object(body)
}

fn server_error_body(detail: Option<Value>) -> Value {
    let message = detail
        .as_ref()
        .and_then(|value| value.get("error"))
        .and_then(Value::as_str)
        .unwrap_or("업스트림 요청이 실패했습니다.");
    error_body(ErrorCode::ServerError, message)
}

fn collect_rate_limit_headers(headers: &HeaderMap) -> Vec<(HeaderName, HeaderValue)> {
    headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with(RATE_LIMIT_HEADER_PREFIX))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
