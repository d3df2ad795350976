/// Session cookie handling.
///
/// Every chat request is tied to a `session_id` cookie so the upstream can
/// enforce its per-session rate limits. The cookie is minted exactly once:
/// a request already carrying one never triggers a new `Set-Cookie`.
use axum::http::header::COOKIE;
use axum::http::HeaderMap;

pub const SESSION_COOKIE: &str = "session_id";

const SESSION_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// Read the session id from the request's `Cookie` headers, if present.
#[must_use]
pub fn session_from_cookies(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for pair in raw.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            if name.trim() == SESSION_COOKIE && !value.trim().is_empty() {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

/// Resolve the session id for a request.
///
/// Returns the id and, when a new one had to be minted, the `Set-Cookie`
/// header value to attach to the response.
#[must_use]
pub fn ensure_session(headers: &HeaderMap) -> (String, Option<String>) {
    if let Some(id) = session_from_cookies(headers) {
        return (id, None);
    }
    let id = uuid::Uuid::new_v4().to_string();
    let cookie = build_set_cookie(&id);
    (id, Some(cookie))
}

fn build_set_cookie(id: &str) -> String {
    format!(
        "{SESSION_COOKIE}={id}; Max-Age={SESSION_MAX_AGE_SECS}; Path=/; HttpOnly; Secure; SameSite=Strict"
    )
}
