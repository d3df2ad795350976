use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::state::AppState;

/// `GET /` — liveness probe with basic build info.
pub fn handler(state: &Arc<AppState>) -> Response {
    axum::Json(json!({
        "status": "ok",
        "service": "zippt-proxy",
        "version": env!("CARGO_PKG_VERSION"),
        "upstream": state.upstream.chat_url(),
    }))
    .into_response()
}
