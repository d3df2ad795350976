/// `POST /api/feedback` — message feedback acknowledgement.
///
/// There is no persistence in this service; feedback is logged for later
/// collection from the structured logs and acknowledged to the client.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{error_body, ErrorCode};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackRequest {
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    feedback: Option<Value>,
}

pub async fn handler(body: bytes::Bytes) -> Response {
    let request: FeedbackRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(error_body(
                    ErrorCode::InvalidRequest,
                    &format!("invalid feedback body: {err}"),
                )),
            )
                .into_response();
        }
    };

    let Some(message_id) = request.message_id.filter(|id| !id.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            axum::Json(error_body(ErrorCode::InvalidRequest, "messageId is required")),
        )
            .into_response();
    };

    let feedback = request.feedback.unwrap_or(Value::Null);
    tracing::info!(message_id = %message_id, feedback = %feedback, "feedback received");

    axum::Json(json!({
        "success": true,
        "messageId": message_id,
        "feedback": feedback,
    }))
    .into_response()
}
