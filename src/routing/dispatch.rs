use std::convert::Infallible;
use std::net::IpAddr;
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::api::{chat, feedback, health};
use crate::state::AppState;

const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

enum RouteMatch {
    Health,
    Chat,
    Feedback,
    MethodNotAllowed,
    NotFound,
}

/// Dispatch a raw HTTP request to the matching handler.
///
/// # Errors
///
/// This function currently never returns `Err` and uses `Infallible`.
pub async fn dispatch_request(
    state: Arc<AppState>,
    peer_ip: Option<IpAddr>,
    request: Request<Body>,
) -> Result<Response, Infallible> {
    let (parts, request_body) = request.into_parts();
    let route = match_route(&parts.method, parts.uri.path());

    let response = match route {
        RouteMatch::Health => health::handler(&state),
        RouteMatch::Chat => {
            let body_bytes = match read_request_body(request_body).await {
                Ok(bytes) => bytes,
                Err(response) => return Ok(response),
            };
            chat::handler(state, parts.headers, peer_ip, body_bytes).await
        }
        RouteMatch::Feedback => {
            let body_bytes = match read_request_body(request_body).await {
                Ok(bytes) => bytes,
                Err(response) => return Ok(response),
            };
            feedback::handler(body_bytes).await
        }
        RouteMatch::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        RouteMatch::NotFound => StatusCode::NOT_FOUND.into_response(),
    };

    Ok(response)
}

async fn read_request_body(request_body: Body) -> Result<bytes::Bytes, Response> {
    body::to_bytes(request_body, DEFAULT_BODY_LIMIT_BYTES)
        .await
        .map_err(|_| {
            (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large (max 1MiB)",
            )
                .into_response()
        })
}

fn match_route(method: &Method, path: &str) -> RouteMatch {
    match path {
        "/" => {
            if method == Method::GET {
                RouteMatch::Health
            } else {
                RouteMatch::MethodNotAllowed
            }
        }
        "/api/chat" => {
            if method == Method::POST {
                RouteMatch::Chat
            } else {
                RouteMatch::MethodNotAllowed
            }
        }
        "/api/feedback" => {
            if method == Method::POST {
                RouteMatch::Feedback
            } else {
                RouteMatch::MethodNotAllowed
            }
        }
        _ => RouteMatch::NotFound,
    }
}
