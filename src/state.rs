use crate::config::AppConfig;
use crate::transport::UpstreamClient;

/// Shared application state accessible to all handlers.
///
/// Holds only immutable configuration and the pooled upstream client;
/// per-request state (reframe buffers, sessions) never lives here.
pub struct AppState {
    pub config: AppConfig,
    pub upstream: UpstreamClient,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, upstream: UpstreamClient) -> Self {
        Self { config, upstream }
    }
}
