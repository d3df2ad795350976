use super::{AppConfig, ConfigError};

/// Semantic validation beyond what serde can express.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] describing the first violation found.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.host.trim().is_empty() {
        return Err(ConfigError::Validation(
            "server.host must not be empty".to_string(),
        ));
    }
    if config.server.port == 0 {
        return Err(ConfigError::Validation(
            "server.port must not be 0".to_string(),
        ));
    }

    let chat_url = config.upstream.chat_url.trim();
    if chat_url.is_empty() {
        return Err(ConfigError::Validation(
            "upstream.chat_url must not be empty".to_string(),
        ));
    }
    if !chat_url.starts_with("http://") && !chat_url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "upstream.chat_url must be an http(s) URL, got '{chat_url}'"
        )));
    }
    if config.upstream.timeout == 0 {
        return Err(ConfigError::Validation(
            "upstream.timeout must be at least 1 second".to_string(),
        ));
    }
    if config.upstream.max_buffered_event_bytes == 0 {
        return Err(ConfigError::Validation(
            "upstream.max_buffered_event_bytes must not be 0".to_string(),
        ));
    }

    Ok(())
}
