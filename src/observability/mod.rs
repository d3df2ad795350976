use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with the configured log level.
///
/// `RUST_LOG`, when set, takes precedence over the config level so a
/// deployment can turn on targeted debug logging without a config edit.
/// A level of "DISABLED" installs no subscriber at all.
pub fn init_tracing(log_level: &str) {
    if log_level.eq_ignore_ascii_case("disabled") {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(log_level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Translate the config vocabulary into a tracing filter directive.
/// `WARNING` and `CRITICAL` have no direct tracing counterpart and map to
/// `warn` and `error`.
fn filter_directive(log_level: &str) -> String {
    if log_level.eq_ignore_ascii_case("warning") {
        "warn".to_string()
    } else if log_level.eq_ignore_ascii_case("critical") {
        "error".to_string()
    } else {
        log_level.to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_maps_config_levels() {
        assert_eq!(filter_directive("WARNING"), "warn");
        assert_eq!(filter_directive("critical"), "error");
        assert_eq!(filter_directive("INFO"), "info");
        assert_eq!(filter_directive("debug"), "debug");
    }

    #[test]
    fn test_mapped_levels_parse_as_env_filters() {
        for level in ["WARNING", "CRITICAL", "INFO", "DEBUG"] {
            assert!(
                EnvFilter::try_new(filter_directive(level)).is_ok(),
                "level {level} did not produce a valid filter"
            );
        }
    }
}
