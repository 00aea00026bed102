//! Tracing subscriber setup.

use keeper_core::config::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_directives(config: &LoggingConfig, verbose: u8) -> String {
    let level = match verbose {
        0 => config.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    format!("keeper={level},tower_http={level}")
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(config: &LoggingConfig, verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config, verbose)));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keeper_core::config::LogLevel;

    #[test]
    fn test_default_directives() {
        let config = LoggingConfig::default();
        assert_eq!(default_directives(&config, 0), "keeper=info,tower_http=info");

        let config = LoggingConfig {
            level: LogLevel::Warn,
            json: false,
        };
        assert_eq!(default_directives(&config, 0), "keeper=warn,tower_http=warn");
        assert_eq!(default_directives(&config, 1), "keeper=debug,tower_http=debug");
        assert_eq!(default_directives(&config, 3), "keeper=trace,tower_http=trace");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LoggingConfig::default();
        init(&config, 0);
        init(&config, 0);
    }
}
