//! Log subscriber setup

use tracing_subscriber::{fmt, EnvFilter};

use crate::LoggingConfig;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the configured filter. Returns `false` when a
/// subscriber was already installed, which is not an error.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_is_noop() {
        let config = LoggingConfig {
            filter: "persona=debug".to_string(),
            json: false,
        };
        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
