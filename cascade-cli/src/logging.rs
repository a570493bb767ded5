//! Inicialização do `tracing`.
//!
//! Os logs vão para stderr; stdout fica livre para dados. `RUST_LOG`, quando
//! definido, tem precedência sobre o nível configurado.

use cascade_core::config::LoggingConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Configura o subscriber global.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Combina a seção `[logging]` com as flags da linha de comando.
pub fn init_from_config(config: &LoggingConfig, verbose: bool, json_logs: bool) {
    let (level, json) = resolve(config, verbose, json_logs);
    init(level, json);
}

fn resolve(config: &LoggingConfig, verbose: bool, json_logs: bool) -> (&str, bool) {
    let level = if verbose && !matches!(config.level.as_str(), "debug" | "trace") {
        "debug"
    } else {
        config.level.as_str()
    };
    (level, json_logs || config.format == "json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_raises_level() {
        let config = LoggingConfig::default();
        assert_eq!(resolve(&config, false, false), ("info", false));
        assert_eq!(resolve(&config, true, false), ("debug", false));
    }

    #[test]
    fn test_verbose_keeps_trace() {
        let config = LoggingConfig {
            level: "trace".into(),
            format: "json".into(),
        };
        assert_eq!(resolve(&config, true, false), ("trace", true));
    }
}
