//! Subscriber setup. Logs go to stderr; stdout carries widget payloads only.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Level picked from the `--debug` / `--info` flags.
pub fn level_from_flags(debug: bool, info: bool) -> Level {
    if debug {
        Level::DEBUG
    } else if info {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
