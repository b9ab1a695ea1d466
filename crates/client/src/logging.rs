//! Tracing subscriber setup for applications embedding the client.

use tracing_subscriber::EnvFilter;

use crate::config::ClientConfig;

/// Build the filter for `level`. `RUST_LOG` wins when it is set.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install a formatting subscriber at `level`.
///
/// Returns false if a global subscriber was already installed, in which case
/// the existing one is kept.
pub fn init(level: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .try_init()
        .is_ok()
}

/// Install a formatting subscriber at the level named by `config`.
pub fn init_from_config(config: &ClientConfig) -> bool {
    init(&config.logging.level)
}
