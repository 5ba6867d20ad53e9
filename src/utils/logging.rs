//! Logging setup
//!
//! The library itself only emits through the `log` facade; embedding
//! applications and the test harness call [`init`] to get output.

use crate::utils::config::GeneralConfig;
use env_logger::Env;

/// Initialize `env_logger` with the configured default level
///
/// `RUST_LOG` still takes precedence. Calling this more than once is
/// harmless; later calls leave the first logger in place.
pub fn init(config: &GeneralConfig) {
    let result = env_logger::Builder::from_env(Env::default().default_filter_or(config.log_level.as_str()))
        .format_timestamp_millis()
        .try_init();

    if result.is_ok() {
        log::debug!("Logging initialized at level {}", config.log_level);
    }
}
