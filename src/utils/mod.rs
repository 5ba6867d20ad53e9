//! Utility module for mediadrain
//!
//! This module provides common utilities used throughout the crate:
//! - Error handling with custom error types
//! - Configuration management
//! - Logging setup

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used items
pub use config::{AudioConfig, Config, GeneralConfig, VideoConfig};
pub use error::{Error, ErrorKind, Result, ResultExt};

/// Load the pipeline configuration
///
/// Loads configuration from:
/// 1. Default values
/// 2. System configuration file
/// 3. User configuration file
/// 4. Environment variables
pub fn load_config() -> Result<Config> {
    Config::load()
}

/// Round `value` up to the next multiple of `alignment` (a power of two)
pub fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(16, 16), 16);
        assert_eq!(align_up(17, 16), 32);
        assert_eq!(align_up(360, 16), 368);
        assert_eq!(align_up(5, 1), 5);
    }
}
