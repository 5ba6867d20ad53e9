//! mediadrain - decode, drain and present core for media track renderers
//!
//! Compressed audio and video packets go in; PCM bytes and decoded
//! pictures come out. Pictures can be handed to the caller or written
//! straight into a native display buffer.
//!
//! The calling layer normally talks to [`bridge`], which reports every
//! outcome as a stable integer code. The typed building blocks underneath
//! are public as well:
//!
//! - [`engine`]: the codec engine capability and its implementations
//! - [`codec`]: an open decoder plus the state needed to reopen it
//! - [`audio`]: the audio drain loop and growable PCM output
//! - [`decoder`]: the video drain loop, frame queue and start-time gate
//! - [`renderer`]: display targets and YV12 presentation

pub mod audio;
pub mod bridge;
pub mod codec;
pub mod decoder;
pub mod engine;
pub mod renderer;
pub mod utils;

pub use bridge::{codes, AudioContext, VideoContext, VideoSettings};
pub use utils::{Config, Error, ErrorKind, Result};

/// Load configuration and initialise logging from it
///
/// Configuration errors fall back to defaults so a bad file never keeps
/// the pipeline from starting.
pub fn init() -> Config {
    let config = match utils::load_config() {
        Ok(config) => config,
        Err(e) => {
            let config = Config::default();
            utils::logging::init(&config.general);
            log::warn!("Using default configuration: {}", e);
            return config;
        }
    };
    utils::logging::init(&config.general);
    log::info!("mediadrain v{} initialised", env!("CARGO_PKG_VERSION"));
    config
}
