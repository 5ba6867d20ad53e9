//! Integration tests for configuration loading
//!
//! These tests modify process environment variables and run serially.

use anyhow::Result;
use mediadrain::bridge::VideoSettings;
use mediadrain::utils::{Config, ErrorKind};
use mediadrain_integration_tests::TestFixture;
use serial_test::serial;

const ENV_VARS: [&str; 4] = [
    "MEDIADRAIN_LOG_LEVEL",
    "MEDIADRAIN_AUDIO_OUTPUT_FLOAT",
    "MEDIADRAIN_VIDEO_THREADS",
    "MEDIADRAIN_VIDEO_QUEUE_DEPTH",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_file_then_environment() -> Result<()> {
    clear_env();
    let fixture = TestFixture::new()?;
    let path = fixture.write_file(
        "config.toml",
        "[video]\nthread_count = 2\nqueue_warn_depth = 8\n\n[general]\nlog_level = \"debug\"\n",
    )?;

    let config = Config::from_file(&path)?;
    assert_eq!(config.video.thread_count, 2);
    assert_eq!(config.video.queue_warn_depth, 8);
    assert!(!config.audio.output_float);

    std::env::set_var("MEDIADRAIN_VIDEO_THREADS", "6");
    std::env::set_var("MEDIADRAIN_AUDIO_OUTPUT_FLOAT", "true");
    let config = Config::from_file(&path)?;
    clear_env();

    assert_eq!(config.video.thread_count, 6);
    assert!(config.audio.output_float);

    let settings = VideoSettings::from_config(&config.video);
    assert_eq!(settings.thread_count, 6);
    assert_eq!(settings.queue_warn_depth, 8);
    Ok(())
}

#[test]
#[serial]
fn test_invalid_environment_value() -> Result<()> {
    clear_env();
    let fixture = TestFixture::new()?;
    let path = fixture.write_file("config.toml", "")?;

    std::env::set_var("MEDIADRAIN_VIDEO_QUEUE_DEPTH", "lots");
    let result = Config::from_file(&path);
    clear_env();

    let err = result.err().ok_or_else(|| anyhow::anyhow!("bad depth accepted"))?;
    assert_eq!(err.kind(), ErrorKind::Other);
    Ok(())
}

#[test]
#[serial]
fn test_zero_queue_depth_rejected() -> Result<()> {
    clear_env();
    let fixture = TestFixture::new()?;
    let path = fixture.write_file("config.toml", "[video]\nqueue_warn_depth = 0\n")?;

    assert!(Config::from_file(&path).is_err());
    Ok(())
}

#[test]
#[serial]
fn test_save_round_trip() -> Result<()> {
    clear_env();
    let fixture = TestFixture::new()?;
    let path = fixture.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.video.thread_count = 3;
    config.general.log_level = "warn".to_string();
    config.save_to(&path)?;

    let loaded = Config::from_file(&path)?;
    assert_eq!(loaded.video.thread_count, 3);
    assert_eq!(loaded.general.log_level, "warn");
    Ok(())
}
