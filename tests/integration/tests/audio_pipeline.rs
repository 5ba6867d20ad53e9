//! Integration tests for the audio path
//!
//! These tests verify:
//! - G.711 decoding through the exposed operations
//! - Integer and float output sizing
//! - Output buffer growth and its failure code
//! - Reset and stream property queries

use anyhow::Result;
use mediadrain::audio::{GrowableBuffer, OutputBuffer};
use mediadrain::bridge::{self, codes};
use mediadrain::engine::{DecoderEngine, SoftwareEngine};
use mediadrain_integration_tests::media;
use std::sync::Arc;

fn engine() -> Arc<dyn DecoderEngine> {
    Arc::new(SoftwareEngine::new())
}

#[test]
fn test_mulaw_expands_to_16_bit() -> Result<()> {
    let mut ctx = bridge::initialize_audio(engine(), "pcm_mulaw", None, false, 8000, 1)?;
    let mut output = GrowableBuffer::with_capacity(0);
    let packet = media::mulaw_tone(160);

    assert_eq!(bridge::decode_audio(&mut ctx, &packet, &mut output), 320);
    assert_eq!(output.grow_requests(), &[320]);

    // Decoded tone stays within one quantisation step of the source
    let decoded: Vec<i16> = output.as_slice()[..320]
        .chunks_exact(2)
        .map(|pair| i16::from_ne_bytes([pair[0], pair[1]]))
        .collect();
    for (n, sample) in decoded.iter().enumerate() {
        let expected = ((n as f32 / 8000.0) * 440.0 * std::f32::consts::TAU).sin() * 8000.0;
        assert!((*sample as f32 - expected).abs() < 300.0, "sample {} = {}, expected {}", n, sample, expected);
    }

    bridge::release_audio(ctx);
    Ok(())
}

#[test]
fn test_output_is_whole_sample_frames() -> Result<()> {
    for (channels, float) in [(1u16, false), (2, false), (1, true), (2, true)] {
        let mut ctx = bridge::initialize_audio(engine(), "pcm_alaw", None, float, 16000, channels)?;
        let mut output = GrowableBuffer::with_capacity(0);

        let written = bridge::decode_audio(&mut ctx, &[0x55; 241], &mut output);
        let sample_bytes = if float { 4 } else { 2 };
        let frame_bytes = sample_bytes * channels as i32;
        assert!(written > 0);
        assert_eq!(written % frame_bytes, 0, "{} channels, float {}", channels, float);
        assert_eq!(bridge::channel_count(&ctx)?, channels);
        assert_eq!(bridge::sample_rate(&ctx)?, 16000);
    }
    Ok(())
}

#[test]
fn test_existing_capacity_is_reused() -> Result<()> {
    let mut ctx = bridge::initialize_audio(engine(), "pcm_mulaw", None, false, 8000, 1)?;
    let mut output = GrowableBuffer::with_capacity(4096);

    assert_eq!(bridge::decode_audio(&mut ctx, &media::mulaw_tone(100), &mut output), 200);
    assert!(output.grow_requests().is_empty());
    assert_eq!(output.capacity(), 4096);
    Ok(())
}

#[test]
fn test_growth_failure_is_reported() -> Result<()> {
    let mut ctx = bridge::initialize_audio(engine(), "pcm_mulaw", None, false, 8000, 1)?;
    let mut output = GrowableBuffer::with_capacity(0).with_limit(64);

    assert_eq!(
        bridge::decode_audio(&mut ctx, &media::mulaw_tone(160), &mut output),
        codes::AUDIO_ERROR
    );
    Ok(())
}

#[test]
fn test_invalid_packet_and_recovery() -> Result<()> {
    let mut ctx = bridge::initialize_audio(engine(), "pcm_mulaw", None, false, 8000, 2)?;
    let mut output = GrowableBuffer::with_capacity(0);

    assert_eq!(bridge::decode_audio(&mut ctx, &[0xff], &mut output), codes::AUDIO_INVALID_DATA);

    // The next packet decodes normally
    assert_eq!(bridge::decode_audio(&mut ctx, &[0xff; 8], &mut output), 16);
    Ok(())
}

#[test]
fn test_reset_keeps_context_usable() -> Result<()> {
    let ctx = bridge::initialize_audio(engine(), "pcm_mulaw", None, true, 8000, 1)?;
    let mut ctx = bridge::reset_audio(ctx, Some(&[1, 2, 3]))?;
    let mut output = GrowableBuffer::with_capacity(0);

    assert_eq!(bridge::decode_audio(&mut ctx, &[0xff; 10], &mut output), 40);
    Ok(())
}

#[test]
fn test_missing_raw_layout_fails_to_open() {
    assert!(bridge::initialize_audio(engine(), "pcm_mulaw", None, false, 0, 0).is_err());
    assert!(bridge::initialize_audio(engine(), "truehd", None, false, 48000, 2).is_err());
}
