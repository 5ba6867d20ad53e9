//! Integration tests for the video path
//!
//! These tests verify:
//! - Start-time dropping and skipped-frame reporting
//! - Frame queue behaviour across receive calls and resets
//! - Presentation into YV12 buffers, scaler reuse and target rebinding

use anyhow::Result;
use mediadrain::bridge::{self, codes, VideoContext, VideoSettings};
use mediadrain::decoder::{OutputMode, OutputTimeline, StartTimeGate, VideoOutputBuffer};
use mediadrain::engine::{DecoderEngine, PixelFormat, SoftwareEngine};
use mediadrain::renderer::{NativeDisplay, NativeWindow, SurfaceError, SurfaceId};
use mediadrain_integration_tests::{media, perf_test::PerfMeasure, MemoryDisplay};
use mockall::mock;
use mockall::predicate::eq;
use std::sync::Arc;

mock! {
    pub Timeline {}

    impl OutputTimeline for Timeline {
        fn is_at_least_start_time(&self, timestamp: i64) -> bool;
        fn add_skipped_frames(&self, count: u32);
    }
}

mock! {
    pub Display {}

    impl NativeDisplay for Display {
        fn acquire_target(&self, id: SurfaceId) -> std::result::Result<Box<dyn NativeWindow>, SurfaceError>;
    }
}

const WIDTH: u32 = 8;
const HEIGHT: u32 = 4;

fn engine() -> Arc<dyn DecoderEngine> {
    Arc::new(SoftwareEngine::new())
}

fn settings() -> VideoSettings {
    VideoSettings {
        coded_size: Some((WIDTH, HEIGHT)),
        ..VideoSettings::default()
    }
}

fn open(timeline: Arc<dyn OutputTimeline>, display: Arc<dyn NativeDisplay>) -> Result<VideoContext> {
    Ok(bridge::initialize_video(engine(), display, timeline, "rawvideo", None, &settings())?)
}

fn picture() -> Vec<u8> {
    media::yuv420_picture(WIDTH, HEIGHT, (90, 240))
}

fn send(ctx: &mut VideoContext, timestamp: i64) -> i32 {
    let data = picture();
    bridge::send_video_packet(ctx, &data, 0, data.len(), timestamp)
}

#[test]
fn test_early_frame_dropped_without_queueing() -> Result<()> {
    let mut timeline = MockTimeline::new();
    timeline.expect_is_at_least_start_time().with(eq(10)).return_const(false);
    timeline.expect_add_skipped_frames().never();

    let mut ctx = open(Arc::new(timeline), Arc::new(MemoryDisplay::new()))?;
    let mut slot = VideoOutputBuffer::new();

    let code = bridge::decode_video(&mut ctx, &picture(), 10, false, false, OutputMode::SurfaceYuv, &mut slot);
    assert_eq!(code, 1);
    assert_eq!(ctx.queued_frames(), 0);
    assert!(!slot.has_frame());
    Ok(())
}

#[test]
fn test_receive_dropping_everything_leaves_count_to_caller() -> Result<()> {
    let mut timeline = MockTimeline::new();
    timeline.expect_is_at_least_start_time().return_const(false);
    timeline.expect_add_skipped_frames().never();

    let mut ctx = open(Arc::new(timeline), Arc::new(MemoryDisplay::new()))?;
    for timestamp in [10, 20, 30] {
        assert_eq!(send(&mut ctx, timestamp), codes::VIDEO_SUCCESS);
    }

    let mut slot = VideoOutputBuffer::new();
    assert_eq!(
        bridge::receive_video_frame(&mut ctx, OutputMode::Yuv, false, &mut slot),
        codes::VIDEO_DROPPED
    );
    assert_eq!(ctx.queued_frames(), 0);
    assert!(!slot.has_frame());
    Ok(())
}

#[test]
fn test_batched_receive_reports_drops() -> Result<()> {
    let mut timeline = MockTimeline::new();
    timeline
        .expect_is_at_least_start_time()
        .returning(|timestamp| timestamp >= 100);
    timeline.expect_add_skipped_frames().with(eq(2)).times(1).return_const(());

    let mut ctx = open(Arc::new(timeline), Arc::new(MemoryDisplay::new()))?;
    for timestamp in [40, 80, 100, 140] {
        assert_eq!(send(&mut ctx, timestamp), codes::VIDEO_SUCCESS);
    }

    let mut slot = VideoOutputBuffer::new();
    assert_eq!(bridge::receive_video_frame(&mut ctx, OutputMode::Yuv, false, &mut slot), 0);
    assert_eq!(slot.timestamp(), 100);
    assert_eq!(ctx.queued_frames(), 1);

    assert_eq!(bridge::receive_video_frame(&mut ctx, OutputMode::Yuv, false, &mut slot), 0);
    assert_eq!(slot.timestamp(), 140);
    assert_eq!(slot.yuv_strides(), [WIDTH as usize, WIDTH as usize / 2]);
    Ok(())
}

#[test]
fn test_decoder_full_until_drained() -> Result<()> {
    let gate = Arc::new(StartTimeGate::new());
    let mut ctx = open(gate, Arc::new(MemoryDisplay::new()))?;

    let mut timestamp = 0;
    while send(&mut ctx, timestamp) == codes::VIDEO_SUCCESS {
        timestamp += 1;
        assert!(timestamp < 64, "decoder never pushed back");
    }
    assert_eq!(send(&mut ctx, timestamp), codes::VIDEO_NEEDS_DRAIN);

    let mut slot = VideoOutputBuffer::new();
    assert_eq!(bridge::receive_video_frame(&mut ctx, OutputMode::None, false, &mut slot), 0);
    assert_eq!(send(&mut ctx, timestamp), codes::VIDEO_SUCCESS);
    Ok(())
}

#[test]
fn test_reset_releases_queued_frames() -> Result<()> {
    let gate = Arc::new(StartTimeGate::new());
    let mut ctx = open(gate, Arc::new(MemoryDisplay::new()))?;
    for timestamp in 0..4 {
        assert_eq!(send(&mut ctx, timestamp), codes::VIDEO_SUCCESS);
    }

    let mut slot = VideoOutputBuffer::new();
    assert_eq!(bridge::receive_video_frame(&mut ctx, OutputMode::SurfaceYuv, false, &mut slot), 0);
    assert_eq!(ctx.queued_frames(), 3);

    assert_eq!(bridge::reset_video(&mut ctx)?, 3);
    assert_eq!(ctx.queued_frames(), 0);

    // Flushing again changes nothing
    assert_eq!(bridge::reset_video(&mut ctx)?, 0);
    assert_eq!(
        bridge::receive_video_frame(&mut ctx, OutputMode::SurfaceYuv, false, &mut slot),
        codes::VIDEO_NEED_MORE
    );

    // The frame already delivered is untouched by the reset
    assert!(slot.has_frame());
    Ok(())
}

#[test]
fn test_present_writes_yv12() -> Result<()> {
    let display = MemoryDisplay::new();
    let mut ctx = open(Arc::new(StartTimeGate::new()), Arc::new(display.clone()))?;
    let mut slot = VideoOutputBuffer::new();

    for timestamp in [0, 33] {
        let code = bridge::decode_video(&mut ctx, &picture(), timestamp, false, false, OutputMode::SurfaceYuv, &mut slot);
        assert_eq!(code, 0);
        assert_eq!(bridge::present_video_frame(&mut ctx, Some(SurfaceId(5)), &mut slot), 0);
    }

    assert_eq!(ctx.surface().scaler_builds(), 1);
    assert_eq!(display.geometry_changes(), 1);
    assert_eq!(display.last_geometry(), Some((SurfaceId(5), WIDTH, HEIGHT, PixelFormat::Yv12)));

    let posted = display.posted();
    assert_eq!(posted.len(), 2);
    let buffer = &posted[1];
    assert_eq!(buffer.stride, 32);

    // Luma rows at the buffer stride, then V, then U
    assert_eq!(&buffer.bits[0..8], &[0, 31, 63, 95, 127, 159, 191, 223]);
    assert_eq!(&buffer.bits[32..40], &buffer.bits[0..8]);
    let y_size = 32 * HEIGHT as usize;
    let v_size = 16 * 2;
    assert_eq!(&buffer.bits[y_size..y_size + 4], &[240; 4]);
    assert_eq!(&buffer.bits[y_size + v_size..y_size + v_size + 4], &[90; 4]);
    Ok(())
}

#[test]
fn test_present_survives_one_invalidation() -> Result<()> {
    let display = MemoryDisplay::new();
    let mut ctx = open(Arc::new(StartTimeGate::new()), Arc::new(display.clone()))?;
    let mut slot = VideoOutputBuffer::new();
    slot.retain_after_present = true;
    bridge::decode_video(&mut ctx, &picture(), 0, false, false, OutputMode::SurfaceYuv, &mut slot);

    display.invalidate_next_locks(1);
    assert_eq!(bridge::present_video_frame(&mut ctx, Some(SurfaceId(1)), &mut slot), 0);
    assert_eq!(display.acquired(), vec![SurfaceId(1), SurfaceId(1)]);

    display.invalidate_next_locks(2);
    assert_eq!(
        bridge::present_video_frame(&mut ctx, Some(SurfaceId(1)), &mut slot),
        codes::VIDEO_ERROR
    );
    assert!(slot.has_frame());
    assert_eq!(display.posted().len(), 1);
    Ok(())
}

#[test]
fn test_switching_targets_rebinds() -> Result<()> {
    let display = MemoryDisplay::new();
    let mut ctx = open(Arc::new(StartTimeGate::new()), Arc::new(display.clone()))?;
    let mut slot = VideoOutputBuffer::new();
    slot.retain_after_present = true;
    bridge::decode_video(&mut ctx, &picture(), 0, false, false, OutputMode::SurfaceYuv, &mut slot);

    for target in [1, 1, 2, 2, 1] {
        assert_eq!(bridge::present_video_frame(&mut ctx, Some(SurfaceId(target)), &mut slot), 0);
    }

    assert_eq!(display.acquired(), vec![SurfaceId(1), SurfaceId(2), SurfaceId(1)]);
    assert_eq!(display.geometry_changes(), 3);
    assert_eq!(ctx.surface().scaler_builds(), 1);
    Ok(())
}

#[test]
fn test_unavailable_target_keeps_frame() -> Result<()> {
    let mut display = MockDisplay::new();
    display
        .expect_acquire_target()
        .with(eq(SurfaceId(9)))
        .times(2)
        .returning(|id| Err(SurfaceError::Unavailable(id)));

    let mut ctx = open(Arc::new(StartTimeGate::new()), Arc::new(display))?;
    let mut slot = VideoOutputBuffer::new();
    bridge::decode_video(&mut ctx, &picture(), 0, false, false, OutputMode::SurfaceYuv, &mut slot);

    for _ in 0..2 {
        assert_eq!(
            bridge::present_video_frame(&mut ctx, Some(SurfaceId(9)), &mut slot),
            codes::VIDEO_ERROR
        );
    }
    assert!(slot.has_frame());

    bridge::release_video_frame(&mut slot);
    assert!(!slot.has_frame());
    Ok(())
}

#[test]
fn test_present_throughput() -> Result<()> {
    let display = MemoryDisplay::new();
    let mut ctx = open(Arc::new(StartTimeGate::new()), Arc::new(display.clone()))?;
    let mut slot = VideoOutputBuffer::new();
    slot.retain_after_present = true;
    bridge::decode_video(&mut ctx, &picture(), 0, false, false, OutputMode::SurfaceYuv, &mut slot);

    let mut perf = PerfMeasure::new("present 8x4");
    for _ in 0..100 {
        perf.start();
        assert_eq!(bridge::present_video_frame(&mut ctx, Some(SurfaceId(1)), &mut slot), 0);
        perf.stop();
    }
    perf.report();

    assert_eq!(display.posted().len(), 100);
    Ok(())
}
