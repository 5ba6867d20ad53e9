//! Operations exposed to the calling layer
//!
//! Every call here reports its outcome as an integer code the caller's
//! side already understands. The audio and video paths use separate code
//! spaces; see [`codes`].

use crate::audio::{AudioDecoder, OutputBuffer};
use crate::codec::CodecParams;
use crate::decoder::{DrainOutcome, FrameQueue, OutputMode, OutputTimeline, VideoDecoder, VideoOutputBuffer};
use crate::engine::{CodecId, DecodedFrame, DecoderEngine};
use crate::renderer::{present_output, NativeDisplay, PresentationSurface, SurfaceId};
use crate::utils::config::VideoConfig;
use crate::utils::error::{Error, Result};
use crate::utils::ErrorKind;
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Wire codes returned to the calling layer
pub mod codes {
    pub const AUDIO_INVALID_DATA: i32 = -1;
    pub const AUDIO_ERROR: i32 = -2;

    pub const VIDEO_SUCCESS: i32 = 0;
    pub const VIDEO_NEED_MORE: i32 = -1;
    pub const VIDEO_ERROR: i32 = -2;
    pub const VIDEO_NEEDS_DRAIN: i32 = -3;
    pub const VIDEO_INVALID_DATA: i32 = -4;
    pub const VIDEO_DROPPED: i32 = 1;
}

fn audio_code(err: &Error) -> i32 {
    match err.kind() {
        ErrorKind::InvalidData => codes::AUDIO_INVALID_DATA,
        _ => codes::AUDIO_ERROR,
    }
}

fn video_code(err: &Error) -> i32 {
    match err.kind() {
        ErrorKind::NeedsDrainFirst => codes::VIDEO_NEEDS_DRAIN,
        ErrorKind::InvalidData => codes::VIDEO_INVALID_DATA,
        _ => codes::VIDEO_ERROR,
    }
}

fn lookup_codec(name: &str) -> Result<CodecId> {
    CodecId::from_name(name).ok_or_else(|| {
        error!("Unknown codec name {}", name);
        Error::CodecNotFound(name.to_string())
    })
}

/// An open audio decoder
pub struct AudioContext {
    decoder: AudioDecoder,
}

impl AudioContext {
    pub fn decoder(&self) -> &AudioDecoder {
        &self.decoder
    }
}

/// Open an audio decoder by codec name
///
/// `raw_sample_rate` and `raw_channel_count` describe headerless G.711
/// streams; other codecs ignore them.
pub fn initialize_audio(
    engine: Arc<dyn DecoderEngine>,
    codec_name: &str,
    extradata: Option<&[u8]>,
    output_float: bool,
    raw_sample_rate: u32,
    raw_channel_count: u16,
) -> Result<AudioContext> {
    let codec = lookup_codec(codec_name)?;
    let params = CodecParams::audio(output_float).with_raw_pcm(raw_sample_rate, raw_channel_count);
    let decoder = AudioDecoder::open(engine, codec, extradata, params)?;
    info!("Audio context ready for {}", codec);
    Ok(AudioContext { decoder })
}

/// Decode one packet into `output`, returning the bytes written or a
/// negative audio code
pub fn decode_audio(ctx: &mut AudioContext, input: &[u8], output: &mut dyn OutputBuffer) -> i32 {
    match ctx.decoder.decode(input, output) {
        Ok(written) => i32::try_from(written).unwrap_or_else(|_| {
            error!("Decoded {} bytes, more than a single call can report", written);
            codes::AUDIO_ERROR
        }),
        Err(e) => {
            error!("Audio decode failed: {}", e);
            audio_code(&e)
        }
    }
}

/// Flush the decoder, reopening it where flushing is unreliable
///
/// A failed reset closes the context.
pub fn reset_audio(mut ctx: AudioContext, extradata: Option<&[u8]>) -> Result<AudioContext> {
    ctx.decoder.reset(extradata)?;
    Ok(ctx)
}

pub fn release_audio(ctx: AudioContext) {
    debug!("Releasing audio context for {}", ctx.decoder.context().codec());
    drop(ctx);
}

/// Output channel count of the decoder
pub fn channel_count(ctx: &AudioContext) -> Result<u16> {
    ctx.decoder.channel_count()
}

/// Output sample rate of the decoder
pub fn sample_rate(ctx: &AudioContext) -> Result<u32> {
    ctx.decoder.sample_rate()
}

/// Per-context video settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSettings {
    pub thread_count: usize,
    pub rotation_degrees: i32,
    /// Frame size for codecs whose bitstream does not carry one
    pub coded_size: Option<(u32, u32)>,
    pub queue_warn_depth: usize,
}

impl VideoSettings {
    pub fn from_config(config: &VideoConfig) -> Self {
        Self {
            thread_count: config.thread_count,
            rotation_degrees: 0,
            coded_size: None,
            queue_warn_depth: config.queue_warn_depth,
        }
    }
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self::from_config(&VideoConfig::default())
    }
}

/// An open video decoder with its presentation surface
pub struct VideoContext {
    decoder: VideoDecoder,
    surface: PresentationSurface,
}

impl VideoContext {
    pub fn decoder(&self) -> &VideoDecoder {
        &self.decoder
    }

    pub fn surface(&self) -> &PresentationSurface {
        &self.surface
    }

    pub fn rotation_degrees(&self) -> i32 {
        self.decoder.rotation_degrees()
    }

    /// Frames parked in the queue
    pub fn queued_frames(&self) -> usize {
        self.decoder.queue().size()
    }

    fn report_dropped(&self, dropped: u32) {
        if dropped > 0 {
            self.decoder.timeline().add_skipped_frames(dropped);
        }
    }
}

/// Open a video decoder by codec name
pub fn initialize_video(
    engine: Arc<dyn DecoderEngine>,
    display: Arc<dyn NativeDisplay>,
    timeline: Arc<dyn OutputTimeline>,
    codec_name: &str,
    extradata: Option<&[u8]>,
    settings: &VideoSettings,
) -> Result<VideoContext> {
    let codec = lookup_codec(codec_name)?;
    let mut params = CodecParams::video(settings.thread_count);
    if let Some((width, height)) = settings.coded_size {
        params = params.with_geometry(width, height);
    }

    let decoder = VideoDecoder::open(engine.clone(), codec, extradata, params, timeline)?
        .with_queue(Arc::new(FrameQueue::new(settings.queue_warn_depth)))
        .with_rotation(settings.rotation_degrees);
    let surface = PresentationSurface::new(display, engine);

    info!("Video context ready for {} ({} threads)", codec, settings.thread_count);
    Ok(VideoContext { decoder, surface })
}

/// Feed `length` bytes starting at `offset`
pub fn send_video_packet(ctx: &mut VideoContext, bytes: &[u8], offset: usize, length: usize, timestamp: i64) -> i32 {
    let Some(packet) = offset.checked_add(length).and_then(|end| bytes.get(offset..end)) else {
        error!(
            "Packet slice {}+{} outside a {} byte buffer",
            offset,
            length,
            bytes.len()
        );
        return codes::VIDEO_INVALID_DATA;
    };

    match ctx.decoder.send_packet(packet, timestamp) {
        Ok(()) => codes::VIDEO_SUCCESS,
        Err(e) => video_code(&e),
    }
}

/// Deliver the next frame into `slot`, serving queued frames first
///
/// Frames dropped alongside a delivered or queued frame are reported to the
/// timeline. When the call drops everything it returns
/// [`codes::VIDEO_DROPPED`] and reports nothing, so the caller owns that
/// count. Unlike [`decode_video`] the number dropped is not returned; a
/// decode-only call clearing a backlog still yields a single +1.
pub fn receive_video_frame(
    ctx: &mut VideoContext,
    mode: OutputMode,
    decode_only: bool,
    slot: &mut VideoOutputBuffer,
) -> i32 {
    let outcome = match ctx.decoder.receive_batch(decode_only) {
        Ok(outcome) => outcome,
        Err(e) => return video_code(&e),
    };

    match outcome {
        DrainOutcome::Presented { frame, timestamp, dropped } => {
            ctx.report_dropped(dropped);
            deliver(slot, frame, timestamp, mode)
        }
        DrainOutcome::Queued { dropped, .. } => {
            ctx.report_dropped(dropped);
            codes::VIDEO_NEED_MORE
        }
        DrainOutcome::Dropped(count) => {
            debug!("Receive dropped {} frames", count);
            codes::VIDEO_DROPPED
        }
        DrainOutcome::NeedMoreInput => codes::VIDEO_NEED_MORE,
    }
}

/// Feed one packet and drain in the same call
///
/// When every decoded frame was dropped the drop count is returned and the
/// timeline is not told; drops next to a delivered frame are reported.
pub fn decode_video(
    ctx: &mut VideoContext,
    bytes: &[u8],
    timestamp: i64,
    decode_only: bool,
    read_only: bool,
    mode: OutputMode,
    slot: &mut VideoOutputBuffer,
) -> i32 {
    let outcome = match ctx.decoder.send_and_drain(bytes, timestamp, decode_only, read_only) {
        Ok(outcome) => outcome,
        Err(e) => return video_code(&e),
    };

    match outcome {
        DrainOutcome::Presented { frame, timestamp, dropped } => {
            ctx.report_dropped(dropped);
            deliver(slot, frame, timestamp, mode)
        }
        DrainOutcome::Queued { remaining, dropped } => {
            ctx.report_dropped(dropped);
            debug!("Frame queued behind {} others", remaining.saturating_sub(1));
            codes::VIDEO_NEED_MORE
        }
        DrainOutcome::Dropped(count) => i32::try_from(count).unwrap_or(i32::MAX),
        DrainOutcome::NeedMoreInput => codes::VIDEO_NEED_MORE,
    }
}

fn deliver(slot: &mut VideoOutputBuffer, frame: DecodedFrame, timestamp: i64, mode: OutputMode) -> i32 {
    match slot.set_frame(frame, timestamp, mode) {
        Ok(()) => codes::VIDEO_SUCCESS,
        Err(e) => {
            error!("Failed to fill output slot: {}", e);
            codes::VIDEO_ERROR
        }
    }
}

/// Show the frame held by `slot` on `target`
pub fn present_video_frame(ctx: &mut VideoContext, target: Option<SurfaceId>, slot: &mut VideoOutputBuffer) -> i32 {
    match present_output(&mut ctx.surface, target, slot) {
        Ok(()) => codes::VIDEO_SUCCESS,
        Err(e) => {
            error!("Failed to present frame: {}", e);
            codes::VIDEO_ERROR
        }
    }
}

/// Drop the frame `slot` holds without presenting it
pub fn release_video_frame(slot: &mut VideoOutputBuffer) {
    if !slot.release_frame() {
        warn!("Output slot held no frame to release");
    }
}

/// Clear queued frames and flush the decoder, returning the frames released
pub fn reset_video(ctx: &mut VideoContext) -> Result<usize> {
    ctx.decoder.reset()
}

pub fn release_video(mut ctx: VideoContext) {
    ctx.surface.release();
    debug!("Releasing video context for {}", ctx.decoder.context().codec());
}
