//! Codec engine capability
//!
//! The decode pipeline never talks to a codec library directly. It consumes
//! the small capability surface defined here: open a codec, feed packets,
//! pull frames, flush, plus sample-format conversion and planar scaling.
//! [`software::SoftwareEngine`] implements it in pure Rust for the raw
//! formats; the `ffmpeg` feature adds an FFmpeg-backed engine.

mod convert;
pub mod software;

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

pub use convert::{PlanarScaler, SampleConverter};
pub use software::SoftwareEngine;

use crate::codec::CodecParams;
use std::fmt;
use thiserror::Error;

/// Errors reported by an engine, before translation into [`crate::Error`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The bitstream is malformed
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// An allocation inside the engine failed
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// The engine cannot handle this codec or format
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Any other engine failure
    #[error("{0}")]
    Failed(String),
}

/// Identifier of a decoder, by its engine-level name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    PcmMulaw,
    PcmAlaw,
    TrueHd,
    Aac,
    Mp3,
    Flac,
    Alac,
    Opus,
    Vorbis,
    Ac3,
    Eac3,
    Dts,
    RawVideo,
    H264,
    Hevc,
    Mpeg2,
    Mpeg4,
    Vp8,
    Vp9,
    Av1,
}

/// Whether a codec produces audio or video frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Audio,
    Video,
}

const CODEC_NAMES: &[(CodecId, &str)] = &[
    (CodecId::PcmMulaw, "pcm_mulaw"),
    (CodecId::PcmAlaw, "pcm_alaw"),
    (CodecId::TrueHd, "truehd"),
    (CodecId::Aac, "aac"),
    (CodecId::Mp3, "mp3"),
    (CodecId::Flac, "flac"),
    (CodecId::Alac, "alac"),
    (CodecId::Opus, "opus"),
    (CodecId::Vorbis, "vorbis"),
    (CodecId::Ac3, "ac3"),
    (CodecId::Eac3, "eac3"),
    (CodecId::Dts, "dca"),
    (CodecId::RawVideo, "rawvideo"),
    (CodecId::H264, "h264"),
    (CodecId::Hevc, "hevc"),
    (CodecId::Mpeg2, "mpeg2video"),
    (CodecId::Mpeg4, "mpeg4"),
    (CodecId::Vp8, "vp8"),
    (CodecId::Vp9, "vp9"),
    (CodecId::Av1, "av1"),
];

impl CodecId {
    /// Look a codec up by its decoder name
    pub fn from_name(name: &str) -> Option<Self> {
        CODEC_NAMES
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(id, _)| *id)
    }

    /// Decoder name understood by the engines
    pub fn name(&self) -> &'static str {
        CODEC_NAMES
            .iter()
            .find(|(id, _)| id == self)
            .map(|(_, n)| *n)
            .unwrap_or("unknown")
    }

    pub fn media_type(&self) -> MediaType {
        match self {
            CodecId::RawVideo
            | CodecId::H264
            | CodecId::Hevc
            | CodecId::Mpeg2
            | CodecId::Mpeg4
            | CodecId::Vp8
            | CodecId::Vp9
            | CodecId::Av1 => MediaType::Video,
            _ => MediaType::Audio,
        }
    }

    /// G.711 streams carry no header, so rate and layout come from the caller
    pub fn takes_raw_pcm_overrides(&self) -> bool {
        matches!(self, CodecId::PcmMulaw | CodecId::PcmAlaw)
    }

    /// Codecs whose internal flush leaves stale prediction state behind
    pub fn flush_requires_reopen(&self) -> bool {
        matches!(self, CodecId::TrueHd)
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// PCM sample formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    U8,
    S16,
    S32,
    F32,
    U8Planar,
    S16Planar,
    S32Planar,
    F32Planar,
}

impl SampleFormat {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::U8Planar => 1,
            SampleFormat::S16 | SampleFormat::S16Planar => 2,
            SampleFormat::S32 | SampleFormat::S32Planar
            | SampleFormat::F32 | SampleFormat::F32Planar => 4,
        }
    }

    pub fn is_planar(&self) -> bool {
        matches!(
            self,
            SampleFormat::U8Planar | SampleFormat::S16Planar
                | SampleFormat::S32Planar | SampleFormat::F32Planar
        )
    }

    /// Output formats the pipeline may be asked to produce
    pub fn is_output_format(&self) -> bool {
        matches!(self, SampleFormat::S16 | SampleFormat::F32)
    }
}

/// Sample format, channel count and rate of an audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioSpec {
    pub format: SampleFormat,
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioSpec {
    /// Bytes occupied by one sample across all channels
    pub fn frame_bytes(&self) -> usize {
        self.format.bytes_per_sample() * self.channels as usize
    }
}

/// Pixel formats understood by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Planar 4:2:0, limited range
    Yuv420p,
    /// Planar 4:2:0, full range
    Yuvj420p,
    /// Planar 4:2:0 with V before U; the native display layout
    Yv12,
}

impl PixelFormat {
    /// FOURCC the native display expects for this layout
    pub fn fourcc(&self) -> Option<u32> {
        match self {
            PixelFormat::Yv12 => Some(0x3231_5659),
            _ => None,
        }
    }
}

/// A unit of compressed input
#[derive(Debug, Clone, Copy)]
pub struct Packet<'a> {
    pub data: &'a [u8],
    pub pts: Option<i64>,
}

impl<'a> Packet<'a> {
    pub fn new(data: &'a [u8], pts: Option<i64>) -> Self {
        Self { data, pts }
    }
}

/// Decoded PCM samples
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Format of the samples as decoded
    pub spec: AudioSpec,

    /// Samples per channel
    pub samples: usize,

    /// One plane for packed formats, one per channel for planar formats
    pub planes: Vec<Vec<u8>>,

    pub pts: Option<i64>,
}

impl AudioFrame {
    /// Build a packed 16-bit frame from interleaved samples
    pub fn from_s16(interleaved: &[i16], channels: u16, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        Self {
            spec: AudioSpec { format: SampleFormat::S16, channels, sample_rate },
            samples: interleaved.len() / channels as usize,
            planes: vec![bytemuck::cast_slice::<i16, u8>(interleaved).to_vec()],
            pts: None,
        }
    }

    /// Build a planar float frame from one slice per channel
    pub fn from_f32_planar(channels: &[&[f32]], sample_rate: u32) -> Self {
        let samples = channels.first().map(|c| c.len()).unwrap_or(0);
        Self {
            spec: AudioSpec {
                format: SampleFormat::F32Planar,
                channels: channels.len() as u16,
                sample_rate,
            },
            samples,
            planes: channels.iter().map(|c| bytemuck::cast_slice::<f32, u8>(c).to_vec()).collect(),
            pts: None,
        }
    }
}

/// Storage behind a decoded picture
///
/// Engines hand out their own frame objects behind this trait so frames can
/// move between the engine, the queue and the caller's output slot without
/// copying pixel data. Dropping the box releases the frame.
pub trait FrameBuffer: Send {
    /// Bytes of plane `index` (0 = Y, 1 = U, 2 = V)
    fn plane(&self, index: usize) -> &[u8];

    /// Row stride of plane `index` in bytes
    fn stride(&self, index: usize) -> usize;
}

/// Plain heap-backed planar storage
#[derive(Debug, Clone, Default)]
pub struct PlanarBuffer {
    pub planes: [Vec<u8>; 3],
    pub strides: [usize; 3],
}

impl FrameBuffer for PlanarBuffer {
    fn plane(&self, index: usize) -> &[u8] {
        self.planes.get(index).map(|p| p.as_slice()).unwrap_or(&[])
    }

    fn stride(&self, index: usize) -> usize {
        self.strides.get(index).copied().unwrap_or(0)
    }
}

/// A decoded picture
pub struct DecodedFrame {
    /// Presentation timestamp; `None` or negative means unset
    pub pts: Option<i64>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    buffer: Box<dyn FrameBuffer>,
}

impl DecodedFrame {
    pub fn new(
        pts: Option<i64>,
        width: u32,
        height: u32,
        format: PixelFormat,
        buffer: Box<dyn FrameBuffer>,
    ) -> Self {
        Self { pts, width, height, format, buffer }
    }

    /// Timestamp used for start-time checks: the frame's own, else the packet's
    pub fn effective_timestamp(&self, input_pts: i64) -> i64 {
        match self.pts {
            Some(pts) if pts >= 0 => pts,
            _ => input_pts,
        }
    }

    pub fn plane(&self, index: usize) -> &[u8] {
        self.buffer.plane(index)
    }

    pub fn stride(&self, index: usize) -> usize {
        self.buffer.stride(index)
    }

    /// Height of the chroma planes
    pub fn chroma_height(&self) -> u32 {
        (self.height + 1) / 2
    }
}

impl fmt::Debug for DecodedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedFrame")
            .field("pts", &self.pts)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("strides", &[self.stride(0), self.stride(1), self.stride(2)])
            .finish()
    }
}

/// Output of a codec handle
#[derive(Debug)]
pub enum Frame {
    Audio(AudioFrame),
    Video(DecodedFrame),
}

/// Result of feeding a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Accepted,
    /// Output must be drained before this packet can be accepted
    WouldBlock,
}

/// Result of asking for a frame
#[derive(Debug)]
pub enum ReceiveStatus {
    Frame(Frame),
    /// No output until more input arrives
    NeedMore,
    /// The decoder has been fully drained
    Eof,
}

/// An open decoder instance
pub trait CodecHandle: Send {
    fn codec_id(&self) -> CodecId;

    /// Feed one packet. An empty packet signals end of stream.
    fn send_packet(&mut self, packet: &Packet<'_>) -> Result<SendStatus, EngineError>;

    /// Pull the next decoded frame
    fn receive_frame(&mut self) -> Result<ReceiveStatus, EngineError>;

    /// Discard all buffered input and output
    fn flush(&mut self);

    /// Current audio output layout, for audio decoders
    fn audio_spec(&self) -> Option<AudioSpec> {
        None
    }
}

/// Converts decoded audio into the requested output format
pub trait Resampler: Send {
    /// Upper bound of output samples per channel for `input_samples` of input
    fn output_samples(&self, input_samples: usize) -> usize;

    /// Convert `frame` into `output`, returning samples per channel written
    fn convert(&mut self, frame: &AudioFrame, output: &mut [u8]) -> Result<usize, EngineError>;

    /// Samples still buffered inside the resampler
    fn pending_samples(&self) -> usize;
}

/// Source and destination of a planar conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScaleSpec {
    pub src_format: PixelFormat,
    pub dst_format: PixelFormat,
    pub width: u32,
    pub height: u32,
}

/// One writable destination plane
pub struct PlaneMut<'a> {
    pub data: &'a mut [u8],
    pub stride: usize,
}

/// Converts a decoded picture into destination planes
pub trait Scaler: Send {
    /// Write `rows` luma rows (and the matching chroma rows) of `src` into
    /// `dst`, which is ordered Y, U, V
    fn scale(&mut self, src: &DecodedFrame, dst: [PlaneMut<'_>; 3], rows: u32) -> Result<(), EngineError>;
}

/// The codec engine capability
pub trait DecoderEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Whether `open` can succeed for this codec at all
    fn supports(&self, codec: CodecId) -> bool;

    /// Allocate and open a decoder. `extradata` is copied by the engine.
    fn open(
        &self,
        codec: CodecId,
        extradata: Option<&[u8]>,
        params: &CodecParams,
    ) -> Result<Box<dyn CodecHandle>, EngineError>;

    fn create_resampler(&self, input: AudioSpec, output: AudioSpec) -> Result<Box<dyn Resampler>, EngineError> {
        Ok(Box::new(SampleConverter::new(input, output)?))
    }

    fn create_scaler(&self, spec: ScaleSpec) -> Result<Box<dyn Scaler>, EngineError> {
        Ok(Box::new(PlanarScaler::new(spec)?))
    }
}
