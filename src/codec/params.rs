//! Decoder open parameters

use crate::engine::SampleFormat;

/// How a video decoder spreads work across threads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadingMode {
    Frame,
    Slice,
}

/// Parameters applied when a decoder is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecParams {
    /// Requested output sample format, S16 or F32
    pub output_format: SampleFormat,

    /// Sample rate forced onto headerless PCM streams
    pub raw_sample_rate: Option<u32>,

    /// Channel count forced onto headerless PCM streams
    pub raw_channel_count: Option<u16>,

    /// Decoder threads; 0 lets the engine decide
    pub thread_count: usize,

    pub threading: ThreadingMode,

    /// Keep decoding through recoverable bitstream errors
    pub ignore_errors: bool,

    /// Coded frame size hint for formats that carry none (0 = unknown)
    pub width: u32,
    pub height: u32,
}

impl CodecParams {
    /// Parameters for an audio decoder
    pub fn audio(output_float: bool) -> Self {
        Self {
            output_format: if output_float { SampleFormat::F32 } else { SampleFormat::S16 },
            raw_sample_rate: None,
            raw_channel_count: None,
            thread_count: 0,
            threading: ThreadingMode::Frame,
            ignore_errors: true,
            width: 0,
            height: 0,
        }
    }

    /// Parameters for a frame-threaded video decoder
    pub fn video(thread_count: usize) -> Self {
        Self {
            thread_count,
            ..Self::audio(false)
        }
    }

    pub fn with_raw_pcm(mut self, sample_rate: u32, channels: u16) -> Self {
        self.raw_sample_rate = Some(sample_rate);
        self.raw_channel_count = Some(channels);
        self
    }

    pub fn with_geometry(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_threading(mut self, threading: ThreadingMode) -> Self {
        self.threading = threading;
        self
    }

    /// Same parameters with the raw PCM overrides removed
    pub fn without_raw_pcm(&self) -> Self {
        Self {
            raw_sample_rate: None,
            raw_channel_count: None,
            ..self.clone()
        }
    }

    pub fn output_is_float(&self) -> bool {
        self.output_format == SampleFormat::F32
    }
}

impl Default for CodecParams {
    fn default() -> Self {
        Self::audio(false)
    }
}
