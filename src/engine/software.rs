//! Built-in pure-Rust engine
//!
//! Handles the headerless formats that need no codec library: G.711
//! µ-law/A-law audio and raw planar YUV 4:2:0 video. Everything else
//! requires the `ffmpeg` feature.

use super::{
    AudioFrame, AudioSpec, CodecHandle, CodecId, DecodedFrame, DecoderEngine, EngineError, Frame,
    Packet, PixelFormat, PlanarBuffer, ReceiveStatus, SampleFormat, SendStatus,
};
use crate::codec::CodecParams;
use log::{debug, trace};
use once_cell::sync::Lazy;
use std::collections::VecDeque;

/// Decoded pictures a raw video handle holds before refusing input
const MAX_PENDING_PICTURES: usize = 4;

static ULAW_TABLE: Lazy<[i16; 256]> = Lazy::new(|| {
    let mut table = [0i16; 256];
    for (code, slot) in table.iter_mut().enumerate() {
        *slot = ulaw_to_linear(code as u8);
    }
    table
});

static ALAW_TABLE: Lazy<[i16; 256]> = Lazy::new(|| {
    let mut table = [0i16; 256];
    for (code, slot) in table.iter_mut().enumerate() {
        *slot = alaw_to_linear(code as u8);
    }
    table
});

fn ulaw_to_linear(value: u8) -> i16 {
    let value = !value;
    let mut t = (((value & 0x0F) as i32) << 3) + 0x84;
    t <<= (value & 0x70) >> 4;
    if value & 0x80 != 0 {
        (0x84 - t) as i16
    } else {
        (t - 0x84) as i16
    }
}

fn alaw_to_linear(value: u8) -> i16 {
    let value = value ^ 0x55;
    let mut t = (value & 0x0F) as i32;
    let segment = ((value & 0x70) >> 4) as i32;
    if segment != 0 {
        t = (t * 2 + 1 + 32) << (segment + 2);
    } else {
        t = (t * 2 + 1) << 3;
    }
    if value & 0x80 != 0 {
        t as i16
    } else {
        -t as i16
    }
}

/// The pure-Rust engine
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareEngine;

impl SoftwareEngine {
    pub fn new() -> Self {
        Self
    }
}

impl DecoderEngine for SoftwareEngine {
    fn name(&self) -> &str {
        "software"
    }

    fn supports(&self, codec: CodecId) -> bool {
        matches!(codec, CodecId::PcmMulaw | CodecId::PcmAlaw | CodecId::RawVideo)
    }

    fn open(
        &self,
        codec: CodecId,
        _extradata: Option<&[u8]>,
        params: &CodecParams,
    ) -> Result<Box<dyn CodecHandle>, EngineError> {
        match codec {
            CodecId::PcmMulaw | CodecId::PcmAlaw => {
                let (Some(sample_rate), Some(channels)) = (params.raw_sample_rate, params.raw_channel_count) else {
                    return Err(EngineError::Failed(format!(
                        "{} needs an explicit sample rate and channel count",
                        codec
                    )));
                };
                if sample_rate == 0 || channels == 0 {
                    return Err(EngineError::Failed(format!(
                        "invalid {} layout: {} Hz, {} channels",
                        codec, sample_rate, channels
                    )));
                }
                debug!("Opened {} decoder: {} Hz, {} channels", codec, sample_rate, channels);
                Ok(Box::new(G711Handle::new(codec, channels, sample_rate)))
            }
            CodecId::RawVideo => {
                if params.width == 0 || params.height == 0 {
                    return Err(EngineError::Failed("rawvideo needs the coded frame size".to_string()));
                }
                if params.thread_count > 1 {
                    trace!("rawvideo ignores thread count {}", params.thread_count);
                }
                debug!("Opened rawvideo decoder: {}x{}", params.width, params.height);
                Ok(Box::new(RawVideoHandle::new(params.width, params.height)))
            }
            other => Err(EngineError::Unsupported(format!("{} needs the ffmpeg engine", other))),
        }
    }
}

/// µ-law / A-law decoder producing packed 16-bit samples
struct G711Handle {
    codec: CodecId,
    spec: AudioSpec,
    pending: Option<AudioFrame>,
    draining: bool,
}

impl G711Handle {
    fn new(codec: CodecId, channels: u16, sample_rate: u32) -> Self {
        Self {
            codec,
            spec: AudioSpec { format: SampleFormat::S16, channels, sample_rate },
            pending: None,
            draining: false,
        }
    }

    fn table(&self) -> &'static [i16; 256] {
        match self.codec {
            CodecId::PcmAlaw => &ALAW_TABLE,
            _ => &ULAW_TABLE,
        }
    }
}

impl CodecHandle for G711Handle {
    fn codec_id(&self) -> CodecId {
        self.codec
    }

    fn send_packet(&mut self, packet: &Packet<'_>) -> Result<SendStatus, EngineError> {
        if packet.data.is_empty() {
            self.draining = true;
            return Ok(SendStatus::Accepted);
        }
        if self.pending.is_some() {
            return Ok(SendStatus::WouldBlock);
        }

        let block = self.spec.channels as usize;
        let mut data = packet.data;
        if data.len() % block != 0 {
            if data.len() < block {
                return Err(EngineError::InvalidData(format!(
                    "{} byte packet shorter than one {} channel sample",
                    data.len(),
                    block
                )));
            }
            data = &data[..data.len() - data.len() % block];
        }

        let table = self.table();
        let samples: Vec<i16> = data.iter().map(|&code| table[code as usize]).collect();
        let mut frame = AudioFrame::from_s16(&samples, self.spec.channels, self.spec.sample_rate);
        frame.pts = packet.pts;
        self.pending = Some(frame);

        Ok(SendStatus::Accepted)
    }

    fn receive_frame(&mut self) -> Result<ReceiveStatus, EngineError> {
        match self.pending.take() {
            Some(frame) => Ok(ReceiveStatus::Frame(Frame::Audio(frame))),
            None if self.draining => Ok(ReceiveStatus::Eof),
            None => Ok(ReceiveStatus::NeedMore),
        }
    }

    fn flush(&mut self) {
        self.pending = None;
        self.draining = false;
    }

    fn audio_spec(&self) -> Option<AudioSpec> {
        Some(self.spec)
    }
}

/// Raw YUV 4:2:0 pictures, one per packet
struct RawVideoHandle {
    width: u32,
    height: u32,
    pending: VecDeque<DecodedFrame>,
    draining: bool,
}

impl RawVideoHandle {
    fn new(width: u32, height: u32) -> Self {
        Self { width, height, pending: VecDeque::new(), draining: false }
    }

    fn plane_sizes(&self) -> (usize, usize, usize) {
        let luma = self.width as usize;
        let chroma = ((self.width + 1) / 2) as usize;
        let chroma_rows = ((self.height + 1) / 2) as usize;
        (luma * self.height as usize, chroma, chroma * chroma_rows)
    }
}

impl CodecHandle for RawVideoHandle {
    fn codec_id(&self) -> CodecId {
        CodecId::RawVideo
    }

    fn send_packet(&mut self, packet: &Packet<'_>) -> Result<SendStatus, EngineError> {
        if packet.data.is_empty() {
            self.draining = true;
            return Ok(SendStatus::Accepted);
        }
        if self.pending.len() >= MAX_PENDING_PICTURES {
            return Ok(SendStatus::WouldBlock);
        }

        let (luma_size, chroma_stride, chroma_size) = self.plane_sizes();
        let needed = luma_size + 2 * chroma_size;
        if packet.data.len() < needed {
            return Err(EngineError::InvalidData(format!(
                "{} byte packet, {}x{} picture needs {}",
                packet.data.len(),
                self.width,
                self.height,
                needed
            )));
        }

        let (y, rest) = packet.data.split_at(luma_size);
        let (u, rest) = rest.split_at(chroma_size);
        let v = &rest[..chroma_size];
        let buffer = PlanarBuffer {
            planes: [y.to_vec(), u.to_vec(), v.to_vec()],
            strides: [self.width as usize, chroma_stride, chroma_stride],
        };

        self.pending.push_back(DecodedFrame::new(
            packet.pts,
            self.width,
            self.height,
            PixelFormat::Yuv420p,
            Box::new(buffer),
        ));
        Ok(SendStatus::Accepted)
    }

    fn receive_frame(&mut self) -> Result<ReceiveStatus, EngineError> {
        match self.pending.pop_front() {
            Some(frame) => Ok(ReceiveStatus::Frame(Frame::Video(frame))),
            None if self.draining => Ok(ReceiveStatus::Eof),
            None => Ok(ReceiveStatus::NeedMore),
        }
    }

    fn flush(&mut self) {
        self.pending.clear();
        self.draining = false;
    }
}
