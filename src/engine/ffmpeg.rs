//! FFmpeg-backed engine
//!
//! Wraps `ffmpeg-next` decoders behind [`CodecHandle`]. Decoded pictures
//! stay in FFmpeg-owned frames; [`FfmpegPicture`] hands them to the
//! pipeline without copying planes.

use super::{
    AudioFrame, AudioSpec, CodecHandle, CodecId, DecodedFrame, DecoderEngine, EngineError, Frame,
    FrameBuffer, MediaType, Packet, PixelFormat, ReceiveStatus, SampleFormat, SendStatus,
};
use crate::codec::{CodecParams, ThreadingMode};
use ffmpeg_next as ffmpeg;
use ffmpeg_next::{codec, ffi, format, frame};
use log::{debug, info};

/// `AV_EF_IGNORE_ERR`: keep decoding through recoverable bitstream errors
const IGNORE_RECOVERABLE_ERRORS: i32 = 1 << 15;

fn ffmpeg_codec_id(id: CodecId) -> codec::Id {
    match id {
        CodecId::PcmMulaw => codec::Id::PCM_MULAW,
        CodecId::PcmAlaw => codec::Id::PCM_ALAW,
        CodecId::TrueHd => codec::Id::TRUEHD,
        CodecId::Aac => codec::Id::AAC,
        CodecId::Mp3 => codec::Id::MP3,
        CodecId::Flac => codec::Id::FLAC,
        CodecId::Alac => codec::Id::ALAC,
        CodecId::Opus => codec::Id::OPUS,
        CodecId::Vorbis => codec::Id::VORBIS,
        CodecId::Ac3 => codec::Id::AC3,
        CodecId::Eac3 => codec::Id::EAC3,
        CodecId::Dts => codec::Id::DTS,
        CodecId::RawVideo => codec::Id::RAWVIDEO,
        CodecId::H264 => codec::Id::H264,
        CodecId::Hevc => codec::Id::HEVC,
        CodecId::Mpeg2 => codec::Id::MPEG2VIDEO,
        CodecId::Mpeg4 => codec::Id::MPEG4,
        CodecId::Vp8 => codec::Id::VP8,
        CodecId::Vp9 => codec::Id::VP9,
        CodecId::Av1 => codec::Id::AV1,
    }
}

fn sample_format(format: format::Sample) -> Option<SampleFormat> {
    use format::sample::Type;

    Some(match format {
        format::Sample::U8(Type::Packed) => SampleFormat::U8,
        format::Sample::U8(Type::Planar) => SampleFormat::U8Planar,
        format::Sample::I16(Type::Packed) => SampleFormat::S16,
        format::Sample::I16(Type::Planar) => SampleFormat::S16Planar,
        format::Sample::I32(Type::Packed) => SampleFormat::S32,
        format::Sample::I32(Type::Planar) => SampleFormat::S32Planar,
        format::Sample::F32(Type::Packed) => SampleFormat::F32,
        format::Sample::F32(Type::Planar) => SampleFormat::F32Planar,
        _ => return None,
    })
}

fn engine_error(err: ffmpeg::Error) -> EngineError {
    match err {
        ffmpeg::Error::InvalidData => EngineError::InvalidData(err.to_string()),
        ffmpeg::Error::Other { errno } if errno == ffmpeg::error::ENOMEM => {
            EngineError::OutOfMemory(err.to_string())
        }
        ffmpeg::Error::DecoderNotFound => EngineError::Unsupported(err.to_string()),
        _ => EngineError::Failed(err.to_string()),
    }
}

/// Engine backed by the system FFmpeg libraries
#[derive(Debug)]
pub struct FfmpegEngine;

impl FfmpegEngine {
    /// Initialize FFmpeg library
    pub fn new() -> Result<Self, EngineError> {
        ffmpeg::init().map_err(engine_error)?;
        ffmpeg::log::set_level(ffmpeg::log::Level::Warning);
        info!("FFmpeg engine initialized");
        Ok(Self)
    }

    /// Apply extradata and the parameter overrides to a fresh context
    fn configure(
        context: &mut codec::Context,
        codec: CodecId,
        extradata: Option<&[u8]>,
        params: &CodecParams,
    ) -> Result<(), EngineError> {
        if codec.media_type() == MediaType::Video {
            context.set_threading(codec::threading::Config {
                kind: match params.threading {
                    ThreadingMode::Frame => codec::threading::Type::Frame,
                    ThreadingMode::Slice => codec::threading::Type::Slice,
                },
                count: params.thread_count,
            });
        }

        // SAFETY: the context is freshly allocated and not yet opened; every
        // pointer written here is owned by it and freed by avcodec_free_context.
        unsafe {
            let raw = context.as_mut_ptr();

            if let Some(extra) = extradata.filter(|e| !e.is_empty()) {
                let size = extra.len() + ffi::AV_INPUT_BUFFER_PADDING_SIZE as usize;
                let buffer = ffi::av_mallocz(size) as *mut u8;
                if buffer.is_null() {
                    return Err(EngineError::OutOfMemory(format!("{} byte extradata", extra.len())));
                }
                std::ptr::copy_nonoverlapping(extra.as_ptr(), buffer, extra.len());
                (*raw).extradata = buffer;
                (*raw).extradata_size = extra.len() as i32;
            }

            if params.ignore_errors {
                (*raw).err_recognition = IGNORE_RECOVERABLE_ERRORS;
            }

            match codec.media_type() {
                MediaType::Audio => {
                    (*raw).request_sample_fmt = match params.output_format {
                        SampleFormat::F32 => ffi::AVSampleFormat::AV_SAMPLE_FMT_FLT,
                        _ => ffi::AVSampleFormat::AV_SAMPLE_FMT_S16,
                    };
                    if let Some(rate) = params.raw_sample_rate {
                        (*raw).sample_rate = rate as i32;
                    }
                    if let Some(channels) = params.raw_channel_count {
                        ffi::av_channel_layout_default(&mut (*raw).ch_layout, channels as i32);
                    }
                }
                MediaType::Video => {
                    if params.width > 0 && params.height > 0 {
                        (*raw).width = params.width as i32;
                        (*raw).height = params.height as i32;
                    }
                }
            }
        }

        Ok(())
    }
}

impl DecoderEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn supports(&self, codec: CodecId) -> bool {
        codec::decoder::find(ffmpeg_codec_id(codec)).is_some()
    }

    fn open(
        &self,
        codec: CodecId,
        extradata: Option<&[u8]>,
        params: &CodecParams,
    ) -> Result<Box<dyn CodecHandle>, EngineError> {
        let decoder_codec = codec::decoder::find(ffmpeg_codec_id(codec))
            .ok_or_else(|| EngineError::Unsupported(format!("no FFmpeg decoder for {}", codec)))?;

        // Dropping the context on any error below frees it with its extradata
        let mut context = codec::Context::new_with_codec(decoder_codec);
        Self::configure(&mut context, codec, extradata, params)?;

        let opened = context.decoder().open_as(decoder_codec).map_err(engine_error)?;
        debug!("Opened FFmpeg decoder {}", codec);

        match codec.media_type() {
            MediaType::Audio => Ok(Box::new(AudioHandle {
                codec,
                decoder: opened.audio().map_err(engine_error)?,
            })),
            MediaType::Video => Ok(Box::new(VideoHandle {
                codec,
                decoder: opened.video().map_err(engine_error)?,
            })),
        }
    }
}

fn send(decoder: &mut codec::decoder::Opened, packet: &Packet<'_>) -> Result<SendStatus, EngineError> {
    let result = if packet.data.is_empty() {
        decoder.send_eof()
    } else {
        let mut av_packet = ffmpeg::Packet::copy(packet.data);
        av_packet.set_pts(packet.pts);
        decoder.send_packet(&av_packet)
    };

    match result {
        Ok(()) => Ok(SendStatus::Accepted),
        Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => Ok(SendStatus::WouldBlock),
        Err(err) => Err(engine_error(err)),
    }
}

/// Map "try again" and end-of-stream onto receive statuses
fn receive_status(result: Result<(), ffmpeg::Error>) -> Result<Option<ReceiveStatus>, EngineError> {
    match result {
        Ok(()) => Ok(None),
        Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => Ok(Some(ReceiveStatus::NeedMore)),
        Err(ffmpeg::Error::Eof) => Ok(Some(ReceiveStatus::Eof)),
        Err(err) => Err(engine_error(err)),
    }
}

struct AudioHandle {
    codec: CodecId,
    decoder: codec::decoder::Audio,
}

impl AudioHandle {
    fn convert_frame(&self, decoded: &frame::Audio) -> Result<AudioFrame, EngineError> {
        let format = sample_format(decoded.format()).ok_or_else(|| {
            EngineError::Unsupported(format!("sample format {:?}", decoded.format()))
        })?;
        let spec = AudioSpec {
            format,
            channels: decoded.channels() as u16,
            sample_rate: decoded.rate(),
        };
        let samples = decoded.samples();

        let (count, bytes) = if format.is_planar() {
            (spec.channels as usize, samples * format.bytes_per_sample())
        } else {
            (1, samples * spec.frame_bytes())
        };

        let mut planes = Vec::with_capacity(count);
        for index in 0..count {
            let plane = decoded.data(index).get(..bytes).ok_or_else(|| {
                EngineError::InvalidData(format!("audio plane {} shorter than {} bytes", index, bytes))
            })?;
            planes.push(plane.to_vec());
        }

        Ok(AudioFrame { spec, samples, planes, pts: decoded.pts() })
    }
}

impl CodecHandle for AudioHandle {
    fn codec_id(&self) -> CodecId {
        self.codec
    }

    fn send_packet(&mut self, packet: &Packet<'_>) -> Result<SendStatus, EngineError> {
        send(&mut self.decoder, packet)
    }

    fn receive_frame(&mut self) -> Result<ReceiveStatus, EngineError> {
        let mut decoded = frame::Audio::empty();
        if let Some(status) = receive_status(self.decoder.receive_frame(&mut decoded))? {
            return Ok(status);
        }
        Ok(ReceiveStatus::Frame(Frame::Audio(self.convert_frame(&decoded)?)))
    }

    fn flush(&mut self) {
        self.decoder.flush();
    }

    fn audio_spec(&self) -> Option<AudioSpec> {
        Some(AudioSpec {
            format: sample_format(self.decoder.format())?,
            channels: self.decoder.channels() as u16,
            sample_rate: self.decoder.rate(),
        })
    }
}

/// A decoded FFmpeg picture, owned until the pipeline drops it
pub struct FfmpegPicture(frame::Video);

impl FrameBuffer for FfmpegPicture {
    fn plane(&self, index: usize) -> &[u8] {
        if index < self.0.planes() {
            self.0.data(index)
        } else {
            &[]
        }
    }

    fn stride(&self, index: usize) -> usize {
        if index < self.0.planes() {
            self.0.stride(index)
        } else {
            0
        }
    }
}

struct VideoHandle {
    codec: CodecId,
    decoder: codec::decoder::Video,
}

impl CodecHandle for VideoHandle {
    fn codec_id(&self) -> CodecId {
        self.codec
    }

    fn send_packet(&mut self, packet: &Packet<'_>) -> Result<SendStatus, EngineError> {
        send(&mut self.decoder, packet)
    }

    fn receive_frame(&mut self) -> Result<ReceiveStatus, EngineError> {
        let mut decoded = frame::Video::empty();
        if let Some(status) = receive_status(self.decoder.receive_frame(&mut decoded))? {
            return Ok(status);
        }

        let format = match decoded.format() {
            format::Pixel::YUV420P => PixelFormat::Yuv420p,
            format::Pixel::YUVJ420P => PixelFormat::Yuvj420p,
            other => {
                return Err(EngineError::Unsupported(format!("pixel format {:?}", other)));
            }
        };

        let (width, height, pts) = (decoded.width(), decoded.height(), decoded.pts());
        Ok(ReceiveStatus::Frame(Frame::Video(DecodedFrame::new(
            pts,
            width,
            height,
            format,
            Box::new(FfmpegPicture(decoded)),
        ))))
    }

    fn flush(&mut self) {
        self.decoder.flush();
    }
}
