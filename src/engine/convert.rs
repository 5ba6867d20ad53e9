//! Pure-Rust sample-format conversion and planar picture copy
//!
//! These are the default resample and scale capabilities. Neither changes
//! rate, channel layout or geometry; the pipeline never asks for that.

use super::{
    AudioFrame, AudioSpec, DecodedFrame, EngineError, PixelFormat, PlaneMut, Resampler,
    SampleFormat, ScaleSpec, Scaler,
};

/// Converts between packed/planar PCM formats at a fixed rate and layout
#[derive(Debug)]
pub struct SampleConverter {
    input: AudioSpec,
    output: AudioSpec,
}

impl SampleConverter {
    pub fn new(input: AudioSpec, output: AudioSpec) -> Result<Self, EngineError> {
        if !output.format.is_output_format() {
            return Err(EngineError::Unsupported(format!(
                "output sample format {:?}",
                output.format
            )));
        }
        if input.channels == 0 || input.channels != output.channels {
            return Err(EngineError::Unsupported(format!(
                "channel remapping {} -> {}",
                input.channels, output.channels
            )));
        }
        if input.sample_rate != output.sample_rate {
            return Err(EngineError::Unsupported(format!(
                "rate conversion {} -> {}",
                input.sample_rate, output.sample_rate
            )));
        }

        Ok(Self { input, output })
    }

    /// Read one sample as a float in [-1.0, 1.0)
    fn read(&self, frame: &AudioFrame, channel: usize, index: usize) -> f32 {
        let bps = self.input.format.bytes_per_sample();
        let (plane, offset) = if self.input.format.is_planar() {
            (&frame.planes[channel], index * bps)
        } else {
            (&frame.planes[0], (index * self.input.channels as usize + channel) * bps)
        };
        let bytes = &plane[offset..offset + bps];

        match self.input.format {
            SampleFormat::U8 | SampleFormat::U8Planar => (bytes[0] as f32 - 128.0) / 128.0,
            SampleFormat::S16 | SampleFormat::S16Planar => {
                i16::from_ne_bytes([bytes[0], bytes[1]]) as f32 / 32768.0
            }
            SampleFormat::S32 | SampleFormat::S32Planar => {
                i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32 / 2_147_483_648.0
            }
            SampleFormat::F32 | SampleFormat::F32Planar => {
                f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
            }
        }
    }

    fn check_planes(&self, frame: &AudioFrame) -> Result<(), EngineError> {
        let bps = self.input.format.bytes_per_sample();
        let channels = self.input.channels as usize;
        let (count, needed) = if self.input.format.is_planar() {
            (channels, frame.samples * bps)
        } else {
            (1, frame.samples * bps * channels)
        };

        if frame.planes.len() < count || frame.planes[..count].iter().any(|p| p.len() < needed) {
            return Err(EngineError::InvalidData(format!(
                "frame planes too short for {} samples",
                frame.samples
            )));
        }
        Ok(())
    }
}

impl Resampler for SampleConverter {
    fn output_samples(&self, input_samples: usize) -> usize {
        input_samples
    }

    fn convert(&mut self, frame: &AudioFrame, output: &mut [u8]) -> Result<usize, EngineError> {
        if frame.spec != self.input {
            return Err(EngineError::InvalidData(format!(
                "frame format {:?} does not match converter input {:?}",
                frame.spec, self.input
            )));
        }
        self.check_planes(frame)?;

        let channels = self.input.channels as usize;
        let needed = frame.samples * self.output.frame_bytes();
        if output.len() < needed {
            return Err(EngineError::Failed(format!(
                "output region holds {} bytes, {} needed",
                output.len(),
                needed
            )));
        }

        // Packed input already in the output format is a straight copy
        if self.input.format == self.output.format {
            output[..needed].copy_from_slice(&frame.planes[0][..needed]);
            return Ok(frame.samples);
        }

        let mut chunks = output[..needed].chunks_exact_mut(self.output.format.bytes_per_sample());
        for index in 0..frame.samples {
            for channel in 0..channels {
                let value = self.read(frame, channel, index);
                let Some(dst) = chunks.next() else {
                    return Err(EngineError::Failed("output region exhausted".to_string()));
                };
                match self.output.format {
                    SampleFormat::S16 => {
                        let sample = (value * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
                        dst.copy_from_slice(&sample.to_ne_bytes());
                    }
                    _ => dst.copy_from_slice(&value.to_ne_bytes()),
                }
            }
        }

        Ok(frame.samples)
    }

    fn pending_samples(&self) -> usize {
        0
    }
}

/// Copies planar 4:2:0 pictures into destination planes, expanding
/// full-range input to limited range on the way
pub struct PlanarScaler {
    spec: ScaleSpec,
    luma_lut: Option<[u8; 256]>,
    chroma_lut: Option<[u8; 256]>,
}

fn range_lut(scale: u32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (value, slot) in lut.iter_mut().enumerate() {
        *slot = (16 + (value as u32 * scale + 127) / 255) as u8;
    }
    lut
}

impl PlanarScaler {
    pub fn new(spec: ScaleSpec) -> Result<Self, EngineError> {
        if !matches!(spec.src_format, PixelFormat::Yuv420p | PixelFormat::Yuvj420p) {
            return Err(EngineError::Unsupported(format!("source format {:?}", spec.src_format)));
        }
        if spec.dst_format != PixelFormat::Yuv420p {
            return Err(EngineError::Unsupported(format!("destination format {:?}", spec.dst_format)));
        }
        if spec.width == 0 || spec.height == 0 {
            return Err(EngineError::Failed("zero-sized picture".to_string()));
        }

        let full_range = spec.src_format == PixelFormat::Yuvj420p;
        Ok(Self {
            spec,
            luma_lut: full_range.then(|| range_lut(219)),
            chroma_lut: full_range.then(|| range_lut(224)),
        })
    }

    pub fn spec(&self) -> ScaleSpec {
        self.spec
    }
}

impl Scaler for PlanarScaler {
    fn scale(&mut self, src: &DecodedFrame, dst: [PlaneMut<'_>; 3], rows: u32) -> Result<(), EngineError> {
        if src.width < self.spec.width || src.height < self.spec.height {
            return Err(EngineError::InvalidData(format!(
                "{}x{} frame smaller than {}x{} conversion",
                src.width, src.height, self.spec.width, self.spec.height
            )));
        }

        let rows = rows.min(self.spec.height) as usize;
        let width = self.spec.width as usize;
        let chroma_width = (width + 1) / 2;
        let chroma_rows = (rows + 1) / 2;

        for (index, plane) in dst.into_iter().enumerate() {
            let (row_bytes, row_count, lut) = if index == 0 {
                (width, rows, self.luma_lut.as_ref())
            } else {
                (chroma_width, chroma_rows, self.chroma_lut.as_ref())
            };
            let src_plane = src.plane(index);
            let src_stride = src.stride(index);

            for row in 0..row_count {
                let src_start = row * src_stride;
                let dst_start = row * plane.stride;
                let (Some(from), Some(to)) = (
                    src_plane.get(src_start..src_start + row_bytes),
                    plane.data.get_mut(dst_start..dst_start + row_bytes),
                ) else {
                    return Err(EngineError::Failed(format!(
                        "plane {} row {} out of bounds",
                        index, row
                    )));
                };
                match lut {
                    Some(lut) => to.iter_mut().zip(from).for_each(|(d, s)| *d = lut[*s as usize]),
                    None => to.copy_from_slice(from),
                }
            }
        }

        Ok(())
    }
}
