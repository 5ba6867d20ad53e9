use crate::engine::{AudioFrame, AudioSpec, DecoderEngine, Resampler, SampleFormat};
use crate::utils::error::{Error, Result};
use log::{debug, error, warn};

/// Per-stream resampler, built from the first decoded frame's format
pub struct ResampleState {
    input: AudioSpec,
    output: AudioSpec,
    resampler: Box<dyn Resampler>,
}

impl ResampleState {
    /// Build a converter from `input` to `output_format` at the same rate
    /// and channel layout
    pub fn new(engine: &dyn DecoderEngine, input: AudioSpec, output_format: SampleFormat) -> Result<Self> {
        let output = AudioSpec { format: output_format, ..input };
        let resampler = engine.create_resampler(input, output).map_err(|err| {
            error!("Failed to create resampler {:?} -> {:?}: {}", input, output, err);
            Error::from(err)
        })?;

        debug!(
            "Resampler {:?} -> {:?}, {} channels at {} Hz",
            input.format, output.format, input.channels, input.sample_rate
        );
        Ok(Self::from_parts(input, output, resampler))
    }

    pub fn from_parts(input: AudioSpec, output: AudioSpec, resampler: Box<dyn Resampler>) -> Self {
        Self { input, output, resampler }
    }

    pub fn input(&self) -> AudioSpec {
        self.input
    }

    pub fn output(&self) -> AudioSpec {
        self.output
    }

    /// Bytes the conversion of `frame` may produce
    pub fn output_size(&self, frame: &AudioFrame) -> usize {
        self.resampler.output_samples(frame.samples) * self.output.frame_bytes()
    }

    /// Convert `frame` into `dst`, returning the bytes written
    ///
    /// Samples left buffered inside the resampler afterwards make the
    /// conversion invalid.
    pub fn convert(&mut self, frame: &AudioFrame, dst: &mut [u8]) -> Result<usize> {
        if frame.spec != self.input {
            warn!("Frame format {:?} differs from stream format {:?}", frame.spec, self.input);
        }

        let samples = self.resampler.convert(frame, dst)?;

        let pending = self.resampler.pending_samples();
        if pending != 0 {
            error!("Resampler kept {} samples after conversion", pending);
            return Err(Error::InvalidData(format!("{} samples left in resampler", pending)));
        }

        Ok(samples * self.output.frame_bytes())
    }
}
