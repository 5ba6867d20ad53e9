use super::CodecParams;
use crate::audio::ResampleState;
use crate::engine::{AudioSpec, CodecHandle, CodecId, DecoderEngine};
use crate::internal_error;
use crate::utils::error::{Error, Result};
use log::{debug, error, info};
use std::sync::Arc;

/// What a flush actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushKind {
    /// Decoder buffers were reset in place
    Flushed,
    /// The decoder was closed and opened again; any state derived from the
    /// previous handle is gone
    Reopened,
}

/// An open decoder plus the state needed to recreate it
pub struct CodecContext {
    engine: Arc<dyn DecoderEngine>,
    codec: CodecId,
    extradata: Option<Box<[u8]>>,
    params: CodecParams,
    handle: Option<Box<dyn CodecHandle>>,
    resample: Option<ResampleState>,
}

impl CodecContext {
    /// Open a decoder for `codec`
    ///
    /// Raw PCM overrides in `params` are only honoured for G.711; other
    /// codecs read rate and layout from their own bitstream.
    pub fn open(
        engine: Arc<dyn DecoderEngine>,
        codec: CodecId,
        extradata: Option<&[u8]>,
        params: CodecParams,
    ) -> Result<Self> {
        if !engine.supports(codec) {
            error!("Engine {} has no decoder for {}", engine.name(), codec);
            return Err(Error::CodecNotFound(codec.name().to_string()));
        }

        let params = if codec.takes_raw_pcm_overrides() {
            params
        } else {
            params.without_raw_pcm()
        };

        let mut context = Self {
            engine,
            codec,
            extradata: extradata.filter(|e| !e.is_empty()).map(Box::from),
            params,
            handle: None,
            resample: None,
        };
        context.open_handle()?;

        info!(
            "Opened {} decoder on {} engine ({} bytes extradata)",
            codec,
            context.engine.name(),
            context.extradata.as_ref().map_or(0, |e| e.len())
        );
        Ok(context)
    }

    fn open_handle(&mut self) -> Result<()> {
        let handle = self
            .engine
            .open(self.codec, self.extradata.as_deref(), &self.params)
            .map_err(|err| {
                error!("Failed to open {} decoder: {}", self.codec, err);
                Error::from(err)
            })?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Close and open again with the stored extradata and parameters
    fn reopen(&mut self) -> Result<()> {
        self.close();
        self.open_handle()
    }

    /// Reset decoder buffering
    pub fn flush(&mut self) -> Result<FlushKind> {
        if self.codec.flush_requires_reopen() {
            debug!("Reopening {} decoder instead of flushing", self.codec);
            self.reopen()?;
            return Ok(FlushKind::Reopened);
        }

        self.handle_mut()?.flush();
        Ok(FlushKind::Flushed)
    }

    /// Flush, or for reopen-on-flush codecs recreate the decoder with the
    /// new `extradata` and the original output format request
    pub fn reset(&mut self, extradata: Option<&[u8]>) -> Result<FlushKind> {
        if !self.codec.flush_requires_reopen() {
            return self.flush();
        }

        self.extradata = extradata.filter(|e| !e.is_empty()).map(Box::from);
        self.params = self.params.without_raw_pcm();
        debug!("Resetting {} decoder with fresh extradata", self.codec);
        self.reopen()?;
        Ok(FlushKind::Reopened)
    }

    /// Release the decoder handle and any cached conversion state
    ///
    /// Safe to call repeatedly; the context stays usable only through
    /// [`CodecContext::reset`] or [`CodecContext::flush`] afterwards.
    pub fn close(&mut self) {
        if self.handle.take().is_some() {
            debug!("Closed {} decoder", self.codec);
        }
        self.resample = None;
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn codec(&self) -> CodecId {
        self.codec
    }

    pub fn params(&self) -> &CodecParams {
        &self.params
    }

    pub fn extradata(&self) -> Option<&[u8]> {
        self.extradata.as_deref()
    }

    pub fn engine(&self) -> &Arc<dyn DecoderEngine> {
        &self.engine
    }

    pub fn handle_mut(&mut self) -> Result<&mut dyn CodecHandle> {
        let codec = self.codec;
        match self.handle.as_deref_mut() {
            Some(handle) => Ok(handle),
            None => Err(internal_error!("{} decoder is closed", codec)),
        }
    }

    /// Current decoder output layout
    pub fn audio_spec(&self) -> Option<AudioSpec> {
        self.handle.as_ref().and_then(|h| h.audio_spec())
    }

    /// The resampler for this stream, built from `input` on first use
    pub fn resample_state(&mut self, input: AudioSpec) -> Result<&mut ResampleState> {
        if self.resample.is_none() {
            let state = ResampleState::new(self.engine.as_ref(), input, self.params.output_format)?;
            self.resample = Some(state);
        }
        self.resample
            .as_mut()
            .ok_or_else(|| internal_error!("resampler missing after construction"))
    }

    pub fn has_resample_state(&self) -> bool {
        self.resample.is_some()
    }
}

impl Drop for CodecContext {
    fn drop(&mut self) {
        self.close();
    }
}
