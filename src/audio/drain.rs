use super::OutputBuffer;
use crate::codec::{CodecContext, CodecParams, FlushKind};
use crate::engine::{CodecId, DecoderEngine, Frame, Packet, ReceiveStatus, SendStatus};
use crate::internal_error;
use crate::utils::error::{Error, Result};
use log::{debug, error, trace};
use std::sync::Arc;

/// Audio decode path: one packet in, every available frame out as PCM
pub struct AudioDecoder {
    context: CodecContext,
}

impl AudioDecoder {
    pub fn open(
        engine: Arc<dyn DecoderEngine>,
        codec: CodecId,
        extradata: Option<&[u8]>,
        params: CodecParams,
    ) -> Result<Self> {
        Ok(Self {
            context: CodecContext::open(engine, codec, extradata, params)?,
        })
    }

    /// Feed `packet`, drain every frame it produced and write the converted
    /// samples to the start of `output`
    ///
    /// Returns the number of bytes written. `output` is grown to exactly the
    /// total needed whenever a frame would not fit.
    pub fn decode(&mut self, packet: &[u8], output: &mut dyn OutputBuffer) -> Result<usize> {
        let handle = self.context.handle_mut()?;
        match handle.send_packet(&Packet::new(packet, None)) {
            Ok(SendStatus::Accepted) => {}
            Ok(SendStatus::WouldBlock) => {
                error!("Audio decoder refused a {} byte packet", packet.len());
                return Err(Error::other("audio decoder input is full"));
            }
            Err(err) => {
                error!("Error sending audio packet: {}", err);
                return Err(err.into());
            }
        }

        let mut written = 0;
        loop {
            let frame = match self.context.handle_mut()?.receive_frame() {
                Ok(ReceiveStatus::Frame(Frame::Audio(frame))) => frame,
                Ok(ReceiveStatus::Frame(Frame::Video(_))) => {
                    return Err(internal_error!("video frame from audio decoder"));
                }
                Ok(ReceiveStatus::NeedMore) | Ok(ReceiveStatus::Eof) => break,
                Err(err) => {
                    error!("Error receiving audio frame: {}", err);
                    return Err(err.into());
                }
            };

            let state = self.context.resample_state(frame.spec)?;
            let required = written + state.output_size(&frame);
            if required > output.capacity() {
                output.grow(required).map_err(|err| {
                    error!("Failed to grow output buffer to {} bytes: {}", required, err);
                    err
                })?;
                if output.capacity() < required {
                    return Err(Error::ResourceExhausted(format!(
                        "output buffer grew to {} bytes, {} required",
                        output.capacity(),
                        required
                    )));
                }
            }

            let Some(dest) = output.as_mut_slice().get_mut(written..required) else {
                return Err(Error::ResourceExhausted(format!(
                    "output buffer reports {} bytes but exposes fewer than {}",
                    output.capacity(),
                    required
                )));
            };
            let bytes = state.convert(&frame, dest)?;
            trace!("Converted {} samples into {} bytes", frame.samples, bytes);
            written += bytes;
        }

        Ok(written)
    }

    /// Flush, or reopen with `extradata` for codecs that need it
    pub fn reset(&mut self, extradata: Option<&[u8]>) -> Result<FlushKind> {
        let kind = self.context.reset(extradata)?;
        debug!("Audio decoder reset: {:?}", kind);
        Ok(kind)
    }

    pub fn channel_count(&self) -> Result<u16> {
        self.context
            .audio_spec()
            .map(|spec| spec.channels)
            .ok_or_else(|| Error::other("channel layout not known yet"))
    }

    pub fn sample_rate(&self) -> Result<u32> {
        self.context
            .audio_spec()
            .map(|spec| spec.sample_rate)
            .ok_or_else(|| Error::other("sample rate not known yet"))
    }

    pub fn context(&self) -> &CodecContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut CodecContext {
        &mut self.context
    }
}
