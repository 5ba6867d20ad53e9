//! Video decode path: feed packets, drain frames through the start-time
//! gate, hand out the first keeper and park the rest in the frame queue

use super::frame_queue::FrameQueue;
use super::timeline::OutputTimeline;
use crate::codec::{CodecContext, CodecParams, FlushKind};
use crate::engine::{
    CodecId, DecodedFrame, DecoderEngine, EngineError, Frame, Packet, ReceiveStatus, SendStatus,
};
use crate::internal_error;
use crate::utils::error::{Error, Result};
use log::{debug, error, trace};
use std::sync::Arc;

/// Whether a drain call may return more than one frame's worth of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainMode {
    /// Stop at the first keepable frame
    Single,
    /// Drain everything pending; keepers after the first go to the queue
    ReadOnly,
}

/// Result of one drain call
#[derive(Debug)]
pub enum DrainOutcome {
    /// A frame for the caller, with the timestamp it should be shown at
    Presented {
        frame: DecodedFrame,
        timestamp: i64,
        dropped: u32,
    },
    /// The keeper went behind frames queued earlier
    Queued { remaining: usize, dropped: u32 },
    /// Nothing decoded yet
    NeedMoreInput,
    /// Every decoded frame was dropped
    Dropped(u32),
}

impl DrainOutcome {
    /// Frames dropped during the call
    pub fn dropped(&self) -> u32 {
        match self {
            DrainOutcome::Presented { dropped, .. } | DrainOutcome::Queued { dropped, .. } => *dropped,
            DrainOutcome::Dropped(count) => *count,
            DrainOutcome::NeedMoreInput => 0,
        }
    }
}

fn receive_error(err: EngineError) -> Error {
    error!("Error receiving video frame: {}", err);
    match err {
        EngineError::OutOfMemory(msg) => Error::ResourceExhausted(msg),
        other => Error::Other(other.to_string()),
    }
}

/// Video decoder with its frame queue and start-time gate
pub struct VideoDecoder {
    context: CodecContext,
    queue: Arc<FrameQueue>,
    timeline: Arc<dyn OutputTimeline>,
    rotation_degrees: i32,
}

impl VideoDecoder {
    pub fn open(
        engine: Arc<dyn DecoderEngine>,
        codec: CodecId,
        extradata: Option<&[u8]>,
        params: CodecParams,
        timeline: Arc<dyn OutputTimeline>,
    ) -> Result<Self> {
        Ok(Self {
            context: CodecContext::open(engine, codec, extradata, params)?,
            queue: Arc::new(FrameQueue::default()),
            timeline,
            rotation_degrees: 0,
        })
    }

    /// Replace the queue, e.g. one sized from configuration
    pub fn with_queue(mut self, queue: Arc<FrameQueue>) -> Self {
        self.queue = queue;
        self
    }

    /// Record the stream's rotation; frames are delivered unrotated
    pub fn with_rotation(mut self, degrees: i32) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    pub fn rotation_degrees(&self) -> i32 {
        self.rotation_degrees
    }

    pub fn queue(&self) -> &Arc<FrameQueue> {
        &self.queue
    }

    pub fn timeline(&self) -> &Arc<dyn OutputTimeline> {
        &self.timeline
    }

    pub fn context(&self) -> &CodecContext {
        &self.context
    }

    /// Feed one packet
    ///
    /// A full decoder is reported as [`Error::NeedsDrainFirst`], distinct
    /// from malformed input.
    pub fn send_packet(&mut self, data: &[u8], pts: i64) -> Result<()> {
        let status = self.context.handle_mut()?.send_packet(&Packet::new(data, Some(pts)));
        match status {
            Ok(SendStatus::Accepted) => Ok(()),
            Ok(SendStatus::WouldBlock) => {
                debug!("Video decoder full at pts {}", pts);
                Err(Error::NeedsDrainFirst)
            }
            Err(EngineError::InvalidData(msg)) => {
                error!("Invalid video packet at pts {}: {}", pts, msg);
                Err(Error::InvalidData(msg))
            }
            Err(err) => {
                error!("Error sending video packet: {}", err);
                Err(Error::Other(err.to_string()))
            }
        }
    }

    /// Pull one frame from the engine
    fn next_frame(&mut self) -> Result<Option<DecodedFrame>> {
        match self.context.handle_mut()?.receive_frame() {
            Ok(ReceiveStatus::Frame(Frame::Video(frame))) => Ok(Some(frame)),
            Ok(ReceiveStatus::Frame(Frame::Audio(_))) => Err(internal_error!("audio frame from video decoder")),
            Ok(ReceiveStatus::NeedMore) | Ok(ReceiveStatus::Eof) => Ok(None),
            Err(err) => Err(receive_error(err)),
        }
    }

    /// Apply the start-time gate; keepers come back with their timestamp
    /// written into `pts`
    fn keep(&self, mut frame: DecodedFrame, input_pts: i64, decode_only: bool) -> Option<DecodedFrame> {
        let timestamp = frame.effective_timestamp(input_pts);
        if decode_only || !self.timeline.is_at_least_start_time(timestamp) {
            trace!("Dropping frame at {} (decode only: {})", timestamp, decode_only);
            return None;
        }
        frame.pts = Some(timestamp);
        Some(frame)
    }

    /// Drain decoded frames produced so far
    ///
    /// `input_pts` stands in for frames that carry no timestamp of their own.
    pub fn drain(&mut self, input_pts: i64, decode_only: bool, mode: DrainMode) -> Result<DrainOutcome> {
        let mut dropped = 0u32;
        let mut first: Option<DecodedFrame> = None;
        let mut queued = 0usize;

        while let Some(frame) = self.next_frame()? {
            let Some(frame) = self.keep(frame, input_pts, decode_only) else {
                dropped += 1;
                continue;
            };

            match mode {
                DrainMode::Single => {
                    return Ok(if self.queue.is_empty() {
                        let timestamp = frame.pts.unwrap_or(input_pts);
                        DrainOutcome::Presented { frame, timestamp, dropped }
                    } else {
                        self.queue.push(frame);
                        DrainOutcome::Queued { remaining: self.queue.size(), dropped }
                    });
                }
                DrainMode::ReadOnly => {
                    if first.is_none() && self.queue.is_empty() {
                        first = Some(frame);
                    } else {
                        self.queue.push(frame);
                        queued += 1;
                    }
                }
            }
        }

        Ok(match first {
            Some(frame) => {
                let timestamp = frame.pts.unwrap_or(input_pts);
                DrainOutcome::Presented { frame, timestamp, dropped }
            }
            None if queued > 0 => DrainOutcome::Queued { remaining: self.queue.size(), dropped },
            None if dropped > 0 => DrainOutcome::Dropped(dropped),
            None => DrainOutcome::NeedMoreInput,
        })
    }

    /// Feed `data` (unless `read_only`) and drain in one step
    pub fn send_and_drain(
        &mut self,
        data: &[u8],
        pts: i64,
        decode_only: bool,
        read_only: bool,
    ) -> Result<DrainOutcome> {
        if read_only {
            return self.drain(pts, decode_only, DrainMode::ReadOnly);
        }
        if data.is_empty() {
            debug!("Empty video packet at pts {}", pts);
            return Ok(DrainOutcome::NeedMoreInput);
        }

        self.send_packet(data, pts)?;
        self.drain(pts, decode_only, DrainMode::Single)
    }

    /// Serve a queued frame, else drain the engine: the first keeper is
    /// returned and later ones are queued
    ///
    /// In decode-only mode the queue is cleared and its frames count as
    /// dropped together with everything drained.
    pub fn receive_batch(&mut self, decode_only: bool) -> Result<DrainOutcome> {
        let mut dropped = 0u32;
        if decode_only {
            dropped += self.queue.clear() as u32;
        } else if let Some(frame) = self.queue.pop() {
            let timestamp = frame.pts.unwrap_or(0);
            return Ok(DrainOutcome::Presented { frame, timestamp, dropped });
        }

        let mut first: Option<DecodedFrame> = None;
        while let Some(frame) = self.next_frame()? {
            // Batched frames have no packet timestamp to fall back on
            let fallback = frame.pts.unwrap_or(0);
            let Some(frame) = self.keep(frame, fallback, decode_only) else {
                dropped += 1;
                continue;
            };
            if first.is_none() {
                first = Some(frame);
            } else {
                self.queue.push(frame);
            }
        }

        Ok(match first {
            Some(frame) => {
                let timestamp = frame.pts.unwrap_or(0);
                DrainOutcome::Presented { frame, timestamp, dropped }
            }
            None if dropped > 0 => DrainOutcome::Dropped(dropped),
            None => DrainOutcome::NeedMoreInput,
        })
    }

    /// Drop queued frames and flush the decoder, returning the number of
    /// frames released from the queue
    pub fn reset(&mut self) -> Result<usize> {
        let released = self.queue.clear();
        let kind = self.context.flush()?;
        if kind == FlushKind::Reopened {
            debug!("Video decoder reopened on reset");
        }
        debug!("Video decoder reset, released {} queued frames", released);
        Ok(released)
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        self.queue.clear();
    }
}
