//! Caller-visible video output slot

use crate::engine::DecodedFrame;
use crate::utils::error::{Error, Result};
use log::trace;

/// How the caller wants decoded pictures delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Only timing information; pixels are discarded
    #[default]
    None,
    /// A contiguous Y, U, V copy in the slot
    Yuv,
    /// The decoded frame itself, kept for presentation on a surface
    SurfaceYuv,
}

impl OutputMode {
    /// Decode the calling layer's integer mode
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(OutputMode::None),
            0 => Some(OutputMode::Yuv),
            1 => Some(OutputMode::SurfaceYuv),
            _ => None,
        }
    }
}

/// Output slot a delivered frame lands in
///
/// A slot is only populated once the frame is known to be keepable, so a
/// failed decode never leaves a half-written slot behind.
#[derive(Debug, Default)]
pub struct VideoOutputBuffer {
    timestamp: i64,
    mode: OutputMode,
    width: u32,
    height: u32,
    frame: Option<DecodedFrame>,
    yuv: Vec<u8>,
    yuv_strides: [usize; 2],

    /// Keep the frame after presenting it, for repeated presents
    pub retain_after_present: bool,
}

impl VideoOutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `frame` into the slot in the requested mode
    pub fn set_frame(&mut self, frame: DecodedFrame, timestamp: i64, mode: OutputMode) -> Result<()> {
        self.release_frame();
        self.yuv.clear();
        self.yuv_strides = [0, 0];

        match mode {
            OutputMode::Yuv => self.copy_yuv(&frame)?,
            OutputMode::SurfaceYuv => {}
            OutputMode::None => trace!("Discarding pixels of frame at {}", timestamp),
        }

        self.timestamp = timestamp;
        self.mode = mode;
        self.width = frame.width;
        self.height = frame.height;
        if mode == OutputMode::SurfaceYuv {
            self.frame = Some(frame);
        }
        Ok(())
    }

    fn copy_yuv(&mut self, frame: &DecodedFrame) -> Result<()> {
        let y_stride = frame.stride(0);
        let uv_stride = frame.stride(1);
        let y_size = y_stride * frame.height as usize;
        let uv_size = uv_stride * frame.chroma_height() as usize;

        let (Some(y), Some(u), Some(v)) = (
            frame.plane(0).get(..y_size),
            frame.plane(1).get(..uv_size),
            frame.plane(2).get(..uv_size),
        ) else {
            return Err(Error::InvalidData(format!(
                "{}x{} frame planes shorter than their strides imply",
                frame.width, frame.height
            )));
        };

        self.yuv.reserve(y_size + 2 * uv_size);
        self.yuv.extend_from_slice(y);
        self.yuv.extend_from_slice(u);
        self.yuv.extend_from_slice(v);
        self.yuv_strides = [y_stride, uv_stride];
        Ok(())
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frame(&self) -> Option<&DecodedFrame> {
        self.frame.as_ref()
    }

    pub fn has_frame(&self) -> bool {
        self.frame.is_some()
    }

    /// Move the frame out of the slot
    pub fn take_frame(&mut self) -> Option<DecodedFrame> {
        self.frame.take()
    }

    /// Contiguous Y, U, V copy for [`OutputMode::Yuv`]
    pub fn yuv_data(&self) -> Option<&[u8]> {
        (!self.yuv.is_empty()).then_some(self.yuv.as_slice())
    }

    /// Luma and chroma strides of [`VideoOutputBuffer::yuv_data`]
    pub fn yuv_strides(&self) -> [usize; 2] {
        self.yuv_strides
    }

    /// Drop the held frame, returning whether there was one
    pub fn release_frame(&mut self) -> bool {
        self.frame.take().is_some()
    }
}
