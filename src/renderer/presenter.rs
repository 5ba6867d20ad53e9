//! Writing decoded frames into the native YV12 layout
//!
//! YV12 stores the full luma plane, then V, then U. Chroma rows use half
//! the luma stride rounded up to the chroma alignment (16 bytes on every
//! platform that defines the format).

use super::surface::PresentationSurface;
use super::SurfaceId;
use crate::decoder::VideoOutputBuffer;
use crate::engine::{DecodedFrame, EngineError, PlaneMut, Scaler};
use crate::utils::align_up;
use crate::utils::error::{Error, Result};
use log::trace;

/// Chroma row alignment of the native format
pub const CHROMA_ALIGNMENT: usize = 16;

/// Plane placement inside one locked native buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Yv12Layout {
    pub y_stride: usize,
    pub uv_stride: usize,
    /// Bytes before the V plane
    pub y_size: usize,
    /// Bytes between the V and U planes
    pub v_size: usize,
    /// Luma rows to write
    pub rows: u32,
}

impl Yv12Layout {
    pub fn new(buffer_stride: usize, buffer_height: u32, display_height: u32, alignment: usize) -> Self {
        let uv_height = (buffer_height + 1) / 2;
        let uv_stride = align_up(buffer_stride / 2, alignment);
        let v_rows = uv_height.min(display_height) as usize;

        Self {
            y_stride: buffer_stride,
            uv_stride,
            y_size: buffer_stride * buffer_height as usize,
            v_size: v_rows * uv_stride,
            rows: display_height,
        }
    }

    /// Minimum buffer length holding all three planes
    pub fn total_size(&self) -> usize {
        self.y_size + 2 * self.v_size
    }
}

/// Convert `frame` into `bits` with the planes placed per `layout`
pub fn write_frame(
    scaler: &mut dyn Scaler,
    frame: &DecodedFrame,
    bits: &mut [u8],
    layout: &Yv12Layout,
) -> std::result::Result<(), EngineError> {
    if bits.len() < layout.total_size() {
        return Err(EngineError::Failed(format!(
            "native buffer holds {} bytes, layout needs {}",
            bits.len(),
            layout.total_size()
        )));
    }

    let (y, chroma) = bits.split_at_mut(layout.y_size);
    let (v, rest) = chroma.split_at_mut(layout.v_size);
    let u = &mut rest[..layout.v_size];

    scaler.scale(
        frame,
        [
            PlaneMut { data: y, stride: layout.y_stride },
            PlaneMut { data: u, stride: layout.uv_stride },
            PlaneMut { data: v, stride: layout.uv_stride },
        ],
        layout.rows,
    )
}

/// Present the frame held by `slot`, then release it unless the slot asks
/// to keep it
///
/// On failure the frame stays in the slot.
pub fn present_output(
    surface: &mut PresentationSurface,
    target: Option<SurfaceId>,
    slot: &mut VideoOutputBuffer,
) -> Result<()> {
    let frame = slot
        .frame()
        .ok_or_else(|| Error::other("output slot holds no frame"))?;
    surface.present(target, frame)?;

    if !slot.retain_after_present {
        slot.release_frame();
        trace!("Released presented frame at {}", slot.timestamp());
    }
    Ok(())
}
