//! Native display capability
//!
//! The platform side (a window system, a compositor, a test double)
//! implements these traits. A target can be invalidated by its owner at any
//! time; lock and post report that as [`SurfaceError::Invalidated`].

use crate::engine::PixelFormat;
use std::fmt;
use thiserror::Error;

/// Identity of a display target as supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// Display-side failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The target went away underneath us; rebinding may succeed
    #[error("display target was invalidated")]
    Invalidated,

    /// The target could not be bound
    #[error("display target {0} unavailable")]
    Unavailable(SurfaceId),

    #[error("display operation failed: {0}")]
    Failed(String),
}

/// Source of display targets
pub trait NativeDisplay: Send + Sync {
    /// Bind the target behind `id`; dropping the window releases it
    fn acquire_target(&self, id: SurfaceId) -> Result<Box<dyn NativeWindow>, SurfaceError>;
}

/// A bound display target
pub trait NativeWindow: Send {
    /// Size and format of the buffers subsequent locks return
    fn set_buffers_geometry(&mut self, width: u32, height: u32, format: PixelFormat) -> Result<(), SurfaceError>;

    /// Lock the next buffer for writing
    fn lock(&mut self) -> Result<Box<dyn LockedBuffer + '_>, SurfaceError>;
}

/// A locked native buffer
///
/// Dropping it without [`LockedBuffer::unlock_and_post`] unlocks without
/// showing anything.
pub trait LockedBuffer {
    /// Row stride of the luma plane in bytes
    fn stride(&self) -> usize;

    /// Buffer height in rows
    fn height(&self) -> u32;

    fn bits(&mut self) -> &mut [u8];

    /// Unlock and make the contents visible
    fn unlock_and_post(self: Box<Self>) -> Result<(), SurfaceError>;
}
