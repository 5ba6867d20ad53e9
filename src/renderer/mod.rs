//! Presentation of decoded video on native display targets
//!
//! The display side is abstracted behind [`NativeDisplay`]; this module
//! owns target binding, buffer geometry and the conversion of decoded
//! frames into the native YV12 buffer layout.

mod display;
mod presenter;
mod surface;

pub use display::{LockedBuffer, NativeDisplay, NativeWindow, SurfaceError, SurfaceId};
pub use presenter::{present_output, write_frame, Yv12Layout, CHROMA_ALIGNMENT};
pub use surface::PresentationSurface;

#[cfg(test)]
pub(crate) use surface::tests::FakeDisplay;
