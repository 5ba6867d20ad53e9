//! Presentation surface binding
//!
//! A [`PresentationSurface`] tracks which native target is bound, the
//! buffer geometry negotiated with it, and the scaler used to fill its
//! buffers. Targets are rebound lazily: only when the caller passes a
//! different id, or after the bound target was invalidated.

use super::display::{NativeDisplay, NativeWindow, SurfaceError, SurfaceId};
use super::presenter::{write_frame, Yv12Layout, CHROMA_ALIGNMENT};
use crate::engine::{DecodedFrame, DecoderEngine, PixelFormat, ScaleSpec, Scaler};
use crate::utils::error::{Error, Result};
use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;

enum Binding {
    Unbound,
    Bound {
        id: SurfaceId,
        window: Box<dyn NativeWindow>,
        /// Geometry last set on the window
        geometry: Option<(u32, u32)>,
    },
    /// Binding `id` failed; the next call with `id` tries again
    Invalid { id: SurfaceId },
}

enum DrawError {
    /// The target was invalidated before anything was written
    Stale,
    /// Posting failed; the buffer state is unknown so the binding goes
    Lost(SurfaceError),
    Failed(Error),
}

impl From<SurfaceError> for DrawError {
    fn from(err: SurfaceError) -> Self {
        match err {
            SurfaceError::Invalidated => DrawError::Stale,
            other => DrawError::Failed(other.into()),
        }
    }
}

/// Presents decoded frames on a native display target
pub struct PresentationSurface {
    display: Arc<dyn NativeDisplay>,
    engine: Arc<dyn DecoderEngine>,
    binding: Binding,
    scaler: Option<(ScaleSpec, Box<dyn Scaler>)>,
    scaler_builds: u64,
}

impl PresentationSurface {
    pub fn new(display: Arc<dyn NativeDisplay>, engine: Arc<dyn DecoderEngine>) -> Self {
        Self {
            display,
            engine,
            binding: Binding::Unbound,
            scaler: None,
            scaler_builds: 0,
        }
    }

    /// Id of the bound target, if any
    pub fn bound_target(&self) -> Option<SurfaceId> {
        match &self.binding {
            Binding::Bound { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Number of scalers built over the surface's lifetime
    pub fn scaler_builds(&self) -> u64 {
        self.scaler_builds
    }

    /// Bind `target`, reusing the current binding when the id is unchanged
    ///
    /// `None` releases any bound target and returns
    /// [`Error::SurfaceUnavailable`], since nothing can be presented.
    pub fn acquire(&mut self, target: Option<SurfaceId>) -> Result<()> {
        let Some(id) = target else {
            self.release();
            return Err(Error::SurfaceUnavailable("no display target supplied".into()));
        };

        if self.bound_target() == Some(id) {
            return Ok(());
        }

        self.release();
        match self.display.acquire_target(id) {
            Ok(window) => {
                info!("Bound display target {}", id);
                self.binding = Binding::Bound { id, window, geometry: None };
                Ok(())
            }
            Err(e) => {
                warn!("Failed to bind display target {}: {}", id, e);
                self.binding = Binding::Invalid { id };
                Err(e.into())
            }
        }
    }

    /// Drop the bound target; the scaler is kept
    pub fn release(&mut self) {
        match std::mem::replace(&mut self.binding, Binding::Unbound) {
            Binding::Bound { id, .. } => debug!("Released display target {}", id),
            Binding::Invalid { id } => debug!("Cleared failed binding of {}", id),
            Binding::Unbound => {}
        }
    }

    /// Show `frame` on `target`
    ///
    /// A target invalidated before the buffer is written is rebound and the
    /// present retried once. A failed geometry negotiation leaves the target
    /// bound and is renegotiated on the next call; a failed post releases
    /// the target.
    pub fn present(&mut self, target: Option<SurfaceId>, frame: &DecodedFrame) -> Result<()> {
        let mut retried = false;
        loop {
            self.acquire(target)?;

            match self.draw(frame) {
                Ok(()) => return Ok(()),
                Err(DrawError::Stale) if !retried => {
                    warn!("Display target invalidated, rebinding");
                    self.release();
                    retried = true;
                }
                Err(DrawError::Stale) => {
                    self.release();
                    return Err(SurfaceError::Invalidated.into());
                }
                Err(DrawError::Lost(e)) => {
                    self.release();
                    return Err(e.into());
                }
                Err(DrawError::Failed(e)) => return Err(e),
            }
        }
    }

    fn draw(&mut self, frame: &DecodedFrame) -> std::result::Result<(), DrawError> {
        let Binding::Bound { window, geometry, .. } = &mut self.binding else {
            return Err(DrawError::Failed(Error::SurfaceUnavailable("no bound display target".into())));
        };

        let size = (frame.width, frame.height);
        if *geometry != Some(size) {
            window.set_buffers_geometry(size.0, size.1, PixelFormat::Yv12)?;
            debug!("Buffer geometry set to {}x{}", size.0, size.1);
            *geometry = Some(size);
        }

        let spec = ScaleSpec {
            src_format: frame.format,
            dst_format: PixelFormat::Yuv420p,
            width: frame.width,
            height: frame.height,
        };
        if self.scaler.as_ref().map(|(cached, _)| *cached) != Some(spec) {
            let built = self
                .engine
                .create_scaler(spec)
                .map_err(|e| DrawError::Failed(e.into()))?;
            self.scaler = Some((spec, built));
            self.scaler_builds += 1;
        }
        let Some((_, scaler)) = self.scaler.as_mut() else {
            return Err(DrawError::Failed(Error::other("scaler missing after build")));
        };

        let mut buffer = window.lock()?;
        let layout = Yv12Layout::new(buffer.stride(), buffer.height(), frame.height, CHROMA_ALIGNMENT);
        write_frame(scaler.as_mut(), frame, buffer.bits(), &layout).map_err(|e| DrawError::Failed(e.into()))?;

        buffer.unlock_and_post().map_err(DrawError::Lost)
    }
}

impl fmt::Debug for PresentationSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let binding = match &self.binding {
            Binding::Unbound => "unbound".to_string(),
            Binding::Bound { id, geometry, .. } => format!("{} {:?}", id, geometry),
            Binding::Invalid { id } => format!("{} (invalid)", id),
        };
        f.debug_struct("PresentationSurface")
            .field("display_engine", &self.engine.name())
            .field("binding", &binding)
            .field("scaler", &self.scaler.as_ref().map(|(spec, _)| *spec))
            .finish()
    }
}
