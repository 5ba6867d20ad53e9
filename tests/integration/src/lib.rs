//! Integration test utilities for mediadrain
//!
//! This module provides common utilities for integration testing including:
//! - Test media generation (G.711 packets, raw YUV pictures)
//! - An in-memory display that records what was posted
//! - Performance measurement helpers

use anyhow::Result;
use mediadrain::engine::PixelFormat;
use mediadrain::renderer::{LockedBuffer, NativeDisplay, NativeWindow, SurfaceError, SurfaceId};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Test fixture holding a scratch directory for configuration files
pub struct TestFixture {
    pub temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Result<Self> {
        Ok(Self { temp_dir: TempDir::new()? })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `contents` as `name` inside the fixture directory
    pub fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}

/// Generators for test media
pub mod media {
    /// Encode one 16-bit sample as G.711 µ-law
    pub fn mulaw_encode(sample: i16) -> u8 {
        const BIAS: i32 = 0x84;
        const CLIP: i32 = 32635;

        let mut value = sample as i32;
        let sign = if value < 0 {
            value = -value;
            0x80
        } else {
            0
        };
        value = value.min(CLIP) + BIAS;

        let mut exponent = 7;
        let mut mask = 0x4000;
        while exponent > 0 && value & mask == 0 {
            exponent -= 1;
            mask >>= 1;
        }
        let mantissa = (value >> (exponent + 3)) & 0x0f;
        !(sign | (exponent << 4) | mantissa) as u8
    }

    /// `samples` µ-law bytes of a 440 Hz tone at 8 kHz
    pub fn mulaw_tone(samples: usize) -> Vec<u8> {
        (0..samples)
            .map(|n| {
                let t = n as f32 / 8000.0;
                let value = (t * 440.0 * std::f32::consts::TAU).sin() * 8000.0;
                mulaw_encode(value as i16)
            })
            .collect()
    }

    /// A planar YUV 4:2:0 picture with a horizontal luma gradient
    pub fn yuv420_picture(width: u32, height: u32, chroma: (u8, u8)) -> Vec<u8> {
        let (w, h) = (width as usize, height as usize);
        let chroma_size = ((w + 1) / 2) * ((h + 1) / 2);

        let mut data = Vec::with_capacity(w * h + 2 * chroma_size);
        for _ in 0..h {
            data.extend((0..w).map(|x| (x * 255 / w.max(1)) as u8));
        }
        data.extend(std::iter::repeat(chroma.0).take(chroma_size));
        data.extend(std::iter::repeat(chroma.1).take(chroma_size));
        data
    }
}

/// One buffer posted to a [`MemoryDisplay`]
#[derive(Debug, Clone)]
pub struct PostedBuffer {
    pub target: SurfaceId,
    pub stride: usize,
    pub height: u32,
    pub bits: Vec<u8>,
}

#[derive(Debug, Default)]
struct DisplayState {
    acquired: Vec<SurfaceId>,
    geometry: Vec<(SurfaceId, u32, u32, PixelFormat)>,
    posted: Vec<PostedBuffer>,
    invalidate_next_locks: u32,
}

/// Display whose buffers live in memory
///
/// Buffers use a 32-byte aligned luma stride so tests see a stride wider
/// than the picture.
#[derive(Debug, Default, Clone)]
pub struct MemoryDisplay {
    state: Arc<Mutex<DisplayState>>,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquired(&self) -> Vec<SurfaceId> {
        self.state.lock().acquired.clone()
    }

    pub fn geometry_changes(&self) -> usize {
        self.state.lock().geometry.len()
    }

    pub fn last_geometry(&self) -> Option<(SurfaceId, u32, u32, PixelFormat)> {
        self.state.lock().geometry.last().copied()
    }

    pub fn posted(&self) -> Vec<PostedBuffer> {
        self.state.lock().posted.clone()
    }

    /// Make the next `count` buffer locks report an invalidated target
    pub fn invalidate_next_locks(&self, count: u32) {
        self.state.lock().invalidate_next_locks = count;
    }
}

impl NativeDisplay for MemoryDisplay {
    fn acquire_target(&self, id: SurfaceId) -> std::result::Result<Box<dyn NativeWindow>, SurfaceError> {
        self.state.lock().acquired.push(id);
        Ok(Box::new(MemoryWindow { id, state: self.state.clone(), size: (0, 0) }))
    }
}

struct MemoryWindow {
    id: SurfaceId,
    state: Arc<Mutex<DisplayState>>,
    size: (u32, u32),
}

impl NativeWindow for MemoryWindow {
    fn set_buffers_geometry(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> std::result::Result<(), SurfaceError> {
        self.state.lock().geometry.push((self.id, width, height, format));
        self.size = (width, height);
        Ok(())
    }

    fn lock(&mut self) -> std::result::Result<Box<dyn LockedBuffer + '_>, SurfaceError> {
        {
            let mut state = self.state.lock();
            if state.invalidate_next_locks > 0 {
                state.invalidate_next_locks -= 1;
                return Err(SurfaceError::Invalidated);
            }
        }

        let (width, height) = self.size;
        let stride = (width as usize + 31) & !31;
        let uv_stride = (stride / 2 + 15) & !15;
        let uv_rows = ((height + 1) / 2) as usize;
        Ok(Box::new(MemoryBuffer {
            target: self.id,
            state: self.state.clone(),
            stride,
            height,
            bits: vec![0; stride * height as usize + 2 * uv_stride * uv_rows],
        }))
    }
}

struct MemoryBuffer {
    target: SurfaceId,
    state: Arc<Mutex<DisplayState>>,
    stride: usize,
    height: u32,
    bits: Vec<u8>,
}

impl LockedBuffer for MemoryBuffer {
    fn stride(&self) -> usize {
        self.stride
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn bits(&mut self) -> &mut [u8] {
        &mut self.bits
    }

    fn unlock_and_post(self: Box<Self>) -> std::result::Result<(), SurfaceError> {
        let MemoryBuffer { target, state, stride, height, bits } = *self;
        state.lock().posted.push(PostedBuffer { target, stride, height, bits });
        Ok(())
    }
}

/// Performance measurement utilities
pub mod perf_test {
    use std::time::{Duration, Instant};

    pub struct PerfMeasure {
        name: String,
        start: Instant,
        measurements: Vec<Duration>,
    }

    impl PerfMeasure {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                start: Instant::now(),
                measurements: Vec::new(),
            }
        }

        pub fn start(&mut self) {
            self.start = Instant::now();
        }

        pub fn stop(&mut self) {
            self.measurements.push(self.start.elapsed());
        }

        pub fn average(&self) -> Duration {
            if self.measurements.is_empty() {
                return Duration::ZERO;
            }
            let sum: Duration = self.measurements.iter().sum();
            sum / self.measurements.len() as u32
        }

        pub fn report(&self) {
            println!("Performance Report: {}", self.name);
            println!("  Samples: {}", self.measurements.len());
            println!("  Average: {:?}", self.average());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::media::*;

    #[test]
    fn test_mulaw_encoder_matches_table_ends() {
        assert_eq!(mulaw_encode(0), 0xff);
        assert_eq!(mulaw_encode(-32768), 0x00);
        assert_eq!(mulaw_encode(32767), 0x80);
    }

    #[test]
    fn test_picture_size() {
        assert_eq!(yuv420_picture(6, 3, (1, 2)).len(), 18 + 2 * 6);
    }
}
