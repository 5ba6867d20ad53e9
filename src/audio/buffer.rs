use crate::utils::error::{Error, Result};
use log::{debug, warn};

/// Caller-owned output region the audio decoder writes into
///
/// The pipeline asks for growth before any write that would overflow.
/// Implementations must keep previously written bytes when they grow.
pub trait OutputBuffer {
    /// Bytes currently writable
    fn capacity(&self) -> usize;

    /// Make at least `required` bytes writable
    fn grow(&mut self, required: usize) -> Result<()>;

    fn as_mut_slice(&mut self) -> &mut [u8];
}

/// Heap buffer that grows on request, optionally up to a hard limit
#[derive(Debug, Default)]
pub struct GrowableBuffer {
    data: Vec<u8>,
    limit: Option<usize>,
    grow_requests: Vec<usize>,
}

impl GrowableBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            ..Self::default()
        }
    }

    /// Refuse growth beyond `limit` bytes
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Sizes passed to every [`OutputBuffer::grow`] call so far
    pub fn grow_requests(&self) -> &[usize] {
        &self.grow_requests
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl OutputBuffer for GrowableBuffer {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn grow(&mut self, required: usize) -> Result<()> {
        self.grow_requests.push(required);

        if let Some(limit) = self.limit {
            if required > limit {
                warn!("Output growth to {} bytes exceeds limit {}", required, limit);
                return Err(Error::ResourceExhausted(format!(
                    "output buffer limited to {} bytes, {} requested",
                    limit, required
                )));
            }
        }

        if required > self.data.len() {
            self.data
                .try_reserve_exact(required - self.data.len())
                .map_err(|e| Error::ResourceExhausted(format!("growing output buffer: {}", e)))?;
            self.data.resize(required, 0);
            debug!("Output buffer grown to {} bytes", required);
        }
        Ok(())
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}
