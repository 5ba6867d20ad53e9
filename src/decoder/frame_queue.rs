//! Queue of decoded frames awaiting presentation
//!
//! Frames the decoder produced ahead of the caller are parked here in
//! decode order. The queue never drops or reorders frames; everything in
//! it has already passed the start-time and decode-only checks.

use crate::engine::DecodedFrame;
use log::{trace, warn};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Default depth above which pushes are logged as a backlog
pub const DEFAULT_WARN_DEPTH: usize = 16;

/// Thread-safe FIFO of decoded frames
pub struct FrameQueue {
    inner: Mutex<QueueInner>,

    /// Depth above which pushes are logged
    warn_depth: usize,
}

struct QueueInner {
    frames: VecDeque<DecodedFrame>,
    stats: QueueStats,
    last_pts: Option<i64>,
}

/// Queue statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Total frames added
    pub frames_added: u64,

    /// Total frames handed out by `pop`
    pub frames_consumed: u64,

    /// Total frames released by `clear`
    pub frames_cleared: u64,

    /// Maximum queue depth reached
    pub max_depth: usize,
}

impl FrameQueue {
    pub fn new(warn_depth: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                frames: VecDeque::new(),
                stats: QueueStats::default(),
                last_pts: None,
            }),
            warn_depth: warn_depth.max(1),
        }
    }

    /// Append a frame; ownership moves into the queue
    pub fn push(&self, frame: DecodedFrame) {
        let mut inner = self.inner.lock();

        if let (Some(last), Some(pts)) = (inner.last_pts, frame.pts) {
            if pts < last {
                trace!("Queued frame PTS {} precedes previous {}", pts, last);
            }
        }
        if frame.pts.is_some() {
            inner.last_pts = frame.pts;
        }

        inner.frames.push_back(frame);
        let depth = inner.frames.len();
        inner.stats.frames_added += 1;
        inner.stats.max_depth = inner.stats.max_depth.max(depth);

        if depth > self.warn_depth {
            warn!("Frame queue backlog at {} frames", depth);
        }
    }

    /// Remove and return the oldest frame
    pub fn pop(&self) -> Option<DecodedFrame> {
        let mut inner = self.inner.lock();
        let frame = inner.frames.pop_front()?;
        inner.stats.frames_consumed += 1;
        Some(frame)
    }

    /// Number of frames held
    pub fn size(&self) -> usize {
        self.inner.lock().frames.len()
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().frames.is_empty()
    }

    /// Release every held frame, returning how many there were
    pub fn clear(&self) -> usize {
        // Frames are dropped after the lock is released
        let drained: Vec<DecodedFrame> = {
            let mut inner = self.inner.lock();
            inner.last_pts = None;
            let drained: Vec<_> = inner.frames.drain(..).collect();
            inner.stats.frames_cleared += drained.len() as u64;
            drained
        };

        let count = drained.len();
        if count > 0 {
            trace!("Released {} queued frames", count);
        }
        count
    }

    /// Get queue statistics
    pub fn stats(&self) -> QueueStats {
        self.inner.lock().stats.clone()
    }

    /// PTS of the oldest and newest held frame
    pub fn pts_range(&self) -> Option<(Option<i64>, Option<i64>)> {
        let inner = self.inner.lock();
        let first = inner.frames.front()?;
        let last = inner.frames.back()?;
        Some((first.pts, last.pts))
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_DEPTH)
    }
}
