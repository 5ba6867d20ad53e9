//! Caller-side playback timeline as seen by the video drain loop

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

const UNSET: i64 = i64::MIN;

/// What the drain loop needs from the caller's timeline
pub trait OutputTimeline: Send + Sync {
    /// Whether a frame at `timestamp` is at or after the playback start
    fn is_at_least_start_time(&self, timestamp: i64) -> bool;

    /// Report frames that were decoded but never shown
    fn add_skipped_frames(&self, count: u32);
}

/// Start-time threshold shared between the control and decode threads
#[derive(Debug)]
pub struct StartTimeGate {
    start_time: AtomicI64,
    skipped: AtomicU64,
}

impl StartTimeGate {
    /// A gate with no start time, letting every frame through
    pub fn new() -> Self {
        Self {
            start_time: AtomicI64::new(UNSET),
            skipped: AtomicU64::new(0),
        }
    }

    pub fn with_start_time(start_time: i64) -> Self {
        let gate = Self::new();
        gate.set_start_time(Some(start_time));
        gate
    }

    /// Set or clear the threshold
    pub fn set_start_time(&self, start_time: Option<i64>) {
        self.start_time.store(start_time.unwrap_or(UNSET), Ordering::Release);
    }

    pub fn start_time(&self) -> Option<i64> {
        match self.start_time.load(Ordering::Acquire) {
            UNSET => None,
            start => Some(start),
        }
    }

    /// Frames reported as skipped so far
    pub fn skipped_frames(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}

impl Default for StartTimeGate {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputTimeline for StartTimeGate {
    fn is_at_least_start_time(&self, timestamp: i64) -> bool {
        self.start_time().map_or(true, |start| timestamp >= start)
    }

    fn add_skipped_frames(&self, count: u32) {
        self.skipped.fetch_add(count as u64, Ordering::Relaxed);
    }
}
