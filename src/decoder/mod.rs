//! Video decode path for mediadrain
//!
//! This module turns compressed video packets into decoded frames. Frames
//! earlier than the playback start are dropped as soon as they leave the
//! engine; frames decoded ahead of presentation wait in a [`FrameQueue`]
//! until the caller asks for them.

mod frame_queue;
mod output;
mod timeline;
mod video;

pub use frame_queue::{FrameQueue, QueueStats, DEFAULT_WARN_DEPTH};
pub use output::{OutputMode, VideoOutputBuffer};
pub use timeline::{OutputTimeline, StartTimeGate};
pub use video::{DrainMode, DrainOutcome, VideoDecoder};
