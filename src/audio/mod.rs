//! Audio decode path for mediadrain
//!
//! This module turns compressed audio packets into interleaved PCM in the
//! caller's requested format. Each decode call feeds one packet, drains
//! every frame the decoder produced and converts them into a growable
//! output buffer.

mod buffer;
mod drain;
mod resample;

pub use buffer::{GrowableBuffer, OutputBuffer};
pub use drain::AudioDecoder;
pub use resample::ResampleState;
