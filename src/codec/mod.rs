//! Codec context lifecycle
//!
//! A [`CodecContext`] owns one open engine handle together with everything
//! needed to recreate it: codec id, extradata and open parameters. Codecs
//! whose internal flush is unreliable are closed and reopened instead.

mod context;
mod params;

pub use context::{CodecContext, FlushKind};
pub use params::{CodecParams, ThreadingMode};
