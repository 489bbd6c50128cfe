//! Headless media backend for the command line.
//!
//! There is no decoder here. [`HttpProbeElement`] stands in for a video
//! element: assigning a source issues a ranged GET and reports the stream
//! playable when the server answers with media. [`ManifestEngine`] stands in
//! for a segmented-streaming engine: it walks master playlist, first variant
//! and first segment. Both report back through the controller's signal sink,
//! so the whole retry and fallback path runs exactly as it would in a player.

mod element;
mod hls;

pub use element::{HeadlessAutoplay, HttpProbeElement};
pub use hls::{ManifestEngine, ManifestEngineFactory};

/// Bytes requested when probing a source or segment.
pub(crate) const PROBE_RANGE: &str = "bytes=0-65535";
