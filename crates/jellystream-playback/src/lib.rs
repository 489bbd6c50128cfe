//! jellystream-playback: streaming strategy selection and the playback engine adapter.
//!
//! The pieces, leaf first:
//!
//! - [`stream_url`]: builds the server URL for one (item, strategy) attempt
//! - [`StrategyCycler`]: walks the Adaptive → Progressive → PassThrough ring on failure
//! - [`AttemptTracker`]: remembers URLs already handed to the player
//! - [`PlaybackController`]: owns the media element and segment engine, runs the
//!   playback state machine, the load watchdog and the retry policy
//! - [`spawn_player`]: drives a controller on one task and hands out a [`PlayerHandle`]
//!
//! The platform media primitive is abstracted behind [`MediaElement`],
//! [`SegmentEngine`] and [`SegmentEngineFactory`]. Callbacks come back as
//! [`MediaSignal`]s tagged with the generation of the session that registered
//! them, so signals from a released session are never applied to a newer one.

pub mod attempts;
pub mod config;
pub mod controller;
pub mod cycler;
pub mod driver;
pub mod events;
pub mod media;
pub mod session;
pub mod stream_url;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use attempts::AttemptTracker;
pub use config::{PlaybackConfig, TranscodeProfile};
pub use controller::{PlaybackController, PlayerSnapshot};
pub use cycler::StrategyCycler;
pub use driver::{spawn_player, PlayerCommand, PlayerHandle};
pub use events::PlayerEvent;
pub use media::{
    MediaElement, MediaErrorKind, MediaSignal, PlayRejection, SegmentEngine, SegmentEngineFactory,
    SignalEnvelope, SignalSink,
};
pub use session::PlaybackSession;
pub use stream_url::{build_stream_url, StreamRequest, StreamTarget};
