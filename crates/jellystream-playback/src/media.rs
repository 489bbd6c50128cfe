//! Platform seam: the media element, the segmented-streaming engine, and the
//! signals they send back.
//!
//! Implementations never call into the controller directly. They hold the
//! [`SignalSink`] they were registered with and emit [`MediaSignal`]s through
//! it; the controller discards anything stamped with a stale generation.

use jellystream_common::Error;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use url::Url;

/// Why a `play()` request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayRejection {
    /// Refused by an autoplay / user-gesture policy.
    NotAllowed,
    /// Interrupted by a pause or source change before it started.
    Aborted,
}

/// Failure class reported by the media element or segment engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaErrorKind {
    Network,
    Decode,
    FormatUnsupported,
}

impl MediaErrorKind {
    /// Lift into the shared error taxonomy.
    pub fn into_error(self, message: impl Into<String>) -> Error {
        let message = message.into();
        match self {
            MediaErrorKind::Network => Error::Network(message),
            MediaErrorKind::Decode => Error::Decode(message),
            MediaErrorKind::FormatUnsupported => Error::FormatUnsupported(message),
        }
    }
}

/// Lifecycle callback from the media element or segment engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSignal {
    /// Enough data is buffered to start playback.
    CanPlay,
    Playing,
    Paused,
    Ended,
    PlayRejected(PlayRejection),
    Error {
        kind: MediaErrorKind,
        message: String,
    },
    /// The segment engine parsed the manifest.
    ManifestParsed { variants: usize },
    /// The segment engine buffered its first segment.
    FirstSegmentReady,
    /// The segment engine hit an error; non-fatal ones it recovers from itself.
    EngineError {
        kind: MediaErrorKind,
        fatal: bool,
        message: String,
    },
}

/// A signal stamped with the generation of the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalEnvelope {
    pub generation: u64,
    pub signal: MediaSignal,
}

/// Listener handed to a media element or segment engine for one session.
#[derive(Debug, Clone)]
pub struct SignalSink {
    generation: u64,
    tx: mpsc::UnboundedSender<SignalEnvelope>,
}

impl SignalSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<SignalEnvelope>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Send `signal`. Returns `false` once the player has shut down.
    pub fn emit(&self, signal: MediaSignal) -> bool {
        self.tx
            .send(SignalEnvelope {
                generation: self.generation,
                signal,
            })
            .is_ok()
    }
}

/// The platform media playback primitive (e.g. an HTML video element).
///
/// Only the playback controller calls these methods.
pub trait MediaElement: Send {
    /// Start delivering lifecycle signals to `sink`, replacing any previous listener.
    fn register(&mut self, sink: SignalSink);

    /// Stop delivering lifecycle signals.
    fn unregister(&mut self);

    /// Assign a URL as the playback source and begin loading it.
    fn set_source(&mut self, url: &Url);

    /// Drop the current source and release its network and decoder resources.
    fn clear_source(&mut self);

    /// Request playback. The outcome arrives as `Playing` or `PlayRejected`.
    fn play(&mut self);

    fn pause(&mut self);

    fn set_muted(&mut self, muted: bool);

    fn request_fullscreen(&mut self) -> Result<(), String>;

    /// Whether the element can play an HLS manifest without a segment engine.
    fn supports_native_hls(&self) -> bool {
        false
    }
}

/// Client-side adaptive streaming engine feeding a media element.
pub trait SegmentEngine: Send {
    /// Bind the engine's output to `media`.
    fn attach_media(&mut self, media: &mut dyn MediaElement);

    /// Fetch and parse the manifest at `url`, then start loading segments.
    fn load_source(&mut self, url: &Url);

    /// Stop all fetches, unregister listeners and detach from the media element.
    fn destroy(self: Box<Self>);
}

/// Creates segment engines, one per adaptive session.
pub trait SegmentEngineFactory: Send {
    /// Whether segmented streaming is available on this platform.
    fn is_supported(&self) -> bool;

    fn create(&mut self, sink: SignalSink) -> Box<dyn SegmentEngine>;
}
