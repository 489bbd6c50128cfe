//! Core type definitions for streaming strategies, playback state, and images.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// StreamingStrategy
// ---------------------------------------------------------------------------

/// How the server delivers a stream to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamingStrategy {
    /// Segmented, manifest-driven delivery (HLS).
    #[default]
    Adaptive,
    /// A single transcoded file with a fixed target codec and container.
    Progressive,
    /// The original file, served without transcoding.
    PassThrough,
}

impl StreamingStrategy {
    /// All strategies in ring order.
    pub const ALL: [StreamingStrategy; 3] = [
        StreamingStrategy::Adaptive,
        StreamingStrategy::Progressive,
        StreamingStrategy::PassThrough,
    ];

    /// The strategy tried after this one fails.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Adaptive => Self::Progressive,
            Self::Progressive => Self::PassThrough,
            Self::PassThrough => Self::Adaptive,
        }
    }

    /// Label shown to the user next to the player controls.
    pub fn label(self) -> &'static str {
        match self {
            Self::Adaptive => "Adaptive (HLS)",
            Self::Progressive => "Transcoded (MP4)",
            Self::PassThrough => "Direct (original file)",
        }
    }
}

impl fmt::Display for StreamingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adaptive => write!(f, "adaptive"),
            Self::Progressive => write!(f, "progressive"),
            Self::PassThrough => write!(f, "passthrough"),
        }
    }
}

impl FromStr for StreamingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "adaptive" | "hls" => Ok(Self::Adaptive),
            "progressive" | "transcode" => Ok(Self::Progressive),
            "passthrough" | "direct" | "static" => Ok(Self::PassThrough),
            other => Err(format!("unknown streaming strategy: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackState
// ---------------------------------------------------------------------------

/// Player lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    Errored,
}

impl PlaybackState {
    /// Whether `self -> next` is a legal transition.
    ///
    /// Any state may fall back to `Idle`, which is how teardown and fresh
    /// navigation release the current session.
    pub fn can_transition_to(self, next: PlaybackState) -> bool {
        use PlaybackState::*;
        matches!(
            (self, next),
            (_, Idle)
                | (Idle, Loading)
                | (Loading, Ready)
                | (Ready, Playing)
                | (Ready, Paused)
                | (Playing, Paused)
                | (Paused, Playing)
                | (Playing, Ended)
                | (Loading | Ready | Playing | Paused, Errored)
                | (Errored, Loading)
        )
    }

    /// States in which a session is attached and can fail.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            PlaybackState::Loading
                | PlaybackState::Ready
                | PlaybackState::Playing
                | PlaybackState::Paused
        )
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
            Self::Ended => write!(f, "ended"),
            Self::Errored => write!(f, "errored"),
        }
    }
}

// ---------------------------------------------------------------------------
// ImageType
// ---------------------------------------------------------------------------

/// Type of item artwork served by the image endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageType {
    /// Primary poster image.
    Primary,
    /// Background/backdrop image.
    Backdrop,
    /// Thumbnail image.
    Thumb,
}

impl ImageType {
    /// Path segment used by the server's image endpoint.
    pub fn as_path(self) -> &'static str {
        match self {
            Self::Primary => "Primary",
            Self::Backdrop => "Backdrop",
            Self::Thumb => "Thumb",
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

impl FromStr for ImageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "backdrop" => Ok(Self::Backdrop),
            "thumb" => Ok(Self::Thumb),
            other => Err(format!("unknown image type: {other}")),
        }
    }
}
