//! Playback tuning: load watchdog, retry ceiling, autoplay, transcode targets.
//!
//! Every field defaults to the values the web client shipped with, so an empty
//! `[playback]` table is valid.

use jellystream_common::{Error, Result, StreamingStrategy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// How long a session may stay in `Loading` before it is failed.
    pub load_timeout_ms: u64,
    /// Full passes over the strategy ring before giving up.
    pub retry_cycles: u32,
    /// Mute before the automatic play attempt (unmuted autoplay is usually blocked).
    pub autoplay_muted: bool,
    /// Request fullscreen this long after a session starts playing. Off when unset.
    pub auto_fullscreen_after_ms: Option<u64>,
    /// Codec, container and bitrate targets for transcoded strategies.
    pub transcode: TranscodeProfile,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: 15_000,
            retry_cycles: 2,
            autoplay_muted: true,
            auto_fullscreen_after_ms: None,
            transcode: TranscodeProfile::default(),
        }
    }
}

impl PlaybackConfig {
    /// Load watchdog duration.
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Maximum consecutive failed attempts before playback is given up.
    pub fn retry_ceiling(&self) -> u32 {
        self.retry_cycles
            .saturating_mul(StreamingStrategy::ALL.len() as u32)
    }

    /// Reject values that would disable the watchdog or the retry loop.
    pub fn validate(&self) -> Result<()> {
        if self.load_timeout_ms == 0 {
            return Err(Error::config("playback.load_timeout_ms must be greater than 0"));
        }
        if self.retry_cycles == 0 {
            return Err(Error::config("playback.retry_cycles must be at least 1"));
        }
        self.transcode.validate()
    }
}

/// Transcode targets sent with `Adaptive` and `Progressive` requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeProfile {
    pub video_codec: String,
    pub audio_codec: String,
    /// Container for progressive downloads.
    pub container: String,
    /// Container for adaptive segments (`ts` or `mp4`).
    pub segment_container: String,
    pub max_width: u32,
    pub max_height: u32,
    pub video_bitrate: u64,
    pub audio_bitrate: u64,
    pub max_audio_channels: u32,
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self {
            video_codec: "h264".to_string(),
            audio_codec: "aac".to_string(),
            container: "mp4".to_string(),
            segment_container: "ts".to_string(),
            max_width: 1920,
            max_height: 1080,
            video_bitrate: 3_000_000,
            audio_bitrate: 128_000,
            max_audio_channels: 2,
        }
    }
}

impl TranscodeProfile {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("video_codec", &self.video_codec),
            ("audio_codec", &self.audio_codec),
            ("container", &self.container),
            ("segment_container", &self.segment_container),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config(format!(
                    "playback.transcode.{name} must not be empty"
                )));
            }
        }
        if self.max_width == 0 || self.max_height == 0 {
            return Err(Error::config("playback.transcode resolution must be non-zero"));
        }
        Ok(())
    }
}
