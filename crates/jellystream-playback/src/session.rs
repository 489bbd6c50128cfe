//! One playback attempt: an item, a strategy, and the URL built for them.

use jellystream_common::{DeviceId, ItemId, PlaySessionId, Result, StreamingStrategy};
use url::Url;

use crate::config::TranscodeProfile;
use crate::stream_url::{build_stream_url, StreamRequest, StreamTarget};

/// An immutable playback attempt.
///
/// A retry or strategy change never mutates a session; it builds a new one
/// with fresh play session and device identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSession {
    item_id: ItemId,
    strategy: StreamingStrategy,
    url: Url,
    play_session_id: PlaySessionId,
    device_id: DeviceId,
}

/// Source of the identifiers stamped on each new session.
pub type SessionIds = fn() -> (PlaySessionId, DeviceId);

/// A time-based play session ID and a random device ID.
pub fn fresh_ids() -> (PlaySessionId, DeviceId) {
    (PlaySessionId::generate(), DeviceId::random())
}

impl PlaybackSession {
    /// Generate identifiers and build the stream URL for a new attempt.
    pub fn build(
        target: &StreamTarget,
        item_id: &ItemId,
        strategy: StreamingStrategy,
        profile: &TranscodeProfile,
    ) -> Result<Self> {
        let (play_session_id, device_id) = fresh_ids();
        Self::with_ids(target, item_id, strategy, profile, play_session_id, device_id)
    }

    /// Build a session around identifiers the caller already has.
    pub fn with_ids(
        target: &StreamTarget,
        item_id: &ItemId,
        strategy: StreamingStrategy,
        profile: &TranscodeProfile,
        play_session_id: PlaySessionId,
        device_id: DeviceId,
    ) -> Result<Self> {
        let url = build_stream_url(&StreamRequest {
            target,
            item_id,
            strategy,
            play_session_id: &play_session_id,
            device_id: &device_id,
            profile,
        })?;

        Ok(Self {
            item_id: item_id.clone(),
            strategy,
            url,
            play_session_id,
            device_id,
        })
    }

    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    pub fn strategy(&self) -> StreamingStrategy {
        self.strategy
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn play_session_id(&self) -> &PlaySessionId {
        &self.play_session_id
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }
}
