//! Events broadcast to the UI as the player moves through its lifecycle.

use jellystream_common::{ItemId, PlaySessionId, PlaybackState, StreamingStrategy};
use serde::{Deserialize, Serialize};

/// Something the UI may want to render or log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerEvent {
    StateChanged {
        from: PlaybackState,
        to: PlaybackState,
    },
    SessionStarted {
        item_id: ItemId,
        strategy: StreamingStrategy,
        play_session_id: PlaySessionId,
    },
    StrategyAdvanced {
        from: StreamingStrategy,
        to: StreamingStrategy,
        retry_count: u32,
    },
    /// A non-failure notice, e.g. autoplay was blocked.
    Advisory {
        message: String,
    },
    Failed {
        message: String,
        recoverable: bool,
    },
    RetryCeilingExceeded {
        message: String,
        retry_count: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tagging() {
        let event = PlayerEvent::StateChanged {
            from: PlaybackState::Loading,
            to: PlaybackState::Ready,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"type":"state_changed","from":"loading","to":"ready"}"#
        );
        let back: PlayerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
