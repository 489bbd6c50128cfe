//! Stream URL construction for each streaming strategy.
//!
//! - `Adaptive`: `{server}/Videos/{id}/master.m3u8` with codec, bitrate and
//!   segment container negotiation
//! - `Progressive`: `{server}/Videos/{id}/stream` with a fixed transcode target
//!   and direct play/stream disabled
//! - `PassThrough`: `{server}/Videos/{id}/stream?static=true`
//!
//! Every URL carries the access token, the media source, a device ID and a
//! play session ID. Building is pure: no I/O, no clock reads.

use std::fmt;

use jellystream_common::{DeviceId, Error, ItemId, PlaySessionId, Result, StreamingStrategy};
use url::Url;

use crate::config::TranscodeProfile;

/// Server address and credentials needed to address stream endpoints.
#[derive(Clone, PartialEq, Eq)]
pub struct StreamTarget {
    server: String,
    access_token: String,
}

impl StreamTarget {
    pub fn new(server: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            access_token: access_token.into(),
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for StreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamTarget")
            .field("server", &self.server)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Everything that goes into one stream URL.
#[derive(Debug, Clone, Copy)]
pub struct StreamRequest<'a> {
    pub target: &'a StreamTarget,
    pub item_id: &'a ItemId,
    pub strategy: StreamingStrategy,
    pub play_session_id: &'a PlaySessionId,
    pub device_id: &'a DeviceId,
    pub profile: &'a TranscodeProfile,
}

/// Build the fully qualified resource URL for `request`.
///
/// Returns [`Error::InvalidStreamRequest`] when the server address, item ID or
/// access token is missing, or the server address is not an http(s) URL.
pub fn build_stream_url(request: &StreamRequest<'_>) -> Result<Url> {
    let server = request.target.server.trim();
    if server.is_empty() {
        return Err(Error::invalid_stream_request("missing server address"));
    }
    if request.item_id.is_empty() {
        return Err(Error::invalid_stream_request("missing item id"));
    }
    if request.target.access_token.trim().is_empty() {
        return Err(Error::invalid_stream_request("missing access token"));
    }

    let mut url = Url::parse(server).map_err(|e| {
        Error::invalid_stream_request(format!("invalid server address '{server}': {e}"))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::invalid_stream_request(format!(
            "unsupported server scheme '{}'",
            url.scheme()
        )));
    }
    url.set_query(None);
    url.set_fragment(None);

    let resource = match request.strategy {
        StreamingStrategy::Adaptive => "master.m3u8",
        StreamingStrategy::Progressive | StreamingStrategy::PassThrough => "stream",
    };
    url.path_segments_mut()
        .map_err(|_| Error::invalid_stream_request("server address cannot be a base URL"))?
        .pop_if_empty()
        .extend(["Videos", request.item_id.as_str(), resource]);

    let profile = request.profile;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("api_key", request.target.access_token.trim())
            .append_pair("MediaSourceId", request.item_id.as_str())
            .append_pair("DeviceId", request.device_id.as_str())
            .append_pair("PlaySessionId", request.play_session_id.as_str());

        match request.strategy {
            StreamingStrategy::Adaptive => {
                query
                    .append_pair("VideoCodec", &profile.video_codec)
                    .append_pair("AudioCodec", &profile.audio_codec)
                    .append_pair("SegmentContainer", &profile.segment_container)
                    .append_pair(
                        "TranscodingMaxAudioChannels",
                        &profile.max_audio_channels.to_string(),
                    )
                    .append_pair("VideoBitrate", &profile.video_bitrate.to_string())
                    .append_pair("AudioBitrate", &profile.audio_bitrate.to_string())
                    .append_pair("MaxWidth", &profile.max_width.to_string())
                    .append_pair("MaxHeight", &profile.max_height.to_string())
                    .append_pair("BreakOnNonKeyFrames", "true");
            }
            StreamingStrategy::Progressive => {
                query
                    .append_pair("VideoCodec", &profile.video_codec)
                    .append_pair("AudioCodec", &profile.audio_codec)
                    .append_pair("Container", &profile.container)
                    .append_pair("TranscodingContainer", &profile.container)
                    .append_pair("MaxWidth", &profile.max_width.to_string())
                    .append_pair("MaxHeight", &profile.max_height.to_string())
                    .append_pair(
                        "TranscodingMaxAudioChannels",
                        &profile.max_audio_channels.to_string(),
                    )
                    .append_pair("allowDirectPlay", "false")
                    .append_pair("allowDirectStream", "false")
                    .append_pair("EnableSubtitles", "false")
                    .append_pair("SubtitleMethod", "Encode")
                    .append_pair("StartTimeTicks", "0")
                    .append_pair("VideoBitrate", &profile.video_bitrate.to_string())
                    .append_pair("AudioBitrate", &profile.audio_bitrate.to_string());
            }
            StreamingStrategy::PassThrough => {
                query.append_pair("static", "true");
            }
        }
    }

    Ok(url)
}
