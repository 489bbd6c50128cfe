use jellystream_playback::{
    MediaElement, MediaErrorKind, MediaSignal, SegmentEngine, SegmentEngineFactory, SignalSink,
};
use m3u8_rs::Playlist;
use reqwest::header::RANGE;
use reqwest::Client;
use tokio::task::JoinHandle;
use url::Url;

use super::element::redact;
use super::PROBE_RANGE;

/// Creates a [`ManifestEngine`] per adaptive session.
pub struct ManifestEngineFactory {
    client: Client,
}

impl ManifestEngineFactory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl SegmentEngineFactory for ManifestEngineFactory {
    fn is_supported(&self) -> bool {
        true
    }

    fn create(&mut self, sink: SignalSink) -> Box<dyn SegmentEngine> {
        Box::new(ManifestEngine {
            client: self.client.clone(),
            sink,
            attached: false,
            task: None,
        })
    }
}

/// Loads an HLS master playlist, its first variant and first segment.
pub struct ManifestEngine {
    client: Client,
    sink: SignalSink,
    attached: bool,
    task: Option<JoinHandle<()>>,
}

/// Why loading stopped.
#[derive(Debug)]
struct LoadFailure {
    kind: MediaErrorKind,
    message: String,
}

impl LoadFailure {
    fn network(message: impl Into<String>) -> Self {
        Self {
            kind: MediaErrorKind::Network,
            message: message.into(),
        }
    }

    fn format(message: impl Into<String>) -> Self {
        Self {
            kind: MediaErrorKind::FormatUnsupported,
            message: message.into(),
        }
    }
}

impl SegmentEngine for ManifestEngine {
    fn attach_media(&mut self, _media: &mut dyn MediaElement) {
        self.attached = true;
    }

    fn load_source(&mut self, url: &Url) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if !self.attached {
            tracing::warn!("Segment engine loading without an attached media element");
        }

        let client = self.client.clone();
        let sink = self.sink.clone();
        let url = url.clone();
        self.task = Some(tokio::spawn(async move {
            if let Err(failure) = load(&client, &sink, &url).await {
                sink.emit(MediaSignal::EngineError {
                    kind: failure.kind,
                    fatal: true,
                    message: failure.message,
                });
            }
        }));
    }

    fn destroy(self: Box<Self>) {
        if let Some(task) = &self.task {
            task.abort();
        }
        tracing::debug!(generation = self.sink.generation(), "Segment engine destroyed");
    }
}

async fn load(client: &Client, sink: &SignalSink, master_url: &Url) -> Result<(), LoadFailure> {
    tracing::debug!(url = %redact(master_url), "Loading manifest");

    let media_url = match fetch_playlist(client, master_url).await? {
        Playlist::MasterPlaylist(master) => {
            let variant = master
                .variants
                .iter()
                .find(|v| !v.is_i_frame)
                .ok_or_else(|| LoadFailure::format("master playlist has no variants"))?;
            sink.emit(MediaSignal::ManifestParsed {
                variants: master.variants.len(),
            });
            resolve(master_url, &variant.uri)?
        }
        Playlist::MediaPlaylist(_) => {
            sink.emit(MediaSignal::ManifestParsed { variants: 1 });
            master_url.clone()
        }
    };

    let segment = match fetch_playlist(client, &media_url).await? {
        Playlist::MediaPlaylist(media) => media
            .segments
            .first()
            .map(|s| s.uri.clone())
            .ok_or_else(|| LoadFailure::format("media playlist has no segments"))?,
        Playlist::MasterPlaylist(_) => {
            return Err(LoadFailure::format("variant is itself a master playlist"))
        }
    };
    let segment_url = resolve(&media_url, &segment)?;

    let response = client
        .get(segment_url.clone())
        .header(RANGE, PROBE_RANGE)
        .send()
        .await
        .map_err(|e| LoadFailure::network(format!("segment request failed: {e}")))?;
    if !response.status().is_success() {
        return Err(LoadFailure::network(format!(
            "segment {} returned {}",
            redact(&segment_url),
            response.status()
        )));
    }

    sink.emit(MediaSignal::FirstSegmentReady);
    Ok(())
}

async fn fetch_playlist(client: &Client, url: &Url) -> Result<Playlist, LoadFailure> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| LoadFailure::network(format!("playlist request failed: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(LoadFailure::network(format!(
            "playlist {} returned {}",
            redact(url),
            status
        )));
    }
    let body = response
        .bytes()
        .await
        .map_err(|e| LoadFailure::network(format!("playlist read failed: {e}")))?;
    parse(&body)
}

fn parse(body: &[u8]) -> Result<Playlist, LoadFailure> {
    m3u8_rs::parse_playlist_res(body)
        .map_err(|e| LoadFailure::format(format!("invalid playlist: {e}")))
}

/// Resolve a playlist URI against the playlist it came from.
///
/// Relative URIs inherit nothing from the parent's query, so the parent's
/// query string (which carries the access token) is appended when the
/// resolved URI has none.
fn resolve(base: &Url, uri: &str) -> Result<Url, LoadFailure> {
    let mut url = base
        .join(uri)
        .map_err(|e| LoadFailure::format(format!("bad playlist uri '{uri}': {e}")))?;
    if url.query().is_none() && url.host() == base.host() {
        url.set_query(base.query());
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U\n\
#EXT-X-STREAM-INF:BANDWIDTH=3128000,RESOLUTION=1920x1080\n\
main.m3u8?PlaySessionId=p1\n\
#EXT-X-STREAM-INF:BANDWIDTH=1128000,RESOLUTION=1280x720\n\
low.m3u8?PlaySessionId=p1\n";

    const MEDIA: &str = "#EXTM3U\n\
#EXT-X-VERSION:3\n\
#EXT-X-TARGETDURATION:6\n\
#EXTINF:6.0,\n\
hls1/main/0.ts\n\
#EXTINF:6.0,\n\
hls1/main/1.ts\n\
#EXT-X-ENDLIST\n";

    #[test]
    fn test_parse_master() {
        match parse(MASTER.as_bytes()) {
            Ok(Playlist::MasterPlaylist(master)) => {
                assert_eq!(master.variants.len(), 2);
                assert_eq!(master.variants[0].uri, "main.m3u8?PlaySessionId=p1");
            }
            _ => panic!("expected master playlist"),
        }
    }

    #[test]
    fn test_parse_media() {
        match parse(MEDIA.as_bytes()) {
            Ok(Playlist::MediaPlaylist(media)) => assert_eq!(media.segments[0].uri, "hls1/main/0.ts"),
            _ => panic!("expected media playlist"),
        }
    }

    #[test]
    fn test_parse_rejects_html() {
        assert!(parse(b"<html>login</html>").is_err());
    }

    #[test]
    fn test_resolve_keeps_token_for_relative_uris() {
        let base = Url::parse("http://media/Videos/a/master.m3u8?api_key=t").unwrap();
        let url = resolve(&base, "hls1/main/0.ts").unwrap();
        assert_eq!(url.as_str(), "http://media/Videos/a/hls1/main/0.ts?api_key=t");

        let url = resolve(&base, "main.m3u8?PlaySessionId=p1").unwrap();
        assert_eq!(url.query(), Some("PlaySessionId=p1"));
    }
}
