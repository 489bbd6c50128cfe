use jellystream_playback::{MediaElement, MediaErrorKind, MediaSignal, PlayRejection, SignalSink};
use reqwest::header::{CONTENT_TYPE, RANGE};
use reqwest::Client;
use tokio::task::JoinHandle;
use url::Url;

use super::PROBE_RANGE;

/// How [`HttpProbeElement`] answers a play request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum HeadlessAutoplay {
    /// Play is always allowed.
    Allow,
    /// Play is allowed only while muted, like most browsers.
    #[default]
    MutedOnly,
    /// The automatic play request is refused; later ones count as user gestures.
    Block,
}

/// A [`MediaElement`] that probes its source over HTTP.
pub struct HttpProbeElement {
    client: Client,
    autoplay: HeadlessAutoplay,
    native_hls: bool,
    sink: Option<SignalSink>,
    source: Option<Url>,
    probe: Option<JoinHandle<()>>,
    muted: bool,
    playing: bool,
    play_requests: u32,
}

impl HttpProbeElement {
    pub fn new(client: Client, autoplay: HeadlessAutoplay) -> Self {
        Self {
            client,
            autoplay,
            native_hls: false,
            sink: None,
            source: None,
            probe: None,
            muted: false,
            playing: false,
            play_requests: 0,
        }
    }

    /// Treat `.m3u8` sources as directly playable.
    pub fn with_native_hls(mut self, native_hls: bool) -> Self {
        self.native_hls = native_hls;
        self
    }

    pub fn source(&self) -> Option<&Url> {
        self.source.as_ref()
    }

    fn emit(&self, signal: MediaSignal) {
        if let Some(sink) = &self.sink {
            sink.emit(signal);
        }
    }

    fn abort_probe(&mut self) {
        if let Some(probe) = self.probe.take() {
            probe.abort();
        }
    }

    fn play_allowed(&self) -> bool {
        match self.autoplay {
            HeadlessAutoplay::Allow => true,
            HeadlessAutoplay::MutedOnly => self.muted,
            HeadlessAutoplay::Block => self.play_requests > 1,
        }
    }
}

impl MediaElement for HttpProbeElement {
    fn register(&mut self, sink: SignalSink) {
        self.sink = Some(sink);
    }

    fn unregister(&mut self) {
        self.sink = None;
    }

    fn set_source(&mut self, url: &Url) {
        self.abort_probe();
        self.source = Some(url.clone());
        self.playing = false;

        let Some(sink) = self.sink.clone() else {
            return;
        };
        let client = self.client.clone();
        let url = url.clone();
        self.probe = Some(tokio::spawn(async move {
            let signal = probe_source(&client, &url).await;
            sink.emit(signal);
        }));
    }

    fn clear_source(&mut self) {
        self.abort_probe();
        self.source = None;
        self.playing = false;
    }

    fn play(&mut self) {
        self.play_requests += 1;
        if self.play_allowed() {
            self.playing = true;
            self.emit(MediaSignal::Playing);
        } else {
            self.emit(MediaSignal::PlayRejected(PlayRejection::NotAllowed));
        }
    }

    fn pause(&mut self) {
        if self.playing {
            self.playing = false;
            self.emit(MediaSignal::Paused);
        }
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn request_fullscreen(&mut self) -> Result<(), String> {
        Err("fullscreen is not available in headless mode".to_string())
    }

    fn supports_native_hls(&self) -> bool {
        self.native_hls
    }
}

impl Drop for HttpProbeElement {
    fn drop(&mut self) {
        self.abort_probe();
    }
}

/// Fetch the head of `url` and classify the answer.
async fn probe_source(client: &Client, url: &Url) -> MediaSignal {
    tracing::debug!(url = %redact(url), "Probing source");

    let response = match client
        .get(url.clone())
        .header(RANGE, PROBE_RANGE)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            return MediaSignal::Error {
                kind: MediaErrorKind::Network,
                message: format!("request failed: {e}"),
            }
        }
    };

    let status = response.status();
    if !status.is_success() {
        return MediaSignal::Error {
            kind: MediaErrorKind::Network,
            message: format!("server returned {status}"),
        };
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if !is_media_content_type(&content_type) {
        return MediaSignal::Error {
            kind: MediaErrorKind::FormatUnsupported,
            message: format!("not a media stream ({content_type})"),
        };
    }

    match response.bytes().await {
        Ok(body) if !body.is_empty() => MediaSignal::CanPlay,
        Ok(_) => MediaSignal::Error {
            kind: MediaErrorKind::Decode,
            message: "empty response body".to_string(),
        },
        Err(e) => MediaSignal::Error {
            kind: MediaErrorKind::Network,
            message: format!("body read failed: {e}"),
        },
    }
}

/// Error pages come back as text or JSON; anything else is handed to the decoder.
fn is_media_content_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    !(essence.starts_with("text/") || essence == "application/json" || essence.ends_with("+json"))
}

/// `url` without its query string, which carries the access token.
pub(crate) fn redact(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
