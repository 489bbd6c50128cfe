//! End-to-end playback against a mock media server using the headless backend.

mod common;

use std::time::Duration;

use common::TestServer;
use jellystream::headless::{HeadlessAutoplay, HttpProbeElement, ManifestEngineFactory};
use jellystream_common::{PlaybackState, StreamingStrategy};
use jellystream_playback::{spawn_player, PlaybackConfig, PlayerEvent, PlayerHandle, PlayerSnapshot};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

const MASTER: &str = "#EXTM3U\n\
#EXT-X-STREAM-INF:BANDWIDTH=3128000,RESOLUTION=1920x1080\n\
main.m3u8\n";

const MEDIA: &str = "#EXTM3U\n\
#EXT-X-VERSION:3\n\
#EXT-X-TARGETDURATION:6\n\
#EXTINF:6.0,\n\
hls1/main/0.ts\n\
#EXT-X-ENDLIST\n";

async fn start_player(h: &TestServer, autoplay: HeadlessAutoplay) -> PlayerHandle {
    let ctx = h.login().await;
    let http = reqwest::Client::new();
    spawn_player(
        PlaybackConfig::default(),
        ctx.stream_target(),
        Box::new(HttpProbeElement::new(http.clone(), autoplay)),
        Box::new(ManifestEngineFactory::new(http)),
    )
}

async fn wait(
    player: &PlayerHandle,
    predicate: impl FnMut(&PlayerSnapshot) -> bool,
) -> PlayerSnapshot {
    tokio::time::timeout(Duration::from_secs(10), player.wait_for(predicate))
        .await
        .expect("player did not reach the expected state")
        .unwrap()
}

async fn mount_video(h: &TestServer) {
    Mock::given(method("GET"))
        .and(path("/Videos/abc/stream"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("Content-Type", "video/mp4")
                .set_body_bytes(vec![0u8; 1024]),
        )
        .mount(&h.server)
        .await;
}

#[tokio::test]
async fn adaptive_stream_plays() {
    let h = TestServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Videos/abc/master.m3u8"))
        .and(query_param("api_key", common::TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_string(MASTER))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Videos/abc/main.m3u8"))
        .and(query_param("api_key", common::TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_string(MEDIA))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Videos/abc/hls1/main/0.ts"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x47u8; 188]))
        .mount(&h.server)
        .await;

    let player = start_player(&h, HeadlessAutoplay::MutedOnly).await;
    player.open("abc").await.unwrap();

    let snapshot = wait(&player, |s| s.state == PlaybackState::Playing).await;
    assert_eq!(snapshot.strategy, StreamingStrategy::Adaptive);
    assert_eq!(snapshot.retry_count, 0);
    assert!(snapshot.is_muted);
    assert!(snapshot.last_error.is_none());

    player.close().await.unwrap();
}

#[tokio::test]
async fn falls_back_to_progressive_when_manifest_fails() {
    let h = TestServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Videos/abc/master.m3u8"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;
    mount_video(&h).await;

    let player = start_player(&h, HeadlessAutoplay::MutedOnly).await;
    let mut events = player.subscribe();
    player.open("abc").await.unwrap();

    let snapshot = wait(&player, |s| s.state == PlaybackState::Playing).await;
    assert_eq!(snapshot.strategy, StreamingStrategy::Progressive);
    assert_eq!(snapshot.strategy_label, "Transcoded (MP4)");
    // Reaching Playing clears the failure counter and the manifest error.
    assert_eq!(snapshot.retry_count, 0);
    assert!(snapshot.last_error.is_none());

    let mut advanced = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let PlayerEvent::StrategyAdvanced { from, to, .. } = event {
            advanced.push((from, to));
        }
    }
    assert_eq!(
        advanced,
        vec![(StreamingStrategy::Adaptive, StreamingStrategy::Progressive)]
    );

    player.close().await.unwrap();
}

#[tokio::test]
async fn html_response_is_not_playable() {
    let h = TestServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Videos/abc/master.m3u8"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Videos/abc/stream"))
        .and(query_param("static", "true"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "video/x-matroska")
                .set_body_bytes(vec![0x1Au8; 512]),
        )
        .with_priority(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Videos/abc/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html>transcoding disabled</html>", "text/html; charset=utf-8"),
        )
        .mount(&h.server)
        .await;

    let player = start_player(&h, HeadlessAutoplay::Allow).await;
    player.open("abc").await.unwrap();

    let snapshot = wait(&player, |s| s.state == PlaybackState::Playing).await;
    assert_eq!(snapshot.strategy, StreamingStrategy::PassThrough);

    player.close().await.unwrap();
}

#[tokio::test]
async fn every_strategy_failing_is_terminal() {
    let h = TestServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Videos/abc/master.m3u8"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Videos/abc/stream"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;

    let player = start_player(&h, HeadlessAutoplay::Allow).await;
    let mut events = player.subscribe();
    player.open("abc").await.unwrap();

    let snapshot = wait(&player, |s| s.terminal).await;
    assert_eq!(snapshot.state, PlaybackState::Errored);
    assert_eq!(
        snapshot.last_error.as_deref(),
        Some("Unable to play this item with any available streaming method.")
    );

    let mut terminal = 0;
    let mut sessions = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            PlayerEvent::RetryCeilingExceeded { .. } => terminal += 1,
            PlayerEvent::SessionStarted { .. } => sessions += 1,
            _ => {}
        }
    }
    assert_eq!(terminal, 1);
    assert_eq!(sessions, 6);

    // Manual retry moves on from the last strategy with a fresh counter.
    let mut after = player.subscribe();
    player.manual_retry().await.unwrap();
    let advanced = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match after.recv().await {
                Ok(event @ PlayerEvent::StrategyAdvanced { .. }) => break event,
                Ok(_) => {}
                Err(e) => panic!("event stream ended: {e}"),
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(
        advanced,
        PlayerEvent::StrategyAdvanced {
            from: StreamingStrategy::PassThrough,
            to: StreamingStrategy::Adaptive,
            retry_count: 0,
        }
    );

    player.close().await.unwrap();
}

#[tokio::test]
async fn blocked_autoplay_waits_for_play() {
    let h = TestServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Videos/abc/master.m3u8"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;
    mount_video(&h).await;

    let player = start_player(&h, HeadlessAutoplay::Block).await;
    player.open("abc").await.unwrap();

    let snapshot = wait(&player, |s| s.state == PlaybackState::Paused).await;
    assert_eq!(snapshot.strategy, StreamingStrategy::Progressive);
    assert!(snapshot
        .last_error
        .as_deref()
        .unwrap()
        .starts_with("Autoplay was blocked"));

    player.toggle_play().await.unwrap();
    let snapshot = wait(&player, |s| s.state == PlaybackState::Playing).await;
    assert!(snapshot.last_error.is_none());
    assert_eq!(snapshot.strategy, StreamingStrategy::Progressive);

    player.close().await.unwrap();
}
