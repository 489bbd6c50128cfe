//! Async driver for a [`PlaybackController`].
//!
//! One task owns the controller and serializes everything that can change it:
//! UI commands, media signals, the load watchdog and the automatic
//! fullscreen timer. The UI talks to it through
//! a [`PlayerHandle`] and observes it through a `watch` channel of
//! [`PlayerSnapshot`]s plus the broadcast event stream.

use std::future;

use jellystream_common::{Error, ItemId, Result};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::PlaybackConfig;
use crate::controller::{PlaybackController, PlayerSnapshot};
use crate::events::PlayerEvent;
use crate::media::{MediaElement, SegmentEngineFactory, SignalEnvelope};
use crate::stream_url::StreamTarget;

const COMMAND_CAPACITY: usize = 32;

/// A user action forwarded to the player task.
#[derive(Debug)]
pub enum PlayerCommand {
    Open(ItemId),
    TogglePlay,
    ToggleMute,
    RequestFullscreen,
    ManualRetry,
    /// Tear down and stop; acknowledged once everything is released.
    Close(oneshot::Sender<()>),
}

/// Handle to a running player task.
///
/// Dropping the handle tears the player down.
pub struct PlayerHandle {
    commands: mpsc::Sender<PlayerCommand>,
    snapshots: watch::Receiver<PlayerSnapshot>,
    events: broadcast::Sender<PlayerEvent>,
    task: JoinHandle<()>,
}

/// Start a player task for `target` on the current runtime.
pub fn spawn_player(
    config: PlaybackConfig,
    target: StreamTarget,
    media: Box<dyn MediaElement>,
    engines: Box<dyn SegmentEngineFactory>,
) -> PlayerHandle {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (signal_tx, signal_rx) = mpsc::unbounded_channel();

    let controller = PlaybackController::new(config, target, media, engines, signal_tx);
    let events = controller.event_sender();
    let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());

    let task = tokio::spawn(run_player(controller, command_rx, signal_rx, snapshot_tx));

    PlayerHandle {
        commands: command_tx,
        snapshots: snapshot_rx,
        events,
        task,
    }
}

async fn run_player(
    mut controller: PlaybackController,
    mut commands: mpsc::Receiver<PlayerCommand>,
    mut signals: mpsc::UnboundedReceiver<SignalEnvelope>,
    snapshots: watch::Sender<PlayerSnapshot>,
) {
    tracing::debug!("Player task started");

    loop {
        let watchdog = controller.watchdog_deadline();
        let fullscreen = controller.fullscreen_deadline();

        tokio::select! {
            biased;

            command = commands.recv() => match command {
                Some(PlayerCommand::Close(ack)) => {
                    controller.teardown();
                    snapshots.send_replace(controller.snapshot());
                    let _ = ack.send(());
                    break;
                }
                Some(command) => apply(&mut controller, command),
                None => {
                    controller.teardown();
                    snapshots.send_replace(controller.snapshot());
                    break;
                }
            },

            Some(envelope) = signals.recv() => {
                controller.handle_signal(envelope.generation, envelope.signal);
            }

            _ = expiry(watchdog.map(|(_, deadline)| deadline)) => {
                if let Some((generation, _)) = watchdog {
                    controller.handle_watchdog(generation);
                }
            }

            _ = expiry(fullscreen.map(|(_, deadline)| deadline)) => {
                if let Some((generation, _)) = fullscreen {
                    controller.handle_fullscreen_timer(generation);
                }
            }
        }

        snapshots.send_replace(controller.snapshot());
    }

    tracing::debug!("Player task stopped");
}

fn apply(controller: &mut PlaybackController, command: PlayerCommand) {
    match command {
        PlayerCommand::Open(item_id) => controller.open(item_id),
        PlayerCommand::TogglePlay => controller.toggle_play(),
        PlayerCommand::ToggleMute => {
            controller.toggle_mute();
        }
        PlayerCommand::RequestFullscreen => controller.request_fullscreen(),
        PlayerCommand::ManualRetry => controller.manual_retry(),
        PlayerCommand::Close(_) => {}
    }
}

async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

impl PlayerHandle {
    pub async fn open(&self, item_id: impl Into<ItemId>) -> Result<()> {
        self.send(PlayerCommand::Open(item_id.into())).await
    }

    pub async fn toggle_play(&self) -> Result<()> {
        self.send(PlayerCommand::TogglePlay).await
    }

    pub async fn toggle_mute(&self) -> Result<()> {
        self.send(PlayerCommand::ToggleMute).await
    }

    pub async fn request_fullscreen(&self) -> Result<()> {
        self.send(PlayerCommand::RequestFullscreen).await
    }

    pub async fn manual_retry(&self) -> Result<()> {
        self.send(PlayerCommand::ManualRetry).await
    }

    /// The latest published state.
    pub fn snapshot(&self) -> PlayerSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    /// A receiver that is notified on every state change.
    pub fn watch(&self) -> watch::Receiver<PlayerSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a published snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&PlayerSnapshot) -> bool,
    ) -> Result<PlayerSnapshot> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(predicate)
            .await
            .map_err(|_| Error::internal("player stopped"))?;
        Ok(snapshot.clone())
    }

    /// Tear the player down and wait for the task to finish.
    pub async fn close(self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        if self.commands.send(PlayerCommand::Close(ack)).await.is_ok() {
            let _ = done.await;
        }
        self.task
            .await
            .map_err(|e| Error::internal(format!("player task failed: {e}")))
    }

    async fn send(&self, command: PlayerCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::internal("player stopped"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaSignal;
    use crate::testing::{
        AutoplayPolicy, ElementRemote, EngineRemote, MediaOp, RecordingElement,
        RecordingEngineFactory,
    };
    use jellystream_common::{PlaybackState, StreamingStrategy};
    use std::time::Duration;

    fn spawn(autoplay: AutoplayPolicy, native_hls: bool) -> (PlayerHandle, ElementRemote, EngineRemote) {
        let (element, remote) = RecordingElement::new(autoplay);
        remote.set_native_hls(native_hls);
        let (factory, engines) = RecordingEngineFactory::new(remote.log(), false);
        let handle = spawn_player(
            PlaybackConfig::default(),
            StreamTarget::new("http://media.local:8096", "token"),
            Box::new(element),
            Box::new(factory),
        );
        (handle, remote, engines)
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_then_playing() {
        let (handle, element, _) = spawn(AutoplayPolicy::Allow, true);
        let mut events = handle.subscribe();

        handle.open("abc123").await.unwrap();
        handle
            .wait_for(|s| s.state == PlaybackState::Loading)
            .await
            .unwrap();
        assert!(element.emit(MediaSignal::CanPlay));

        let snapshot = handle
            .wait_for(|s| s.state == PlaybackState::Playing)
            .await
            .unwrap();
        assert_eq!(snapshot.strategy, StreamingStrategy::Adaptive);
        assert_eq!(snapshot.strategy_label, "Adaptive (HLS)");
        assert!(snapshot.is_muted);
        assert!(snapshot.play_session_id.is_some());

        let mut saw_session = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, PlayerEvent::SessionStarted { .. }) {
                saw_session = true;
            }
        }
        assert!(saw_session);

        handle.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_fires_after_load_timeout() {
        let (handle, _element, _) = spawn(AutoplayPolicy::Manual, true);
        handle.open("abc123").await.unwrap();
        handle
            .wait_for(|s| s.state == PlaybackState::Loading)
            .await
            .unwrap();

        tokio::time::advance(Duration::from_millis(14_900)).await;
        settle().await;
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.strategy, StreamingStrategy::Adaptive);
        assert_eq!(snapshot.state, PlaybackState::Loading);

        tokio::time::advance(Duration::from_millis(200)).await;
        let snapshot = handle
            .wait_for(|s| s.strategy == StreamingStrategy::Progressive)
            .await
            .unwrap();
        assert_eq!(snapshot.state, PlaybackState::Loading);
        assert_eq!(snapshot.retry_count, 1);
        assert_eq!(
            snapshot.last_error.as_deref(),
            Some("The stream did not start within 15 seconds.")
        );

        handle.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_ready_from_timed_out_session_is_ignored() {
        let (handle, element, _) = spawn(AutoplayPolicy::Manual, true);
        handle.open("abc123").await.unwrap();
        handle
            .wait_for(|s| s.state == PlaybackState::Loading)
            .await
            .unwrap();
        let stale = element.current_sink().unwrap();

        tokio::time::advance(Duration::from_secs(16)).await;
        handle
            .wait_for(|s| s.strategy == StreamingStrategy::Progressive)
            .await
            .unwrap();

        stale.emit(MediaSignal::CanPlay);
        settle().await;
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.state, PlaybackState::Loading);
        assert_eq!(snapshot.strategy, StreamingStrategy::Progressive);

        // The live session still works.
        element.emit(MediaSignal::CanPlay);
        handle
            .wait_for(|s| s.state == PlaybackState::Ready)
            .await
            .unwrap();

        handle.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_fullscreen_after_playing() {
        let (element, remote) = RecordingElement::new(AutoplayPolicy::Allow);
        remote.set_native_hls(true);
        let (factory, _engines) = RecordingEngineFactory::new(remote.log(), false);
        let config = PlaybackConfig {
            auto_fullscreen_after_ms: Some(2_000),
            ..Default::default()
        };
        let handle = spawn_player(
            config,
            StreamTarget::new("http://media.local:8096", "token"),
            Box::new(element),
            Box::new(factory),
        );

        handle.open("abc123").await.unwrap();
        handle
            .wait_for(|s| s.state == PlaybackState::Loading)
            .await
            .unwrap();
        remote.emit(MediaSignal::CanPlay);
        handle
            .wait_for(|s| s.state == PlaybackState::Playing)
            .await
            .unwrap();

        tokio::time::advance(Duration::from_millis(1_900)).await;
        settle().await;
        assert!(!remote.log().ops().contains(&MediaOp::Fullscreen));

        tokio::time::advance(Duration::from_millis(200)).await;
        settle().await;
        assert!(remote.log().ops().contains(&MediaOp::Fullscreen));

        handle.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_mute_toggle_is_published() {
        let (handle, element, _) = spawn(AutoplayPolicy::Allow, true);
        handle.toggle_mute().await.unwrap();
        let snapshot = handle.wait_for(|s| !s.is_muted).await.unwrap();
        assert_eq!(snapshot.state, PlaybackState::Idle);
        // Nothing attached yet; the flag still reaches the element.
        assert!(element.log().ops().contains(&MediaOp::SetMuted(false)));

        handle.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_releases_session() {
        let (handle, element, _) = spawn(AutoplayPolicy::Allow, true);
        handle.open("abc123").await.unwrap();
        handle
            .wait_for(|s| s.state == PlaybackState::Loading)
            .await
            .unwrap();

        handle.close().await.unwrap();

        let ops = element.log().ops();
        assert!(ops.ends_with(&[MediaOp::Pause, MediaOp::Unregister, MediaOp::ClearSource]));
        assert!(!element.emit(MediaSignal::CanPlay));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_tears_down() {
        let (handle, element, _) = spawn(AutoplayPolicy::Allow, true);
        let mut events = handle.subscribe();
        handle.open("abc123").await.unwrap();
        handle
            .wait_for(|s| s.state == PlaybackState::Loading)
            .await
            .unwrap();

        drop(handle);

        let mut last_state = None;
        loop {
            match events.recv().await {
                Ok(PlayerEvent::StateChanged { to, .. }) => last_state = Some(to),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        assert_eq!(last_state, Some(PlaybackState::Idle));
        assert_eq!(element.log().ops().last(), Some(&MediaOp::ClearSource));
    }
}
