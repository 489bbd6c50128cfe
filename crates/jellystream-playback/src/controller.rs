//! Playback engine adapter.
//!
//! [`PlaybackController`] is the only code that touches the media element and
//! the segment engine. It is a synchronous state machine: the driver feeds it
//! UI commands, media signals and watchdog expiries one at a time, and reads
//! back the watchdog deadline and a [`PlayerSnapshot`] after each step.
//!
//! Lifecycle:
//!
//! ```text
//! Idle -> Loading -> Ready -> Playing <-> Paused -> Ended
//!            |         |        |           |
//!            +---------+--------+-----------+--> Errored -> Loading (next strategy)
//! ```
//!
//! At most one session is attached at a time. Attaching always releases the
//! previous session first (pause, unregister, clear source, destroy engine),
//! and every attach bumps the generation so late signals from the released
//! session are dropped.

use jellystream_common::{
    Error, ItemId, PlaySessionId, PlaybackState, StreamingStrategy,
};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

use crate::attempts::AttemptTracker;
use crate::config::PlaybackConfig;
use crate::cycler::StrategyCycler;
use crate::events::PlayerEvent;
use crate::media::{
    MediaElement, MediaErrorKind, MediaSignal, PlayRejection, SegmentEngine,
    SegmentEngineFactory, SignalEnvelope, SignalSink,
};
use crate::session::{self, PlaybackSession, SessionIds};
use crate::stream_url::StreamTarget;

const EVENT_CAPACITY: usize = 64;

/// What the UI renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSnapshot {
    pub state: PlaybackState,
    pub item_id: Option<ItemId>,
    pub strategy: StreamingStrategy,
    pub strategy_label: &'static str,
    pub play_session_id: Option<PlaySessionId>,
    pub is_muted: bool,
    pub last_error: Option<String>,
    pub retry_count: u32,
    /// Automatic retries are exhausted; only a manual retry continues.
    pub terminal: bool,
}

/// A deadline that only applies to the session it was armed for.
#[derive(Debug, Clone, Copy)]
struct Timer {
    generation: u64,
    deadline: Instant,
}

impl Timer {
    fn after(generation: u64, delay: std::time::Duration) -> Self {
        Self {
            generation,
            deadline: Instant::now() + delay,
        }
    }
}

/// Owns the media element and drives the playback state machine.
pub struct PlaybackController {
    config: PlaybackConfig,
    target: StreamTarget,
    media: Box<dyn MediaElement>,
    engines: Box<dyn SegmentEngineFactory>,
    engine: Option<Box<dyn SegmentEngine>>,
    signals: mpsc::UnboundedSender<SignalEnvelope>,
    events: broadcast::Sender<PlayerEvent>,
    cycler: StrategyCycler,
    attempts: AttemptTracker,
    state: PlaybackState,
    item_id: Option<ItemId>,
    session: Option<PlaybackSession>,
    session_ids: SessionIds,
    generation: u64,
    watchdog: Option<Timer>,
    fullscreen_timer: Option<Timer>,
    fullscreen_armed: bool,
    manifest_parsed: bool,
    muted: bool,
    last_error: Option<String>,
    advisory_shown: bool,
    terminal: bool,
    active: bool,
}

impl PlaybackController {
    /// Create a controller. Media signals are delivered on `signals`.
    pub fn new(
        config: PlaybackConfig,
        target: StreamTarget,
        media: Box<dyn MediaElement>,
        engines: Box<dyn SegmentEngineFactory>,
        signals: mpsc::UnboundedSender<SignalEnvelope>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let muted = config.autoplay_muted;
        Self {
            config,
            target,
            media,
            engines,
            engine: None,
            signals,
            events,
            cycler: StrategyCycler::new(),
            attempts: AttemptTracker::new(),
            state: PlaybackState::Idle,
            item_id: None,
            session: None,
            session_ids: session::fresh_ids,
            generation: 0,
            watchdog: None,
            fullscreen_timer: None,
            fullscreen_armed: false,
            manifest_parsed: false,
            muted,
            last_error: None,
            advisory_shown: false,
            terminal: false,
            active: true,
        }
    }

    /// Replace how play session and device identifiers are generated.
    pub fn with_session_ids(mut self, ids: SessionIds) -> Self {
        self.session_ids = ids;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<PlayerEvent> {
        self.events.clone()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Generation of the live session; signals stamped otherwise are ignored.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn attempts(&self) -> &AttemptTracker {
        &self.attempts
    }

    pub fn cycler(&self) -> &StrategyCycler {
        &self.cycler
    }

    /// Deadline of the pending load watchdog, with the generation it guards.
    pub fn watchdog_deadline(&self) -> Option<(u64, Instant)> {
        self.watchdog.map(|w| (w.generation, w.deadline))
    }

    /// Deadline of the pending automatic fullscreen request, if one is armed.
    pub fn fullscreen_deadline(&self) -> Option<(u64, Instant)> {
        self.fullscreen_timer.map(|t| (t.generation, t.deadline))
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let strategy = self.cycler.current();
        PlayerSnapshot {
            state: self.state,
            item_id: self.item_id.clone(),
            strategy,
            strategy_label: strategy.label(),
            play_session_id: self.session.as_ref().map(|s| s.play_session_id().clone()),
            is_muted: self.muted,
            last_error: self.last_error.clone(),
            retry_count: self.cycler.retry_count(),
            terminal: self.terminal,
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Navigate to `item_id`: forget previous attempts and start from `Adaptive`.
    pub fn open(&mut self, item_id: ItemId) {
        if !self.active {
            tracing::warn!(item_id = %item_id, "Ignoring open on a torn-down player");
            return;
        }
        tracing::info!(item_id = %item_id, "Opening item for playback");

        self.release_session();
        self.transition(PlaybackState::Idle);
        self.cycler.reset();
        self.attempts.clear();
        self.item_id = Some(item_id);
        self.last_error = None;
        self.advisory_shown = false;
        self.terminal = false;

        self.run_attempts();
    }

    /// Play when ready or paused, pause when playing.
    pub fn toggle_play(&mut self) {
        if !self.active || self.session.is_none() {
            return;
        }
        match self.state {
            PlaybackState::Playing => {
                self.media.pause();
                self.transition(PlaybackState::Paused);
            }
            PlaybackState::Ready | PlaybackState::Paused => self.media.play(),
            other => tracing::debug!(state = %other, "Play toggle ignored"),
        }
    }

    /// Flip the mute flag. Returns the new value.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        if self.active {
            self.media.set_muted(self.muted);
        }
        self.muted
    }

    pub fn request_fullscreen(&mut self) {
        if !self.active || self.session.is_none() {
            return;
        }
        if let Err(e) = self.media.request_fullscreen() {
            tracing::warn!("Fullscreen request failed: {}", e);
        }
    }

    /// User-initiated retry: forget tried URLs, zero the counter and move to
    /// the next strategy. Also the way out of a terminal failure.
    pub fn manual_retry(&mut self) {
        if !self.active || self.item_id.is_none() {
            return;
        }
        self.release_session();
        self.transition(PlaybackState::Idle);
        self.attempts.clear();
        let from = self.cycler.current();
        let to = self.cycler.advance();
        self.cycler.clear_retries();
        tracing::info!(from = %from, to = %to, "Manual retry");
        self.emit(PlayerEvent::StrategyAdvanced {
            from,
            to,
            retry_count: 0,
        });
        self.terminal = false;
        self.last_error = None;

        self.run_attempts();
    }

    /// Release everything. Idempotent; nothing mutates state afterwards.
    pub fn teardown(&mut self) {
        if !self.active {
            return;
        }
        tracing::debug!(item_id = ?self.item_id, "Tearing down player");
        self.release_session();
        self.transition(PlaybackState::Idle);
        self.active = false;
        self.item_id = None;
    }

    // -----------------------------------------------------------------------
    // Signals
    // -----------------------------------------------------------------------

    /// Apply a signal emitted for session `generation`.
    pub fn handle_signal(&mut self, generation: u64, signal: MediaSignal) {
        if !self.active {
            tracing::debug!(?signal, "Dropping signal after teardown");
            return;
        }
        if generation != self.generation || self.session.is_none() {
            tracing::debug!(
                generation,
                live = self.generation,
                ?signal,
                "Dropping signal from released session"
            );
            return;
        }

        match signal {
            MediaSignal::CanPlay => self.on_ready(),
            MediaSignal::ManifestParsed { variants } => {
                tracing::debug!(variants, "Manifest parsed");
                self.manifest_parsed = true;
            }
            MediaSignal::FirstSegmentReady => {
                if self.manifest_parsed {
                    self.on_ready();
                }
            }
            MediaSignal::Playing => {
                if matches!(self.state, PlaybackState::Ready | PlaybackState::Paused) {
                    self.transition(PlaybackState::Playing);
                    self.cycler.clear_retries();
                    self.last_error = None;
                    self.arm_fullscreen();
                }
            }
            MediaSignal::Paused => {
                if self.state == PlaybackState::Playing {
                    self.transition(PlaybackState::Paused);
                }
            }
            MediaSignal::Ended => {
                if self.state == PlaybackState::Playing {
                    self.transition(PlaybackState::Ended);
                }
            }
            MediaSignal::PlayRejected(PlayRejection::NotAllowed) => self.on_autoplay_blocked(),
            MediaSignal::PlayRejected(PlayRejection::Aborted) => {
                tracing::debug!("Play request aborted");
            }
            MediaSignal::Error { kind, message } => {
                if self.state.is_active() {
                    self.fail(kind.into_error(message));
                }
            }
            MediaSignal::EngineError {
                kind,
                fatal,
                message,
            } => {
                if !fatal {
                    tracing::debug!(?kind, "Segment engine recovered: {}", message);
                } else if self.state.is_active() {
                    self.fail(kind.into_error(message));
                }
            }
        }
    }

    /// The load watchdog armed for `generation` expired.
    pub fn handle_watchdog(&mut self, generation: u64) {
        if !self.active {
            return;
        }
        match self.watchdog {
            Some(w) if w.generation == generation && self.state == PlaybackState::Loading => {
                self.watchdog = None;
                self.fail(Error::LoadTimeout {
                    timeout_ms: self.config.load_timeout_ms,
                });
            }
            _ => tracing::debug!(generation, "Ignoring stale load watchdog"),
        }
    }

    /// The automatic fullscreen timer armed for `generation` expired.
    pub fn handle_fullscreen_timer(&mut self, generation: u64) {
        match self.fullscreen_timer {
            Some(t) if self.active && t.generation == generation => {
                self.fullscreen_timer = None;
                tracing::debug!(generation, "Requesting fullscreen after playback start");
                self.request_fullscreen();
            }
            _ => tracing::debug!(generation, "Ignoring stale fullscreen timer"),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Once per session, on its first `Playing`.
    fn arm_fullscreen(&mut self) {
        let Some(delay_ms) = self.config.auto_fullscreen_after_ms else {
            return;
        };
        if self.fullscreen_armed {
            return;
        }
        self.fullscreen_armed = true;
        self.fullscreen_timer = Some(Timer::after(
            self.generation,
            std::time::Duration::from_millis(delay_ms),
        ));
    }

    fn on_ready(&mut self) {
        if self.state != PlaybackState::Loading {
            return;
        }
        self.watchdog = None;
        self.last_error = None;
        self.transition(PlaybackState::Ready);
        if let Some(session) = &self.session {
            tracing::info!(
                strategy = %session.strategy(),
                play_session_id = %session.play_session_id(),
                "Stream ready"
            );
        }

        // Muted autoplay; the result comes back as Playing or PlayRejected.
        self.media.set_muted(self.muted);
        self.media.play();
    }

    fn on_autoplay_blocked(&mut self) {
        if !matches!(self.state, PlaybackState::Ready | PlaybackState::Paused) {
            return;
        }
        tracing::info!("Autoplay blocked; waiting for user");
        self.transition(PlaybackState::Paused);
        if !self.advisory_shown {
            self.advisory_shown = true;
            let message = Error::AutoplayBlocked("play() not allowed".into()).user_message();
            self.last_error = Some(message.clone());
            self.emit(PlayerEvent::Advisory { message });
        }
    }

    /// Build and attach sessions until one is in flight or the ceiling is hit.
    fn run_attempts(&mut self) {
        let Some(item_id) = self.item_id.clone() else {
            return;
        };

        loop {
            self.transition(PlaybackState::Loading);
            let strategy = self.cycler.current();
            let (play_session_id, device_id) = (self.session_ids)();
            let session = match PlaybackSession::with_ids(
                &self.target,
                &item_id,
                strategy,
                &self.config.transcode,
                play_session_id,
                device_id,
            ) {
                Ok(session) => session,
                Err(e) => {
                    self.surface_fatal(e);
                    return;
                }
            };

            if self.attempts.has_tried(session.url().as_str()) {
                tracing::debug!(strategy = %strategy, "Stream URL already tried, skipping");
                if !self.advance_or_exhaust() {
                    return;
                }
                continue;
            }
            self.attempts.mark_tried(session.url().as_str());

            match self.attach(session) {
                Ok(()) => return,
                Err(e) => {
                    if !self.record_failure(e) {
                        return;
                    }
                }
            }
        }
    }

    fn attach(&mut self, session: PlaybackSession) -> Result<(), Error> {
        self.release_session();

        self.generation += 1;
        let sink = SignalSink::new(self.generation, self.signals.clone());
        self.manifest_parsed = false;
        self.fullscreen_armed = false;
        self.watchdog = Some(Timer::after(self.generation, self.config.load_timeout()));

        tracing::info!(
            item_id = %session.item_id(),
            strategy = %session.strategy(),
            play_session_id = %session.play_session_id(),
            generation = self.generation,
            "Attaching stream"
        );
        self.emit(PlayerEvent::SessionStarted {
            item_id: session.item_id().clone(),
            strategy: session.strategy(),
            play_session_id: session.play_session_id().clone(),
        });

        self.media.register(sink.clone());
        self.media.set_muted(self.muted);

        let url = session.url().clone();
        let strategy = session.strategy();
        self.session = Some(session);

        match strategy {
            StreamingStrategy::Adaptive if self.engines.is_supported() => {
                let mut engine = self.engines.create(sink);
                engine.attach_media(self.media.as_mut());
                engine.load_source(&url);
                self.engine = Some(engine);
            }
            StreamingStrategy::Adaptive if self.media.supports_native_hls() => {
                self.media.set_source(&url);
            }
            StreamingStrategy::Adaptive => {
                return Err(MediaErrorKind::FormatUnsupported
                    .into_error("segmented streaming is not supported on this platform"));
            }
            StreamingStrategy::Progressive | StreamingStrategy::PassThrough => {
                self.media.set_source(&url);
            }
        }
        Ok(())
    }

    /// Detach the live session, if any. Engine first, then the element.
    fn release_session(&mut self) {
        self.watchdog = None;
        self.fullscreen_timer = None;
        if let Some(engine) = self.engine.take() {
            engine.destroy();
        }
        if let Some(session) = self.session.take() {
            tracing::debug!(
                play_session_id = %session.play_session_id(),
                "Releasing stream"
            );
            self.media.pause();
            self.media.unregister();
            self.media.clear_source();
        }
    }

    fn fail(&mut self, error: Error) {
        if self.record_failure(error) {
            self.run_attempts();
        }
    }

    /// Move to `Errored` and decide whether another attempt follows.
    fn record_failure(&mut self, error: Error) -> bool {
        let strategy = self.cycler.current();
        tracing::warn!(strategy = %strategy, "Playback attempt failed: {}", error);

        self.release_session();
        let message = error.user_message();
        self.last_error = Some(message.clone());
        self.transition(PlaybackState::Errored);
        self.emit(PlayerEvent::Failed {
            message,
            recoverable: error.is_recoverable(),
        });

        self.advance_or_exhaust()
    }

    /// Advance the strategy, or report the terminal failure and return `false`.
    fn advance_or_exhaust(&mut self) -> bool {
        let ceiling = self.config.retry_ceiling();
        if self.cycler.ceiling_reached(ceiling) {
            self.exhaust(ceiling);
            return false;
        }
        let from = self.cycler.current();
        let to = self.cycler.advance();
        tracing::info!(
            from = %from,
            to = %to,
            retry_count = self.cycler.retry_count(),
            "Switching streaming strategy"
        );
        self.emit(PlayerEvent::StrategyAdvanced {
            from,
            to,
            retry_count: self.cycler.retry_count(),
        });
        true
    }

    fn exhaust(&mut self, ceiling: u32) {
        self.release_session();
        self.transition(PlaybackState::Errored);
        self.terminal = true;

        let error = Error::RetryCeilingExceeded { attempts: ceiling };
        tracing::error!(item_id = ?self.item_id, "{}", error);
        let message = error.user_message();
        self.last_error = Some(message.clone());
        self.emit(PlayerEvent::RetryCeilingExceeded {
            message,
            retry_count: self.cycler.retry_count(),
        });
    }

    /// Errors that retrying cannot fix (bad stream request).
    fn surface_fatal(&mut self, error: Error) {
        tracing::error!("Cannot start playback: {}", error);
        self.release_session();
        let message = error.user_message();
        self.last_error = Some(message.clone());
        self.transition(PlaybackState::Errored);
        self.terminal = true;
        self.emit(PlayerEvent::Failed {
            message,
            recoverable: false,
        });
    }

    fn transition(&mut self, next: PlaybackState) -> bool {
        let from = self.state;
        if from == next {
            return true;
        }
        if !from.can_transition_to(next) {
            tracing::warn!(from = %from, to = %next, "Rejected playback transition");
            return false;
        }
        tracing::debug!(from = %from, to = %next, "Playback state changed");
        self.state = next;
        self.emit(PlayerEvent::StateChanged { from, to: next });
        true
    }

    fn emit(&self, event: PlayerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.teardown();
    }
}
