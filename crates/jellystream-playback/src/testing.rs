//! Recording test doubles for the media element and segment engine.
//!
//! Every call the controller makes is appended to a shared [`OpLog`], so tests
//! can assert on ordering (engine destroyed before the next one is created,
//! listeners unregistered before the source is cleared). The paired remotes
//! let a test play the platform's part by emitting signals.

use std::sync::Arc;

use parking_lot::Mutex;
use url::Url;

use crate::media::{
    MediaElement, MediaSignal, PlayRejection, SegmentEngine, SegmentEngineFactory, SignalSink,
};

/// One call into a test double.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaOp {
    /// Listener registered for the given generation.
    Register(u64),
    Unregister,
    SetSource(String),
    ClearSource,
    Play,
    Pause,
    SetMuted(bool),
    Fullscreen,
    EngineCreated(usize),
    EngineAttachMedia(usize),
    EngineLoad(usize, String),
    EngineDestroyed(usize),
}

/// Shared, ordered record of calls.
#[derive(Debug, Clone, Default)]
pub struct OpLog(Arc<Mutex<Vec<MediaOp>>>);

impl OpLog {
    pub fn push(&self, op: MediaOp) {
        self.0.lock().push(op);
    }

    pub fn ops(&self) -> Vec<MediaOp> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// How a [`RecordingElement`] answers `play()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoplayPolicy {
    /// Every play request succeeds immediately.
    Allow,
    /// The first play request is refused; later ones succeed.
    BlockFirst,
    /// Nothing is emitted; the test decides.
    Manual,
}

#[derive(Debug)]
struct ElementState {
    sink: Option<SignalSink>,
    autoplay: AutoplayPolicy,
    plays: u32,
    native_hls: bool,
    fullscreen_error: Option<String>,
}

/// A [`MediaElement`] that records calls and answers play/pause itself.
#[derive(Debug)]
pub struct RecordingElement {
    log: OpLog,
    state: Arc<Mutex<ElementState>>,
}

/// Test-side handle onto a [`RecordingElement`].
#[derive(Debug, Clone)]
pub struct ElementRemote {
    log: OpLog,
    state: Arc<Mutex<ElementState>>,
}

impl RecordingElement {
    pub fn new(autoplay: AutoplayPolicy) -> (Self, ElementRemote) {
        let log = OpLog::default();
        let state = Arc::new(Mutex::new(ElementState {
            sink: None,
            autoplay,
            plays: 0,
            native_hls: false,
            fullscreen_error: None,
        }));
        let remote = ElementRemote {
            log: log.clone(),
            state: state.clone(),
        };
        (Self { log, state }, remote)
    }

    fn emit(&self, signal: MediaSignal) {
        if let Some(sink) = &self.state.lock().sink {
            sink.emit(signal);
        }
    }
}

impl MediaElement for RecordingElement {
    fn register(&mut self, sink: SignalSink) {
        self.log.push(MediaOp::Register(sink.generation()));
        self.state.lock().sink = Some(sink);
    }

    fn unregister(&mut self) {
        self.log.push(MediaOp::Unregister);
        self.state.lock().sink = None;
    }

    fn set_source(&mut self, url: &Url) {
        self.log.push(MediaOp::SetSource(url.to_string()));
    }

    fn clear_source(&mut self) {
        self.log.push(MediaOp::ClearSource);
    }

    fn play(&mut self) {
        self.log.push(MediaOp::Play);
        let answer = {
            let mut state = self.state.lock();
            state.plays += 1;
            match state.autoplay {
                AutoplayPolicy::Allow => Some(MediaSignal::Playing),
                AutoplayPolicy::BlockFirst if state.plays == 1 => {
                    Some(MediaSignal::PlayRejected(PlayRejection::NotAllowed))
                }
                AutoplayPolicy::BlockFirst => Some(MediaSignal::Playing),
                AutoplayPolicy::Manual => None,
            }
        };
        if let Some(signal) = answer {
            self.emit(signal);
        }
    }

    fn pause(&mut self) {
        self.log.push(MediaOp::Pause);
        self.emit(MediaSignal::Paused);
    }

    fn set_muted(&mut self, muted: bool) {
        self.log.push(MediaOp::SetMuted(muted));
    }

    fn request_fullscreen(&mut self) -> Result<(), String> {
        self.log.push(MediaOp::Fullscreen);
        match &self.state.lock().fullscreen_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn supports_native_hls(&self) -> bool {
        self.state.lock().native_hls
    }
}

impl ElementRemote {
    pub fn log(&self) -> OpLog {
        self.log.clone()
    }

    /// Emit on the currently registered listener. `false` if none is registered.
    pub fn emit(&self, signal: MediaSignal) -> bool {
        match &self.state.lock().sink {
            Some(sink) => sink.emit(signal),
            None => false,
        }
    }

    /// The listener registered right now, kept to emit stale signals later.
    pub fn current_sink(&self) -> Option<SignalSink> {
        self.state.lock().sink.clone()
    }

    pub fn set_native_hls(&self, supported: bool) {
        self.state.lock().native_hls = supported;
    }

    pub fn set_fullscreen_error(&self, error: Option<String>) {
        self.state.lock().fullscreen_error = error;
    }
}

#[derive(Debug, Default)]
struct EngineState {
    created: usize,
    live: usize,
    latest: Option<(usize, SignalSink)>,
}

/// A [`SegmentEngineFactory`] whose engines only record calls.
#[derive(Debug)]
pub struct RecordingEngineFactory {
    log: OpLog,
    supported: bool,
    state: Arc<Mutex<EngineState>>,
}

/// Test-side handle onto the engines a [`RecordingEngineFactory`] created.
#[derive(Debug, Clone)]
pub struct EngineRemote {
    state: Arc<Mutex<EngineState>>,
}

impl RecordingEngineFactory {
    pub fn new(log: OpLog, supported: bool) -> (Self, EngineRemote) {
        let state = Arc::new(Mutex::new(EngineState::default()));
        let remote = EngineRemote {
            state: state.clone(),
        };
        (
            Self {
                log,
                supported,
                state,
            },
            remote,
        )
    }
}

impl SegmentEngineFactory for RecordingEngineFactory {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&mut self, sink: SignalSink) -> Box<dyn SegmentEngine> {
        let index = {
            let mut state = self.state.lock();
            state.created += 1;
            state.live += 1;
            state.latest = Some((state.created, sink));
            state.created
        };
        self.log.push(MediaOp::EngineCreated(index));
        Box::new(RecordingEngine {
            index,
            log: self.log.clone(),
            state: self.state.clone(),
        })
    }
}

struct RecordingEngine {
    index: usize,
    log: OpLog,
    state: Arc<Mutex<EngineState>>,
}

impl SegmentEngine for RecordingEngine {
    fn attach_media(&mut self, _media: &mut dyn MediaElement) {
        self.log.push(MediaOp::EngineAttachMedia(self.index));
    }

    fn load_source(&mut self, url: &Url) {
        self.log.push(MediaOp::EngineLoad(self.index, url.to_string()));
    }

    fn destroy(self: Box<Self>) {
        self.log.push(MediaOp::EngineDestroyed(self.index));
        let mut state = self.state.lock();
        state.live = state.live.saturating_sub(1);
        if matches!(state.latest, Some((index, _)) if index == self.index) {
            state.latest = None;
        }
    }
}

impl EngineRemote {
    pub fn created(&self) -> usize {
        self.state.lock().created
    }

    /// Engines created and not yet destroyed.
    pub fn live(&self) -> usize {
        self.state.lock().live
    }

    /// Emit from the most recent engine. `false` once it was destroyed.
    pub fn emit(&self, signal: MediaSignal) -> bool {
        match &self.state.lock().latest {
            Some((_, sink)) => sink.emit(signal),
            None => false,
        }
    }
}
