//! Recognition engine
//!
//! Owns the capture thread, the streaming decoder, and the session
//! lifecycle. The engine is commanded from the caller's thread
//! (start/stop/cleanup); a dedicated capture thread polls the audio source
//! and feeds the decoder; an optional watchdog thread enforces the auto-stop
//! timeout.
//!
//! Stop ownership: exactly one party performs the Listening -> Stopping
//! transition, by compare-and-swap under the state lock. `stop_listening`
//! claims it for caller-initiated stops; the capture thread claims it when
//! its loop exits on its own (watchdog fire or fatal read/decode error).
//! Whoever wins finishes the stop: flush the decoder, return to Ready, emit
//! `listening_stopped` exactly once. The watchdog itself only sets the
//! cancel token and never touches state.

pub mod decoder;
pub mod vosk;

use crate::audio::{self, AudioSource};
use crate::config::EngineConfig;
use crate::dispatch::{EventKind, RecognitionEvent};
use crate::error::{AudioError, EngineError};
use crate::state::EngineState;
use decoder::{Decoded, SpeechDecoder};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

/// How often the capture loop polls an empty source
const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long `stop_listening` waits for the capture thread
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);
/// How long `cleanup` waits for the capture thread
const CLEANUP_JOIN_TIMEOUT: Duration = Duration::from_secs(3);
/// Watchdog wake interval; bounds how stale a disarm can be
const WATCHDOG_STEP: Duration = Duration::from_millis(25);

/// Status notifications surfaced to the embedding application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    ListeningStarted,
    ListeningStopped,
    CleanedUp,
}

impl EngineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineStatus::ListeningStarted => "listening_started",
            EngineStatus::ListeningStopped => "listening_stopped",
            EngineStatus::CleanedUp => "cleaned_up",
        }
    }
}

/// Callbacks out of the engine. Implementations must tolerate being called
/// from the capture thread.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &RecognitionEvent);
    fn on_status(&self, status: EngineStatus);
    fn on_error(&self, message: &str);
}

/// Cooperative cancellation flag shared with the capture thread
#[derive(Clone, Default)]
struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
    fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// State shared between the engine, the capture thread, and the watchdog.
/// Lock order: `state` before `decoder` before `source`.
struct EngineShared {
    state: Mutex<EngineState>,
    cancel: CancelToken,
    source: Mutex<Box<dyn AudioSource>>,
    decoder: Mutex<Box<dyn SpeechDecoder>>,
    handler: Arc<dyn EventHandler>,
    chunk_size: usize,
    /// Bumped on every start so a stale watchdog cannot cancel a later session
    session: AtomicU64,
}

impl EngineShared {
    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_source(&self) -> MutexGuard<'_, Box<dyn AudioSource>> {
        self.source.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_decoder(&self) -> MutexGuard<'_, Box<dyn SpeechDecoder>> {
        self.decoder.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Claim the stop transition. Only the winner runs `finish_stop`.
    fn try_begin_stop(&self) -> bool {
        let mut state = self.lock_state();
        if *state == EngineState::Listening {
            *state = EngineState::Stopping;
            true
        } else {
            false
        }
    }

    /// Second half of a stop: flush the decoder, go back to Ready, notify.
    /// Caller must have won `try_begin_stop`.
    fn finish_stop(&self) {
        match self.lock_decoder().finalize() {
            Ok(Some(text)) => {
                self.handler
                    .on_event(&RecognitionEvent::new(EventKind::Complete, &text));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Decoder flush failed: {}", e),
        }

        {
            let mut state = self.lock_state();
            // cleanup may have raced in; Closed is terminal
            if *state == EngineState::Stopping {
                *state = EngineState::Ready;
            }
        }

        self.handler.on_status(EngineStatus::ListeningStopped);
        tracing::info!("Listening stopped");
    }
}

/// Auto-stop timer for one session
struct Watchdog {
    disarm: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Watchdog {
    fn arm(shared: Arc<EngineShared>, session: u64, timeout: Duration) -> Self {
        let disarm = Arc::new(AtomicBool::new(false));
        let flag = disarm.clone();
        let spawned = thread::Builder::new()
            .name("watchdog".to_string())
            .spawn(move || {
                let deadline = Instant::now() + timeout;
                while Instant::now() < deadline {
                    if flag.load(Ordering::SeqCst) {
                        return;
                    }
                    thread::sleep(WATCHDOG_STEP);
                }
                if flag.load(Ordering::SeqCst) {
                    return;
                }
                if shared.session.load(Ordering::SeqCst) != session {
                    return;
                }
                tracing::info!("Auto-stop timeout reached after {:?}", timeout);
                // signal only; the capture loop owns the stop transition
                shared.cancel.set();
            });
        let handle = match spawned {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::warn!(
                    "Watchdog thread failed to start, auto-stop disabled for this session: {}",
                    e
                );
                None
            }
        };
        Self { disarm, handle }
    }

    fn disarm(&mut self) {
        self.disarm.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Voice recognition engine with explicit session lifecycle
pub struct RecognitionEngine {
    shared: Arc<EngineShared>,
    capture_thread: Option<thread::JoinHandle<()>>,
    done_rx: Option<Receiver<()>>,
    watchdog: Option<Watchdog>,
    auto_stop: Option<Duration>,
}

impl RecognitionEngine {
    /// Load the model and open the audio device. Either failure aborts
    /// construction; on success the engine is Ready with the stream parked.
    pub fn new(config: &EngineConfig, handler: Arc<dyn EventHandler>) -> Result<Self, EngineError> {
        let decoder =
            decoder::create_decoder(config).map_err(|e| EngineError::Init(e.to_string()))?;
        let source =
            audio::create_source(config).map_err(|e| EngineError::Init(e.to_string()))?;

        tracing::info!("Recognition engine initialized");

        Ok(Self::assemble(
            source,
            decoder,
            handler,
            config.chunk_size,
            config.auto_stop().map(Duration::from_secs),
        ))
    }

    #[cfg(test)]
    pub(crate) fn with_parts(
        source: Box<dyn AudioSource>,
        decoder: Box<dyn SpeechDecoder>,
        handler: Arc<dyn EventHandler>,
        chunk_size: usize,
        auto_stop: Option<Duration>,
    ) -> Self {
        Self::assemble(source, decoder, handler, chunk_size, auto_stop)
    }

    fn assemble(
        source: Box<dyn AudioSource>,
        decoder: Box<dyn SpeechDecoder>,
        handler: Arc<dyn EventHandler>,
        chunk_size: usize,
        auto_stop: Option<Duration>,
    ) -> Self {
        Self {
            shared: Arc::new(EngineShared {
                state: Mutex::new(EngineState::Ready),
                cancel: CancelToken::default(),
                source: Mutex::new(source),
                decoder: Mutex::new(decoder),
                handler,
                chunk_size,
                session: AtomicU64::new(0),
            }),
            capture_thread: None,
            done_rx: None,
            watchdog: None,
            auto_stop,
        }
    }

    pub fn state(&self) -> EngineState {
        *self.shared.lock_state()
    }

    pub fn is_listening(&self) -> bool {
        self.state().is_listening()
    }

    /// Begin a listening session. No-op while already listening; an error
    /// while a stop is in flight or after cleanup.
    pub fn start_listening(&mut self) -> Result<(), EngineError> {
        {
            let mut state = self.shared.lock_state();
            match *state {
                EngineState::Closed => return Err(EngineError::Closed),
                EngineState::Listening => {
                    tracing::debug!("Already listening, ignoring start");
                    return Ok(());
                }
                EngineState::Stopping => {
                    return Err(EngineError::Busy("a stop is still in progress".to_string()))
                }
                EngineState::Uninitialized => {
                    return Err(EngineError::Busy("engine is not initialized".to_string()))
                }
                EngineState::Ready => {}
            }

            if let Err(e) = self.shared.lock_decoder().reset() {
                tracing::warn!("Decoder reset failed, continuing with stale state: {}", e);
            }

            self.shared.session.fetch_add(1, Ordering::SeqCst);
            self.shared.cancel.clear();
            self.shared.lock_source().resume()?;
            *state = EngineState::Listening;
        }

        // previous session's threads are finished or already timed out
        self.capture_thread = None;
        if let Some(mut old) = self.watchdog.take() {
            old.disarm();
        }

        let (done_tx, done_rx) = mpsc::channel();
        let shared = self.shared.clone();
        let handle = thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || run_capture(shared, done_tx))
            .map_err(|e| EngineError::Init(e.to_string()))?;

        self.capture_thread = Some(handle);
        self.done_rx = Some(done_rx);

        if let Some(timeout) = self.auto_stop {
            let session = self.shared.session.load(Ordering::SeqCst);
            self.watchdog = Some(Watchdog::arm(self.shared.clone(), session, timeout));
        }

        self.shared.handler.on_status(EngineStatus::ListeningStarted);
        tracing::info!("Listening started");
        Ok(())
    }

    /// End the current session. Idempotent; a stop with no session running
    /// is a no-op.
    pub fn stop_listening(&mut self) -> Result<(), EngineError> {
        if self.state() == EngineState::Closed {
            return Err(EngineError::Closed);
        }

        if let Some(mut watchdog) = self.watchdog.take() {
            watchdog.disarm();
        }

        if !self.shared.try_begin_stop() {
            // never started, already stopped, or the capture thread owns it
            return Ok(());
        }

        self.shared.cancel.set();

        // Pause here as well as on the capture loop's exit path: if the
        // capture thread overruns the join timeout below, the stream must
        // not keep filling the buffer until cleanup.
        if let Err(e) = self.shared.lock_source().pause() {
            tracing::warn!("Pause on stop failed: {}", e);
        }

        if let Some(done_rx) = self.done_rx.take() {
            if done_rx.recv_timeout(STOP_JOIN_TIMEOUT).is_err() {
                tracing::warn!(
                    "Capture thread did not stop within {:?}, detaching",
                    STOP_JOIN_TIMEOUT
                );
                self.capture_thread = None;
            }
        }
        if let Some(handle) = self.capture_thread.take() {
            let _ = handle.join();
        }

        self.shared.finish_stop();
        Ok(())
    }

    /// Release everything. Idempotent and terminal: the engine cannot be
    /// restarted afterwards.
    pub fn cleanup(&mut self) {
        let was_active = {
            let mut state = self.shared.lock_state();
            if state.is_closed() {
                return;
            }
            let active = matches!(*state, EngineState::Listening | EngineState::Stopping);
            *state = EngineState::Closed;
            active
        };

        self.shared.cancel.set();
        if let Some(mut watchdog) = self.watchdog.take() {
            watchdog.disarm();
        }

        if was_active {
            if let Some(done_rx) = self.done_rx.take() {
                if done_rx.recv_timeout(CLEANUP_JOIN_TIMEOUT).is_err() {
                    tracing::warn!(
                        "Capture thread did not stop within {:?} during cleanup",
                        CLEANUP_JOIN_TIMEOUT
                    );
                    self.capture_thread = None;
                }
            }
        }
        if let Some(handle) = self.capture_thread.take() {
            let _ = handle.join();
        }

        // closed regardless of whether the thread came down cleanly
        self.shared.lock_source().close();

        self.shared.handler.on_status(EngineStatus::CleanedUp);
        tracing::info!("Engine cleaned up");
    }
}

impl Drop for RecognitionEngine {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Capture loop body. Polls the source, feeds the decoder, emits events.
/// On exit it pauses the source and, if the exit was self-initiated, claims
/// and finishes the stop so the state never stays Listening without a
/// running thread.
fn run_capture(shared: Arc<EngineShared>, done_tx: Sender<()>) {
    tracing::debug!("Capture thread started");

    loop {
        if shared.cancel.is_set() {
            break;
        }

        let chunk = shared.lock_source().read_available(shared.chunk_size);

        match chunk {
            Ok(samples) if samples.is_empty() => {
                thread::sleep(POLL_INTERVAL);
            }
            Ok(samples) => {
                let decoded = shared.lock_decoder().accept(&samples);
                match decoded {
                    Ok(Decoded::Final(text)) => {
                        shared
                            .handler
                            .on_event(&RecognitionEvent::new(EventKind::Final, &text));
                    }
                    Ok(Decoded::Partial(text)) => {
                        shared
                            .handler
                            .on_event(&RecognitionEvent::new(EventKind::Partial, &text));
                    }
                    Ok(Decoded::Silence) => {}
                    Err(e) => {
                        shared.handler.on_error(&format!("decode failed: {}", e));
                        break;
                    }
                }
            }
            Err(AudioError::SourceClosed) => break,
            Err(e) if e.is_transient() => {
                tracing::warn!("Transient audio error, continuing: {}", e);
            }
            Err(e) => {
                shared.handler.on_error(&format!("audio read failed: {}", e));
                break;
            }
        }
    }

    if let Err(e) = shared.lock_source().pause() {
        tracing::debug!("Pause on capture exit failed: {}", e);
    }

    // self-initiated exit (watchdog or error): this thread owns the stop
    let own_stop = shared.try_begin_stop();
    let _ = done_tx.send(());
    if own_stop {
        shared.finish_stop();
    }

    tracing::debug!("Capture thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct MockSource {
        samples: Arc<Mutex<VecDeque<i16>>>,
        pauses: Arc<AtomicU64>,
        closed: bool,
    }

    impl MockSource {
        fn new() -> (Box<dyn AudioSource>, Arc<Mutex<VecDeque<i16>>>) {
            let (source, samples, _) = Self::counted();
            (source, samples)
        }

        fn counted() -> (
            Box<dyn AudioSource>,
            Arc<Mutex<VecDeque<i16>>>,
            Arc<AtomicU64>,
        ) {
            let samples = Arc::new(Mutex::new(VecDeque::new()));
            let pauses = Arc::new(AtomicU64::new(0));
            (
                Box::new(Self {
                    samples: samples.clone(),
                    pauses: pauses.clone(),
                    closed: false,
                }),
                samples,
                pauses,
            )
        }
    }

    impl AudioSource for MockSource {
        fn resume(&mut self) -> Result<(), AudioError> {
            if self.closed {
                return Err(AudioError::SourceClosed);
            }
            Ok(())
        }
        fn pause(&mut self) -> Result<(), AudioError> {
            self.pauses.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn read_available(&mut self, max: usize) -> Result<Vec<i16>, AudioError> {
            if self.closed {
                return Err(AudioError::SourceClosed);
            }
            let mut guard = self.samples.lock().unwrap();
            let take = guard.len().min(max);
            Ok(guard.drain(..take).collect())
        }
        fn close(&mut self) {
            self.closed = true;
        }
    }

    /// Decoder that replays a script of outcomes, then reports silence
    struct MockDecoder {
        script: Arc<Mutex<VecDeque<Decoded>>>,
        flush: Option<String>,
    }

    impl MockDecoder {
        fn silent() -> Box<dyn SpeechDecoder> {
            Box::new(Self {
                script: Arc::new(Mutex::new(VecDeque::new())),
                flush: None,
            })
        }

        fn scripted(outcomes: Vec<Decoded>) -> Box<dyn SpeechDecoder> {
            Box::new(Self {
                script: Arc::new(Mutex::new(outcomes.into())),
                flush: None,
            })
        }
    }

    impl SpeechDecoder for MockDecoder {
        fn accept(&mut self, _samples: &[i16]) -> Result<Decoded, crate::error::DecodeError> {
            Ok(self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Decoded::Silence))
        }
        fn finalize(&mut self) -> Result<Option<String>, crate::error::DecodeError> {
            Ok(self.flush.take())
        }
        fn reset(&mut self) -> Result<(), crate::error::DecodeError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingHandler {
        statuses: Mutex<Vec<EngineStatus>>,
        events: Mutex<Vec<(EventKind, String)>>,
        errors: Mutex<Vec<String>>,
    }

    impl EventHandler for RecordingHandler {
        fn on_event(&self, event: &RecognitionEvent) {
            self.events
                .lock()
                .unwrap()
                .push((event.kind, event.text.clone()));
        }
        fn on_status(&self, status: EngineStatus) {
            self.statuses.lock().unwrap().push(status);
        }
        fn on_error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }
    }

    fn engine_with(
        decoder: Box<dyn SpeechDecoder>,
        auto_stop: Option<Duration>,
    ) -> (
        RecognitionEngine,
        Arc<RecordingHandler>,
        Arc<Mutex<VecDeque<i16>>>,
    ) {
        let (source, samples) = MockSource::new();
        let handler = Arc::new(RecordingHandler::default());
        let engine = RecognitionEngine::with_parts(source, decoder, handler.clone(), 400, auto_stop);
        (engine, handler, samples)
    }

    #[test]
    fn start_then_stop_returns_to_ready() {
        let (mut engine, handler, _) = engine_with(MockDecoder::silent(), None);

        engine.start_listening().unwrap();
        assert_eq!(engine.state(), EngineState::Listening);

        engine.stop_listening().unwrap();
        assert_eq!(engine.state(), EngineState::Ready);
        assert_eq!(
            *handler.statuses.lock().unwrap(),
            vec![EngineStatus::ListeningStarted, EngineStatus::ListeningStopped]
        );
    }

    #[test]
    fn stop_pauses_the_stream_from_the_control_thread() {
        // The capture loop pauses once on its own exit; the count reaching
        // two proves stop_listening also paused, so the stream stops filling
        // the buffer even when the capture thread overruns the join timeout.
        let (source, _, pauses) = MockSource::counted();
        let handler = Arc::new(RecordingHandler::default());
        let mut engine = RecognitionEngine::with_parts(
            source,
            MockDecoder::silent(),
            handler,
            400,
            None,
        );

        engine.start_listening().unwrap();
        engine.stop_listening().unwrap();

        assert!(pauses.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut engine, handler, _) = engine_with(MockDecoder::silent(), None);

        engine.start_listening().unwrap();
        engine.stop_listening().unwrap();
        engine.stop_listening().unwrap();
        engine.stop_listening().unwrap();

        let stops = handler
            .statuses
            .lock()
            .unwrap()
            .iter()
            .filter(|s| **s == EngineStatus::ListeningStopped)
            .count();
        assert_eq!(stops, 1);
    }

    #[test]
    fn stop_without_start_is_a_noop() {
        let (mut engine, handler, _) = engine_with(MockDecoder::silent(), None);
        engine.stop_listening().unwrap();
        assert_eq!(engine.state(), EngineState::Ready);
        assert!(handler.statuses.lock().unwrap().is_empty());
    }

    #[test]
    fn start_while_listening_is_a_noop() {
        let (mut engine, handler, _) = engine_with(MockDecoder::silent(), None);

        engine.start_listening().unwrap();
        engine.start_listening().unwrap();

        let starts = handler
            .statuses
            .lock()
            .unwrap()
            .iter()
            .filter(|s| **s == EngineStatus::ListeningStarted)
            .count();
        assert_eq!(starts, 1);
        engine.stop_listening().unwrap();
    }

    #[test]
    fn decoded_text_reaches_handler() {
        let decoder = MockDecoder::scripted(vec![
            Decoded::Partial("open the".to_string()),
            Decoded::Final("open the window".to_string()),
        ]);
        let (mut engine, handler, samples) = engine_with(decoder, None);

        engine.start_listening().unwrap();
        samples.lock().unwrap().extend(std::iter::repeat(100).take(800));

        // give the capture loop a few poll intervals to drain
        thread::sleep(Duration::from_millis(150));
        engine.stop_listening().unwrap();

        let events = handler.events.lock().unwrap();
        assert!(events.contains(&(EventKind::Partial, "open the".to_string())));
        assert!(events.contains(&(EventKind::Final, "open the window".to_string())));
    }

    #[test]
    fn watchdog_auto_stops_back_to_ready() {
        let (mut engine, handler, _) =
            engine_with(MockDecoder::silent(), Some(Duration::from_millis(80)));

        engine.start_listening().unwrap();
        assert_eq!(engine.state(), EngineState::Listening);

        thread::sleep(Duration::from_millis(400));
        assert_eq!(engine.state(), EngineState::Ready);
        assert!(handler
            .statuses
            .lock()
            .unwrap()
            .contains(&EngineStatus::ListeningStopped));

        // a later explicit stop adds nothing
        engine.stop_listening().unwrap();
        let stops = handler
            .statuses
            .lock()
            .unwrap()
            .iter()
            .filter(|s| **s == EngineStatus::ListeningStopped)
            .count();
        assert_eq!(stops, 1);
    }

    #[test]
    fn restart_after_auto_stop_works() {
        let (mut engine, handler, _) =
            engine_with(MockDecoder::silent(), Some(Duration::from_millis(80)));

        engine.start_listening().unwrap();
        thread::sleep(Duration::from_millis(400));
        assert_eq!(engine.state(), EngineState::Ready);

        engine.start_listening().unwrap();
        assert_eq!(engine.state(), EngineState::Listening);
        engine.stop_listening().unwrap();

        let starts = handler
            .statuses
            .lock()
            .unwrap()
            .iter()
            .filter(|s| **s == EngineStatus::ListeningStarted)
            .count();
        assert_eq!(starts, 2);
    }

    #[test]
    fn fatal_audio_error_stops_the_session() {
        struct BrokenSource;
        impl AudioSource for BrokenSource {
            fn resume(&mut self) -> Result<(), AudioError> {
                Ok(())
            }
            fn pause(&mut self) -> Result<(), AudioError> {
                Ok(())
            }
            fn read_available(&mut self, _max: usize) -> Result<Vec<i16>, AudioError> {
                Err(AudioError::Stream("device unplugged".to_string()))
            }
            fn close(&mut self) {}
        }

        let handler = Arc::new(RecordingHandler::default());
        let mut engine = RecognitionEngine::with_parts(
            Box::new(BrokenSource),
            MockDecoder::silent(),
            handler.clone(),
            400,
            None,
        );

        engine.start_listening().unwrap();
        thread::sleep(Duration::from_millis(150));

        assert_eq!(engine.state(), EngineState::Ready);
        assert!(!handler.errors.lock().unwrap().is_empty());
        assert!(handler
            .statuses
            .lock()
            .unwrap()
            .contains(&EngineStatus::ListeningStopped));
    }

    #[test]
    fn cleanup_is_terminal_and_idempotent() {
        let (mut engine, handler, _) = engine_with(MockDecoder::silent(), None);

        engine.start_listening().unwrap();
        engine.cleanup();
        engine.cleanup();

        assert_eq!(engine.state(), EngineState::Closed);
        let cleanups = handler
            .statuses
            .lock()
            .unwrap()
            .iter()
            .filter(|s| **s == EngineStatus::CleanedUp)
            .count();
        assert_eq!(cleanups, 1);

        assert!(matches!(
            engine.start_listening(),
            Err(EngineError::Closed)
        ));
        assert!(matches!(engine.stop_listening(), Err(EngineError::Closed)));
    }

    #[test]
    fn cleanup_without_session_still_closes() {
        let (mut engine, handler, _) = engine_with(MockDecoder::silent(), None);
        engine.cleanup();
        assert_eq!(engine.state(), EngineState::Closed);
        assert_eq!(
            *handler.statuses.lock().unwrap(),
            vec![EngineStatus::CleanedUp]
        );
    }
}
