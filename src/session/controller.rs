//! The capture session controller.
//!
//! Single owner of the session state. Four independent threads call in —
//! the UI button handler, the GPIO edge callback, the endpoint timer, and
//! the backend's completion delivery — and every mutation funnels through
//! one mutex. Directive re-activation parks on the paired condvar instead
//! of free-running polling so teardown can cancel it.

use crate::backend::{CaptureRequest, VoiceBackend};
use crate::capture::{AudioCapture, CaptureHandle, LevelMeter, LEVEL_IDLE};
use crate::events::{EventSink, SessionEvent};
use crate::log_debug;
use crate::session::silence::{EndpointConfig, SilenceDetector, SilenceEdge};
use crate::session::state::{on_trigger, PendingRequest, Phase, Transition, TriggerSource};
use crate::session::timer::EndpointTimer;
use crossbeam_channel::Sender;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::thread;
use std::time::{Duration, Instant};

/// Runtime settings for one controller instance.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub endpoint: EndpointConfig,
    /// How often a queued expect-speech directive re-checks for idle.
    pub directive_retry: Duration,
}

impl SessionConfig {
    pub fn new(endpoint: EndpointConfig, directive_retry: Duration) -> Self {
        Self {
            endpoint,
            directive_retry,
        }
    }
}

/// Mutable session state; guarded by `SessionCore::inner`.
struct SessionInner {
    phase: Phase,
    detector: SilenceDetector,
    timer: EndpointTimer,
    /// Bumped on every arm; a stale expiry fails the comparison.
    arm_generation: u64,
    capture_handle: Option<CaptureHandle>,
    pending: Option<PendingRequest>,
    request_seq: u64,
    last_error: Option<String>,
}

struct SessionCore {
    inner: Mutex<SessionInner>,
    /// Signalled whenever the phase returns to Idle, and on shutdown.
    idle_signal: Condvar,
    /// Handed to taps, completions, and timer callbacks so collaborator
    /// threads never keep a torn-down controller alive.
    self_weak: Weak<SessionCore>,
    meter: LevelMeter,
    phase_bits: AtomicU8,
    shutting_down: AtomicBool,
    capture: Arc<dyn AudioCapture>,
    backend: Arc<dyn VoiceBackend>,
    events: EventSink,
    config: SessionConfig,
    waiters: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl SessionCore {
    fn lock_inner(&self) -> MutexGuard<'_, SessionInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn trigger(&self, source: TriggerSource) {
        if self.shutting_down.load(Ordering::SeqCst) {
            return;
        }
        // Any interaction resets the backend's idle tracking, even when
        // the trigger itself ends up dropped.
        self.backend.note_user_activity();
        let mut inner = self.lock_inner();
        self.advance(&mut inner, source);
    }

    /// The one trigger path. Manual presses, GPIO edges, endpoint expiry
    /// and directives all land here; `source` is metadata only.
    fn advance(&self, inner: &mut SessionInner, source: TriggerSource) {
        // Re-checked under the lock: shutdown sets the flag before taking
        // it, so a transition that starts after this point is cleaned up
        // by shutdown's own pass.
        if self.shutting_down.load(Ordering::SeqCst) {
            return;
        }
        match on_trigger(inner.phase) {
            Transition::StartListening => self.begin_listening(inner, source),
            Transition::StopAndSubmit => self.begin_processing(inner, source),
            Transition::Ignored => {
                log_debug(&format!(
                    "session|trigger_ignored|source={}|phase={}",
                    source.label(),
                    inner.phase.label()
                ));
            }
        }
    }

    fn begin_listening(&self, inner: &mut SessionInner, source: TriggerSource) {
        inner.timer.cancel();
        inner.detector.reset();
        let tap = LevelTap {
            core: self.self_weak.clone(),
        };
        match self.capture.start_recording(tap) {
            Ok(handle) => {
                inner.capture_handle = Some(handle);
                self.set_phase(inner, Phase::Listening, source);
            }
            Err(err) => {
                let message = format!("failed to start recording: {err:#}");
                log_debug(&format!("session|capture_error|{message}"));
                inner.last_error = Some(message.clone());
                self.events.emit(SessionEvent::CaptureError { message });
            }
        }
    }

    fn begin_processing(&self, inner: &mut SessionInner, source: TriggerSource) {
        inner.timer.cancel();
        inner.detector.reset();
        self.meter.set(LEVEL_IDLE);
        if let Some(handle) = inner.capture_handle.take() {
            if let Err(err) = self.capture.stop_recording(handle) {
                // The request still goes out; the recorder cleans up on
                // its own once the stream drains.
                log_debug(&format!("session|stop_recording_failed|{err:#}"));
            }
        }
        inner.request_seq += 1;
        let id = inner.request_seq;
        inner.pending = Some(PendingRequest {
            id,
            trigger: source,
            started_at: Instant::now(),
        });
        self.set_phase(inner, Phase::Processing, source);

        let done = RequestCompletion {
            core: self.self_weak.clone(),
            request_id: id,
        };
        let request = CaptureRequest {
            id,
            trigger: source,
        };
        if let Err(err) = self.backend.submit(request, done) {
            let message = format!("speech request submit failed: {err:#}");
            log_debug(&format!("session|submit_failed|request={id}|{message}"));
            inner.pending = None;
            inner.last_error = Some(message.clone());
            self.events.emit(SessionEvent::RequestFailed {
                request_id: id,
                message,
            });
            self.set_phase(inner, Phase::Idle, source);
        }
    }

    /// High-frequency path: meter update plus timer arm/cancel, nothing
    /// that can block on I/O.
    fn on_audio_level(&self, level: u32) {
        if self.shutting_down.load(Ordering::SeqCst) {
            return;
        }
        let mut inner = self.lock_inner();
        if inner.phase != Phase::Listening {
            // Stale sample from a recorder that is winding down.
            return;
        }
        self.meter.set(level);
        match inner.detector.observe(level) {
            Some(SilenceEdge::Started) => {
                inner.arm_generation += 1;
                let generation = inner.arm_generation;
                let core = self.self_weak.clone();
                inner
                    .timer
                    .arm(self.config.endpoint.silence_duration, move || {
                        if let Some(core) = core.upgrade() {
                            core.auto_endpoint_fired(generation);
                        }
                    });
                log_debug(&format!("session|silence_started|generation={generation}"));
            }
            Some(SilenceEdge::Ended) => {
                inner.timer.cancel();
            }
            None => {}
        }
    }

    /// Endpoint expiry re-enters the same trigger path a button press
    /// uses, once the generation check proves it is not a stale fire that
    /// lost a race against cancel or re-arm.
    fn auto_endpoint_fired(&self, generation: u64) {
        if self.shutting_down.load(Ordering::SeqCst) {
            return;
        }
        let mut inner = self.lock_inner();
        if inner.phase != Phase::Listening
            || !inner.detector.is_armed()
            || inner.arm_generation != generation
        {
            log_debug(&format!("session|stale_endpoint|generation={generation}"));
            return;
        }
        self.backend.note_user_activity();
        self.advance(&mut inner, TriggerSource::AutoEndpoint);
    }

    fn resolve_request(&self, expected_id: Option<u64>, outcome: Result<(), String>) {
        let mut inner = self.lock_inner();
        if inner.phase != Phase::Processing {
            log_debug(&format!(
                "session|completion_out_of_phase|phase={}",
                inner.phase.label()
            ));
            return;
        }
        let pending = match inner.pending.take() {
            Some(pending) => pending,
            None => {
                log_debug("session|completion_without_request");
                return;
            }
        };
        if let Some(id) = expected_id {
            if id != pending.id {
                log_debug(&format!(
                    "session|stale_completion|got={id}|current={}",
                    pending.id
                ));
                inner.pending = Some(pending);
                return;
            }
        }
        let elapsed_ms = pending.started_at.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => {
                log_debug(&format!(
                    "session|request_ok|request={}|elapsed_ms={elapsed_ms}",
                    pending.id
                ));
                self.events.emit(SessionEvent::RequestCompleted {
                    request_id: pending.id,
                    elapsed_ms,
                });
            }
            Err(message) => {
                log_debug(&format!(
                    "session|request_failed|request={}|{message}",
                    pending.id
                ));
                inner.last_error = Some(message.clone());
                self.events.emit(SessionEvent::RequestFailed {
                    request_id: pending.id,
                    message,
                });
            }
        }
        self.set_phase(&mut inner, Phase::Idle, pending.trigger);
    }

    fn expect_speech(&self) {
        if self.shutting_down.load(Ordering::SeqCst) {
            return;
        }
        let Some(core) = self.self_weak.upgrade() else {
            return;
        };
        log_debug("session|directive_queued");
        let handle = thread::spawn(move || core.run_directive_waiter());
        self.waiters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(handle);
    }

    fn run_directive_waiter(&self) {
        let mut inner = self.lock_inner();
        loop {
            if self.shutting_down.load(Ordering::SeqCst) {
                log_debug("session|directive_cancelled");
                return;
            }
            if inner.phase == Phase::Idle && !self.backend.is_speaking() {
                self.backend.note_user_activity();
                self.advance(&mut inner, TriggerSource::Directive);
                return;
            }
            // Playback can end without a phase change, so wake on a
            // bounded interval even when nobody signals.
            let (guard, _) = self
                .idle_signal
                .wait_timeout(inner, self.config.directive_retry)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            inner = guard;
        }
    }

    fn set_phase(&self, inner: &mut SessionInner, phase: Phase, trigger: TriggerSource) {
        inner.phase = phase;
        self.phase_bits.store(phase as u8, Ordering::SeqCst);
        tracing::debug!(
            phase = phase.label(),
            trigger = trigger.label(),
            "session phase change"
        );
        self.events.emit(SessionEvent::PhaseChanged { phase, trigger });
        if phase == Phase::Idle {
            self.idle_signal.notify_all();
        }
    }

    fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        {
            let mut inner = self.lock_inner();
            inner.timer.cancel();
            inner.detector.reset();
            if let Some(handle) = inner.capture_handle.take() {
                if let Err(err) = self.capture.stop_recording(handle) {
                    log_debug(&format!("session|shutdown_stop_failed|{err:#}"));
                }
            }
            self.meter.set(LEVEL_IDLE);
        }
        self.idle_signal.notify_all();
        let handles: Vec<_> = {
            let mut waiters = self
                .waiters
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            waiters.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.join();
        }
        log_debug("session|shutdown");
    }
}

/// Feeds live RMS levels from the capture thread into the session.
#[derive(Clone)]
pub struct LevelTap {
    core: Weak<SessionCore>,
}

impl LevelTap {
    /// Deliver one RMS sample. Ignored once the controller is gone or
    /// the session has left Listening.
    pub fn push(&self, level: u32) {
        if let Some(core) = self.core.upgrade() {
            core.on_audio_level(level);
        }
    }
}

impl fmt::Debug for LevelTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelTap").finish_non_exhaustive()
    }
}

/// Resolves one submitted request. The session honors the first
/// resolution and discards the rest, so the handle may be cloned across
/// callback threads freely.
#[derive(Clone)]
pub struct RequestCompletion {
    core: Weak<SessionCore>,
    request_id: u64,
}

impl RequestCompletion {
    pub fn succeed(&self) {
        if let Some(core) = self.core.upgrade() {
            core.resolve_request(Some(self.request_id), Ok(()));
        }
    }

    pub fn fail(&self, message: impl Into<String>) {
        if let Some(core) = self.core.upgrade() {
            core.resolve_request(Some(self.request_id), Err(message.into()));
        }
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }
}

impl fmt::Debug for RequestCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCompletion")
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

/// Push-to-talk session controller.
///
/// Starts in Idle. All entry points are safe to call from any thread;
/// shutdown also runs on drop.
pub struct PttController {
    core: Arc<SessionCore>,
}

impl PttController {
    /// Build a controller with no event consumer.
    pub fn new(
        config: SessionConfig,
        capture: Arc<dyn AudioCapture>,
        backend: Arc<dyn VoiceBackend>,
    ) -> Self {
        Self::with_events(config, capture, backend, None)
    }

    /// Build a controller that fans events out over a bounded channel.
    pub fn with_events(
        config: SessionConfig,
        capture: Arc<dyn AudioCapture>,
        backend: Arc<dyn VoiceBackend>,
        events: Option<Sender<SessionEvent>>,
    ) -> Self {
        let detector = SilenceDetector::new(&config.endpoint);
        let core = Arc::new_cyclic(|self_weak| SessionCore {
            inner: Mutex::new(SessionInner {
                phase: Phase::Idle,
                detector,
                timer: EndpointTimer::new(),
                arm_generation: 0,
                capture_handle: None,
                pending: None,
                request_seq: 0,
                last_error: None,
            }),
            idle_signal: Condvar::new(),
            self_weak: self_weak.clone(),
            meter: LevelMeter::new(),
            phase_bits: AtomicU8::new(Phase::Idle as u8),
            shutting_down: AtomicBool::new(false),
            capture,
            backend,
            events: EventSink::new(events),
            config,
            waiters: Mutex::new(Vec::new()),
        });
        Self { core }
    }

    /// Advance the session: Idle starts listening, Listening stops and
    /// submits, Processing ignores the press.
    pub fn trigger_pressed(&self, source: TriggerSource) {
        self.core.trigger(source);
    }

    /// Feed one RMS sample; discarded outside Listening.
    pub fn on_audio_level(&self, level: u32) {
        self.core.on_audio_level(level);
    }

    /// Backend reported success for the in-flight request.
    pub fn on_request_success(&self) {
        self.core.resolve_request(None, Ok(()));
    }

    /// Backend reported failure; the message reaches the UI verbatim.
    pub fn on_request_error(&self, message: impl Into<String>) {
        self.core.resolve_request(None, Err(message.into()));
    }

    /// Queue a server expect-speech directive: re-enter Listening once
    /// the session is Idle and the backend has stopped speaking.
    pub fn on_expect_speech_directive(&self) {
        self.core.expect_speech();
    }

    /// Current phase, readable without taking the session lock.
    pub fn phase(&self) -> Phase {
        Phase::from_bits(self.core.phase_bits.load(Ordering::SeqCst))
    }

    /// Last observed RMS level (0 while not recording).
    pub fn level(&self) -> u32 {
        self.core.meter.level()
    }

    /// Shared meter handle for the UI's visual level display.
    pub fn meter(&self) -> LevelMeter {
        self.core.meter.clone()
    }

    /// Most recent surfaced error, if any.
    pub fn last_error(&self) -> Option<String> {
        self.core.lock_inner().last_error.clone()
    }

    /// Events lost to a slow consumer since construction.
    pub fn dropped_events(&self) -> usize {
        self.core.events.dropped()
    }

    /// Idempotent teardown: cancels the endpoint timer, stops any live
    /// capture, and wakes and joins queued directive waiters.
    pub fn shutdown(&self) {
        self.core.shutdown();
    }
}

impl Drop for PttController {
    fn drop(&mut self) {
        self.core.shutdown();
    }
}
