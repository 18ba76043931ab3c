//! Single-shot speech capture lifecycle.
//!
//! # Invariants
//! - At most one session is listening; extra start calls are dropped.
//! - Callbacks run on the thread that drains events, never inside the
//!   engine.
//! - An `aborted` error ends the session without any callback.
//! - Stopping discards the session, so its late events are never delivered.
//! - `start_listening` never blocks; a busy retry runs from the event drain.

use super::engine::{
    EngineStartError, RecognitionErrorCode, RecognitionEvent, RecognitionEventSink,
    RecognitionResult, RecognitionSettings, SpeechEngine,
};
use super::{SpeechError, SpeechSettings};
use log::{debug, error, info, warn};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

type ResultCallback = Box<dyn FnOnce(String)>;
type ErrorCallback = Box<dyn FnOnce(SpeechError)>;

/// Observable capture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Listening,
}

/// What `start_listening` did with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenStart {
    Started,
    /// A session is already running; the request was ignored.
    AlreadyListening,
    /// Error callback already received `SpeechError::Unsupported`.
    Unsupported,
    /// Error callback already received `SpeechError::StartFailed`.
    Failed,
}

/// Terminal outcome of one listening session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Transcript(String),
    Failed(SpeechError),
    /// Session ended by cancellation or without a result. No callback ran.
    Cancelled,
}

struct ListeningSession {
    events: Receiver<RecognitionEvent>,
    on_result: ResultCallback,
    on_error: ErrorCallback,
    started_at: Instant,
    retry: Option<PendingRetry>,
}

// Second engine start scheduled after a busy rejection. Holding `sink` keeps
// the channel open until the retry runs.
struct PendingRetry {
    recognition: RecognitionSettings,
    sink: RecognitionEventSink,
    due_at: Instant,
}

/// Capture adapter owning one speech engine.
pub struct SpeechCapture<E: SpeechEngine> {
    engine: E,
    supported: bool,
    settings: SpeechSettings,
    session: Option<ListeningSession>,
}

impl<E: SpeechEngine> SpeechCapture<E> {
    /// Wraps `engine`, probing its availability once.
    pub fn new(engine: E, settings: SpeechSettings) -> Self {
        let supported = engine.is_available();
        info!(
            "event=speech_init module=speech status=ok supported={supported} locale={}",
            settings.locale
        );
        Self {
            engine,
            supported,
            settings,
            session: None,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn state(&self) -> CaptureState {
        if self.session.is_some() {
            CaptureState::Listening
        } else {
            CaptureState::Idle
        }
    }

    pub fn is_listening(&self) -> bool {
        self.session.is_some()
    }

    /// Whether a busy engine start is waiting for its retry.
    pub fn is_retry_pending(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.retry.is_some())
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Starts one recognition session without blocking.
    ///
    /// Exactly one of the callbacks runs later, from `process_events` or
    /// `wait_for_outcome`, unless the session is cancelled. Unsupported and
    /// non-busy start failures invoke `on_error` before returning. A busy
    /// engine is retried once, `retry_delay_ms` later, from the event drain.
    pub fn start_listening<F, G>(&mut self, on_result: F, on_error: G) -> ListenStart
    where
        F: FnOnce(String) + 'static,
        G: FnOnce(SpeechError) + 'static,
    {
        if !self.supported {
            warn!("event=speech_start module=speech status=error error_code=unsupported");
            on_error(SpeechError::Unsupported);
            return ListenStart::Unsupported;
        }
        if self.session.is_some() {
            debug!("event=speech_start module=speech status=ignored reason=already_listening");
            return ListenStart::AlreadyListening;
        }

        let recognition = RecognitionSettings::single_utterance(self.settings.locale.as_str());
        let (sender, events) = mpsc::channel();
        let sink = RecognitionEventSink::new(sender);

        let retry = match self.engine.start(&recognition, sink.clone()) {
            Ok(()) => {
                info!("event=speech_start module=speech status=ok attempts=1");
                None
            }
            Err(EngineStartError::Busy) => {
                warn!(
                    "event=speech_start module=speech status=retry_scheduled reason=busy delay_ms={}",
                    self.settings.retry_delay_ms
                );
                Some(PendingRetry {
                    recognition,
                    sink,
                    due_at: Instant::now() + self.settings.retry_delay(),
                })
            }
            Err(err) => {
                error!("event=speech_start module=speech status=error error={err}");
                on_error(SpeechError::StartFailed(err.to_string()));
                return ListenStart::Failed;
            }
        };

        self.session = Some(ListeningSession {
            events,
            on_result: Box::new(on_result),
            on_error: Box::new(on_error),
            started_at: Instant::now(),
            retry,
        });
        ListenStart::Started
    }

    /// Stops the running session, if any. Its callbacks never run.
    pub fn stop_listening(&mut self) {
        if let Some(session) = self.session.take() {
            if session.retry.is_none() {
                self.engine.stop();
            }
            info!(
                "event=speech_stop module=speech status=ok duration_ms={}",
                session.started_at.elapsed().as_millis()
            );
        }
    }

    /// Runs a due start retry and delivers an already-emitted engine event
    /// without blocking.
    ///
    /// Returns the session outcome once it resolves.
    pub fn process_events(&mut self) -> Option<CaptureOutcome> {
        if let Some(outcome) = self.run_due_retry() {
            return Some(outcome);
        }
        if self.is_retry_pending() {
            return None;
        }
        let received = self.session.as_ref()?.events.try_recv();
        match received {
            Ok(event) => Some(self.complete(event)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.complete(RecognitionEvent::End)),
        }
    }

    /// Like `process_events`, but waits up to `timeout` for a pending retry
    /// and then for the engine.
    pub fn wait_for_outcome(&mut self, timeout: Duration) -> Option<CaptureOutcome> {
        let deadline = Instant::now() + timeout;
        if let Some(due_at) = self.retry_due_at() {
            if due_at > deadline {
                std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
                return None;
            }
            std::thread::sleep(due_at.saturating_duration_since(Instant::now()));
            if let Some(outcome) = self.run_due_retry() {
                return Some(outcome);
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let received = self.session.as_ref()?.events.recv_timeout(remaining);
        match received {
            Ok(event) => Some(self.complete(event)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.complete(RecognitionEvent::End)),
        }
    }

    fn retry_due_at(&self) -> Option<Instant> {
        self.session.as_ref()?.retry.as_ref().map(|retry| retry.due_at)
    }

    // Second and last engine start. A failure ends the session through
    // `on_error`.
    fn run_due_retry(&mut self) -> Option<CaptureOutcome> {
        let session = self.session.as_mut()?;
        if session.retry.as_ref()?.due_at > Instant::now() {
            return None;
        }
        let retry = session.retry.take()?;

        match self.engine.start(&retry.recognition, retry.sink) {
            Ok(()) => {
                info!("event=speech_start module=speech status=ok attempts=2");
                None
            }
            Err(err) => {
                error!("event=speech_start module=speech status=error attempts=2 error={err}");
                let session = self.session.take()?;
                let failure = SpeechError::StartFailed(err.to_string());
                (session.on_error)(failure.clone());
                Some(CaptureOutcome::Failed(failure))
            }
        }
    }

    fn complete(&mut self, event: RecognitionEvent) -> CaptureOutcome {
        let Some(session) = self.session.take() else {
            return CaptureOutcome::Cancelled;
        };
        let duration_ms = session.started_at.elapsed().as_millis();

        let outcome = match event {
            RecognitionEvent::Result(results) => match best_transcript(results) {
                Some(text) => CaptureOutcome::Transcript(text),
                None => CaptureOutcome::Failed(SpeechError::Recognition(
                    RecognitionErrorCode::NoSpeech,
                )),
            },
            RecognitionEvent::Error(RecognitionErrorCode::Aborted) | RecognitionEvent::End => {
                CaptureOutcome::Cancelled
            }
            RecognitionEvent::Error(code) => {
                CaptureOutcome::Failed(SpeechError::Recognition(code))
            }
        };

        match &outcome {
            CaptureOutcome::Transcript(text) => {
                info!(
                    "event=speech_result module=speech status=ok duration_ms={duration_ms} chars={}",
                    text.chars().count()
                );
                (session.on_result)(text.clone());
            }
            CaptureOutcome::Failed(err) => {
                warn!(
                    "event=speech_result module=speech status=error duration_ms={duration_ms} error={err}"
                );
                (session.on_error)(err.clone());
            }
            CaptureOutcome::Cancelled => {
                info!(
                    "event=speech_result module=speech status=cancelled duration_ms={duration_ms}"
                );
            }
        }
        outcome
    }
}

impl<E: SpeechEngine> Drop for SpeechCapture<E> {
    fn drop(&mut self) {
        self.stop_listening();
    }
}

fn best_transcript(results: Vec<RecognitionResult>) -> Option<String> {
    results
        .into_iter()
        .next()
        .and_then(|result| result.alternatives.into_iter().next())
        .map(|alternative| alternative.transcript)
}
