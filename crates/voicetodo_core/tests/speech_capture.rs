use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};
use voicetodo_core::speech::{
    EngineStartError, RecognitionErrorCode, RecognitionEvent, RecognitionEventSink,
    RecognitionResult, RecognitionSettings,
};
use voicetodo_core::{
    CaptureOutcome, CaptureState, ListenStart, SpeechCapture, SpeechEngine, SpeechError,
    SpeechSettings, UnavailableEngine,
};

#[test]
fn unsupported_engine_reports_error_immediately() {
    let mut capture = SpeechCapture::new(UnavailableEngine, SpeechSettings::default());
    let calls = Calls::default();

    assert!(!capture.is_supported());
    let started = capture.start_listening(calls.on_result(), calls.on_error());

    assert_eq!(started, ListenStart::Unsupported);
    assert_eq!(calls.errors(), vec![SpeechError::Unsupported]);
    assert_eq!(
        calls.errors()[0].to_string(),
        "Speech recognition not supported"
    );
    assert_eq!(capture.state(), CaptureState::Idle);
}

#[test]
fn start_requests_single_utterance_with_configured_locale() {
    let (mut capture, log) = scripted_capture(Vec::new());
    let calls = Calls::default();

    let settings = SpeechSettings {
        locale: "de-DE".to_string(),
        retry_delay_ms: 0,
    };
    let mut capture_de = SpeechCapture::new(ScriptedEngine::new(log.clone(), Vec::new()), settings);
    capture_de.start_listening(calls.on_result(), calls.on_error());
    capture.start_listening(calls.on_result(), calls.on_error());

    let seen = log.borrow().settings.clone();
    assert_eq!(seen[0], RecognitionSettings::single_utterance("de-DE"));
    assert!(!seen[0].continuous);
    assert!(!seen[0].interim_results);
    assert_eq!(seen[0].max_alternatives, 1);
    assert_eq!(seen[1].locale, "en-US");
}

#[test]
fn result_event_delivers_first_transcript_and_returns_to_idle() {
    let (mut capture, log) = scripted_capture(Vec::new());
    let calls = Calls::default();

    assert_eq!(
        capture.start_listening(calls.on_result(), calls.on_error()),
        ListenStart::Started
    );
    assert_eq!(capture.state(), CaptureState::Listening);
    assert_eq!(capture.process_events(), None);

    emit(
        &log,
        RecognitionEvent::Result(vec![RecognitionResult::single("pick up eggs", 0.92)]),
    );
    let outcome = capture.process_events();

    assert_eq!(
        outcome,
        Some(CaptureOutcome::Transcript("pick up eggs".to_string()))
    );
    assert_eq!(calls.results(), vec!["pick up eggs".to_string()]);
    assert!(calls.errors().is_empty());
    assert_eq!(capture.state(), CaptureState::Idle);
}

#[test]
fn second_start_while_listening_is_ignored() {
    let (mut capture, log) = scripted_capture(Vec::new());
    let first = Calls::default();
    let second = Calls::default();

    capture.start_listening(first.on_result(), first.on_error());
    let again = capture.start_listening(second.on_result(), second.on_error());

    assert_eq!(again, ListenStart::AlreadyListening);
    assert_eq!(log.borrow().starts, 1);

    emit(
        &log,
        RecognitionEvent::Result(vec![RecognitionResult::single("only once", 0.8)]),
    );
    capture.process_events();

    assert_eq!(first.results(), vec!["only once".to_string()]);
    assert!(second.results().is_empty());
    assert!(second.errors().is_empty());
}

#[test]
fn error_event_maps_code_to_message() {
    let (mut capture, log) = scripted_capture(Vec::new());
    let calls = Calls::default();

    capture.start_listening(calls.on_result(), calls.on_error());
    emit(
        &log,
        RecognitionEvent::Error(RecognitionErrorCode::parse("not-allowed")),
    );
    let outcome = capture.process_events().unwrap();

    let expected = SpeechError::Recognition(RecognitionErrorCode::NotAllowed);
    assert_eq!(outcome, CaptureOutcome::Failed(expected.clone()));
    assert_eq!(calls.errors(), vec![expected]);
    assert_eq!(calls.errors()[0].to_string(), "Microphone permission denied.");
    assert!(calls.results().is_empty());
    assert!(!capture.is_listening());
}

#[test]
fn unknown_error_code_keeps_raw_code_in_message() {
    let (mut capture, log) = scripted_capture(Vec::new());
    let calls = Calls::default();

    capture.start_listening(calls.on_result(), calls.on_error());
    emit(
        &log,
        RecognitionEvent::Error(RecognitionErrorCode::parse("language-not-supported")),
    );
    capture.process_events();

    assert_eq!(calls.errors()[0].to_string(), "Error: language-not-supported");
}

#[test]
fn aborted_error_is_swallowed() {
    let (mut capture, log) = scripted_capture(Vec::new());
    let calls = Calls::default();

    capture.start_listening(calls.on_result(), calls.on_error());
    emit(&log, RecognitionEvent::Error(RecognitionErrorCode::Aborted));

    assert_eq!(capture.process_events(), Some(CaptureOutcome::Cancelled));
    assert!(calls.results().is_empty());
    assert!(calls.errors().is_empty());
    assert_eq!(capture.state(), CaptureState::Idle);
}

#[test]
fn end_without_result_finishes_silently() {
    let (mut capture, log) = scripted_capture(Vec::new());
    let calls = Calls::default();

    capture.start_listening(calls.on_result(), calls.on_error());
    emit(&log, RecognitionEvent::End);

    assert_eq!(capture.process_events(), Some(CaptureOutcome::Cancelled));
    assert!(calls.results().is_empty());
    assert!(calls.errors().is_empty());
}

#[test]
fn engine_dropping_its_sink_ends_session() {
    let (mut capture, log) = scripted_capture(Vec::new());
    let calls = Calls::default();

    capture.start_listening(calls.on_result(), calls.on_error());
    log.borrow_mut().sinks.clear();

    assert_eq!(capture.process_events(), Some(CaptureOutcome::Cancelled));
    assert!(!capture.is_listening());
}

#[test]
fn empty_result_is_reported_as_no_speech() {
    let (mut capture, log) = scripted_capture(Vec::new());
    let calls = Calls::default();

    capture.start_listening(calls.on_result(), calls.on_error());
    emit(&log, RecognitionEvent::Result(Vec::new()));
    capture.process_events();

    assert_eq!(
        calls.errors()[0].to_string(),
        "No speech detected. Please try again."
    );
}

#[test]
fn only_first_terminal_event_is_delivered() {
    let (mut capture, log) = scripted_capture(Vec::new());
    let calls = Calls::default();

    capture.start_listening(calls.on_result(), calls.on_error());
    emit(
        &log,
        RecognitionEvent::Result(vec![RecognitionResult::single("first", 0.9)]),
    );
    emit(&log, RecognitionEvent::Error(RecognitionErrorCode::Network));
    emit(&log, RecognitionEvent::End);

    capture.process_events();
    assert_eq!(capture.process_events(), None);
    assert_eq!(calls.results(), vec!["first".to_string()]);
    assert!(calls.errors().is_empty());
}

#[test]
fn busy_engine_is_retried_once_from_event_drain() {
    let (mut capture, log) = scripted_capture(vec![EngineStartError::Busy]);
    let calls = Calls::default();

    let started = capture.start_listening(calls.on_result(), calls.on_error());

    assert_eq!(started, ListenStart::Started);
    assert_eq!(log.borrow().starts, 1);
    assert!(capture.is_retry_pending());
    assert!(capture.is_listening());

    assert_eq!(capture.process_events(), None);
    assert_eq!(log.borrow().starts, 2);
    assert!(!capture.is_retry_pending());
    assert!(calls.errors().is_empty());

    assert!(emit(
        &log,
        RecognitionEvent::Result(vec![RecognitionResult::single("retried", 0.7)])
    ));
    assert_eq!(
        capture.process_events(),
        Some(CaptureOutcome::Transcript("retried".to_string()))
    );
    assert_eq!(calls.results(), vec!["retried".to_string()]);
}

#[test]
fn busy_retry_waits_for_delay_without_blocking_start() {
    let log = Rc::new(RefCell::new(EngineLog::default()));
    let settings = SpeechSettings {
        retry_delay_ms: 5_000,
        ..SpeechSettings::default()
    };
    let mut capture = SpeechCapture::new(
        ScriptedEngine::new(Rc::clone(&log), vec![EngineStartError::Busy]),
        settings,
    );
    let calls = Calls::default();

    let began = Instant::now();
    let started = capture.start_listening(calls.on_result(), calls.on_error());

    assert_eq!(started, ListenStart::Started);
    assert!(began.elapsed() < Duration::from_millis(1_000));
    assert_eq!(capture.process_events(), None);
    assert_eq!(log.borrow().starts, 1);
    assert_eq!(capture.wait_for_outcome(Duration::from_millis(10)), None);
    assert_eq!(log.borrow().starts, 1);

    capture.stop_listening();
    assert_eq!(log.borrow().stops, 0);
    assert_eq!(capture.state(), CaptureState::Idle);
}

#[test]
fn second_busy_start_reports_failure() {
    let (mut capture, log) =
        scripted_capture(vec![EngineStartError::Busy, EngineStartError::Busy]);
    let calls = Calls::default();

    let started = capture.start_listening(calls.on_result(), calls.on_error());
    assert_eq!(started, ListenStart::Started);
    assert!(calls.errors().is_empty());

    let outcome = capture.wait_for_outcome(Duration::from_millis(50));

    assert!(matches!(
        outcome,
        Some(CaptureOutcome::Failed(SpeechError::StartFailed(_)))
    ));
    assert_eq!(log.borrow().starts, 2);
    assert_eq!(calls.errors().len(), 1);
    assert!(matches!(calls.errors()[0], SpeechError::StartFailed(_)));
    assert_eq!(capture.state(), CaptureState::Idle);
}

#[test]
fn non_busy_start_failure_is_not_retried() {
    let (mut capture, log) = scripted_capture(vec![EngineStartError::Failed(
        "device lost".to_string(),
    )]);
    let calls = Calls::default();

    let started = capture.start_listening(calls.on_result(), calls.on_error());

    assert_eq!(started, ListenStart::Failed);
    assert_eq!(log.borrow().starts, 1);
    assert_eq!(
        calls.errors(),
        vec![SpeechError::StartFailed("device lost".to_string())]
    );
}

#[test]
fn stop_listening_discards_late_events() {
    let (mut capture, log) = scripted_capture(Vec::new());
    let calls = Calls::default();

    capture.start_listening(calls.on_result(), calls.on_error());
    capture.stop_listening();

    assert_eq!(log.borrow().stops, 1);
    assert_eq!(capture.state(), CaptureState::Idle);
    let delivered = emit(
        &log,
        RecognitionEvent::Result(vec![RecognitionResult::single("too late", 0.5)]),
    );
    assert!(!delivered);
    assert_eq!(capture.process_events(), None);
    assert!(calls.results().is_empty());

    let next = capture.start_listening(calls.on_result(), calls.on_error());
    assert_eq!(next, ListenStart::Started);
}

#[test]
fn stop_when_idle_is_a_no_op() {
    let (mut capture, log) = scripted_capture(Vec::new());

    capture.stop_listening();
    capture.stop_listening();

    assert_eq!(log.borrow().stops, 0);
}

#[test]
fn wait_for_outcome_receives_events_from_engine_thread() {
    let (mut capture, log) = scripted_capture(Vec::new());
    let calls = Calls::default();

    capture.start_listening(calls.on_result(), calls.on_error());
    let sink = log.borrow().sinks[0].clone();
    let worker = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        sink.emit(RecognitionEvent::Result(vec![RecognitionResult::single(
            "from another thread",
            0.7,
        )]))
    });

    let outcome = capture.wait_for_outcome(Duration::from_secs(5));
    assert!(worker.join().unwrap());
    assert_eq!(
        outcome,
        Some(CaptureOutcome::Transcript("from another thread".to_string()))
    );
    assert_eq!(calls.results(), vec!["from another thread".to_string()]);
}

#[test]
fn wait_for_outcome_times_out_while_listening() {
    let (mut capture, _log) = scripted_capture(Vec::new());
    let calls = Calls::default();

    capture.start_listening(calls.on_result(), calls.on_error());

    assert_eq!(capture.wait_for_outcome(Duration::from_millis(10)), None);
    assert!(capture.is_listening());
}

#[derive(Default)]
struct EngineLog {
    starts: usize,
    stops: usize,
    settings: Vec<RecognitionSettings>,
    sinks: Vec<RecognitionEventSink>,
}

struct ScriptedEngine {
    log: Rc<RefCell<EngineLog>>,
    start_errors: VecDeque<EngineStartError>,
}

impl ScriptedEngine {
    fn new(log: Rc<RefCell<EngineLog>>, start_errors: Vec<EngineStartError>) -> Self {
        Self {
            log,
            start_errors: start_errors.into(),
        }
    }
}

impl SpeechEngine for ScriptedEngine {
    fn is_available(&self) -> bool {
        true
    }

    fn start(
        &mut self,
        settings: &RecognitionSettings,
        events: RecognitionEventSink,
    ) -> Result<(), EngineStartError> {
        let mut log = self.log.borrow_mut();
        log.starts += 1;
        if let Some(err) = self.start_errors.pop_front() {
            return Err(err);
        }
        log.settings.push(settings.clone());
        log.sinks.push(events);
        Ok(())
    }

    fn stop(&mut self) {
        self.log.borrow_mut().stops += 1;
    }
}

#[derive(Clone, Default)]
struct Calls {
    results: Rc<RefCell<Vec<String>>>,
    errors: Rc<RefCell<Vec<SpeechError>>>,
}

impl Calls {
    fn on_result(&self) -> impl FnOnce(String) + 'static {
        let results = Rc::clone(&self.results);
        move |text| results.borrow_mut().push(text)
    }

    fn on_error(&self) -> impl FnOnce(SpeechError) + 'static {
        let errors = Rc::clone(&self.errors);
        move |err| errors.borrow_mut().push(err)
    }

    fn results(&self) -> Vec<String> {
        self.results.borrow().clone()
    }

    fn errors(&self) -> Vec<SpeechError> {
        self.errors.borrow().clone()
    }
}

fn scripted_capture(
    start_errors: Vec<EngineStartError>,
) -> (SpeechCapture<ScriptedEngine>, Rc<RefCell<EngineLog>>) {
    let log = Rc::new(RefCell::new(EngineLog::default()));
    let settings = SpeechSettings {
        retry_delay_ms: 0,
        ..SpeechSettings::default()
    };
    let capture = SpeechCapture::new(ScriptedEngine::new(Rc::clone(&log), start_errors), settings);
    (capture, log)
}

fn emit(log: &Rc<RefCell<EngineLog>>, event: RecognitionEvent) -> bool {
    let log = log.borrow();
    log.sinks.last().map_or(false, |sink| sink.emit(event))
}
