//! Speech engine boundary.

use std::fmt::{Display, Formatter};
use std::sync::mpsc::Sender;

/// Recognition parameters passed to the engine on every start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSettings {
    pub continuous: bool,
    pub interim_results: bool,
    pub max_alternatives: u32,
    pub locale: String,
}

impl RecognitionSettings {
    /// One utterance, final results only, best alternative only.
    pub fn single_utterance(locale: impl Into<String>) -> Self {
        Self {
            continuous: false,
            interim_results: false,
            max_alternatives: 1,
            locale: locale.into(),
        }
    }
}

/// Coarse error code reported by an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorCode {
    NoSpeech,
    AudioCapture,
    NotAllowed,
    Network,
    /// Session was cancelled, normally by a stop request.
    Aborted,
    Other(String),
}

impl RecognitionErrorCode {
    /// Parses the engine's wire code (`no-speech`, `audio-capture`, ...).
    pub fn parse(code: &str) -> Self {
        match code.trim() {
            "no-speech" => Self::NoSpeech,
            "audio-capture" => Self::AudioCapture,
            "not-allowed" => Self::NotAllowed,
            "network" => Self::Network,
            "aborted" => Self::Aborted,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::NoSpeech => "no-speech",
            Self::AudioCapture => "audio-capture",
            Self::NotAllowed => "not-allowed",
            Self::Network => "network",
            Self::Aborted => "aborted",
            Self::Other(code) => code.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionAlternative {
    pub transcript: String,
    pub confidence: f32,
}

/// One recognized segment with its ranked alternatives.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub alternatives: Vec<RecognitionAlternative>,
}

impl RecognitionResult {
    /// Builds a result holding a single alternative.
    pub fn single(transcript: impl Into<String>, confidence: f32) -> Self {
        Self {
            alternatives: vec![RecognitionAlternative {
                transcript: transcript.into(),
                confidence,
            }],
        }
    }
}

/// Event emitted by an engine during one session.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    Result(Vec<RecognitionResult>),
    Error(RecognitionErrorCode),
    End,
}

/// Per-session channel an engine reports events through.
///
/// Engines keep a clone for as long as the session runs; dropping every
/// clone without emitting is read as the session ending.
#[derive(Debug, Clone)]
pub struct RecognitionEventSink {
    sender: Sender<RecognitionEvent>,
}

impl RecognitionEventSink {
    pub(crate) fn new(sender: Sender<RecognitionEvent>) -> Self {
        Self { sender }
    }

    /// Sends one event. Returns `false` when the session is already gone.
    pub fn emit(&self, event: RecognitionEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Synchronous failure of `SpeechEngine::start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStartError {
    /// A previous session is still finalizing.
    Busy,
    Unavailable,
    Failed(String),
}

impl Display for EngineStartError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy => write!(f, "recognition engine is busy"),
            Self::Unavailable => write!(f, "recognition engine is unavailable"),
            Self::Failed(details) => write!(f, "{details}"),
        }
    }
}

impl std::error::Error for EngineStartError {}

/// Platform speech-to-text capability.
pub trait SpeechEngine {
    /// Probes whether the capability exists on this platform.
    fn is_available(&self) -> bool;

    /// Begins one recognition session reporting through `events`.
    fn start(
        &mut self,
        settings: &RecognitionSettings,
        events: RecognitionEventSink,
    ) -> Result<(), EngineStartError>;

    /// Asks the running session to stop.
    fn stop(&mut self);
}

/// Engine stand-in for platforms without speech recognition.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableEngine;

impl SpeechEngine for UnavailableEngine {
    fn is_available(&self) -> bool {
        false
    }

    fn start(
        &mut self,
        _settings: &RecognitionSettings,
        _events: RecognitionEventSink,
    ) -> Result<(), EngineStartError> {
        Err(EngineStartError::Unavailable)
    }

    fn stop(&mut self) {}
}
