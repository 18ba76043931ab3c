//! Speech capture over a pluggable speech-to-text engine.
//!
//! # Responsibility
//! - Define the engine boundary (`SpeechEngine`) and its event vocabulary.
//! - Wrap an engine into a single-shot, one-session-at-a-time capture
//!   lifecycle with user-facing error messages.
//!
//! # Invariants
//! - Engine support is probed once, when the capture adapter is built.
//! - Each started session resolves to exactly one outcome.
//! - Errors reach callers only through the error callback.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

mod capture;
mod engine;

pub use capture::{CaptureOutcome, CaptureState, ListenStart, SpeechCapture};
pub use engine::{
    EngineStartError, RecognitionAlternative, RecognitionErrorCode, RecognitionEvent,
    RecognitionEventSink, RecognitionResult, RecognitionSettings, SpeechEngine,
    UnavailableEngine,
};

pub const DEFAULT_LOCALE: &str = "en-US";
pub const DEFAULT_RETRY_DELAY_MS: u64 = 150;

/// Capture tuning, loaded from the `speech` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// BCP-47 style recognition locale.
    pub locale: String,
    /// Pause before the single retry when the engine reports busy.
    pub retry_delay_ms: u64,
}

impl SpeechSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

/// Capture failure delivered through the error callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    /// No usable speech engine on this platform.
    Unsupported,
    /// Engine reported a recognition error.
    Recognition(RecognitionErrorCode),
    /// Engine refused to start, including after the busy retry.
    StartFailed(String),
}

impl Display for SpeechError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported => write!(f, "Speech recognition not supported"),
            Self::Recognition(code) => match code {
                RecognitionErrorCode::NoSpeech => {
                    write!(f, "No speech detected. Please try again.")
                }
                RecognitionErrorCode::AudioCapture => {
                    write!(f, "Microphone not found or not accessible.")
                }
                RecognitionErrorCode::NotAllowed => write!(f, "Microphone permission denied."),
                RecognitionErrorCode::Network => {
                    write!(f, "Network error. Check your connection.")
                }
                other => write!(f, "Error: {}", other.as_str()),
            },
            Self::StartFailed(details) => {
                write!(f, "Speech recognition could not start: {details}")
            }
        }
    }
}

impl Error for SpeechError {}
