//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record and its wire shape.
//! - Generate task IDs and keep timestamp bookkeeping in one place.
//!
//! # Invariants
//! - `id` is assigned once and never reassigned.
//! - `updated_at >= created_at`, and every mutation strictly advances
//!   `updated_at`.
//! - `transcript` and `transcript_created_at` are both set or both unset.
//! - Decoding rejects records that break the two invariants above.

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// UTC timestamp with millisecond precision.
pub type Timestamp = DateTime<Utc>;

const ID_SUFFIX_LEN: usize = 9;
const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Stable task identifier, `<unix-millis>-<base36 suffix>` for generated IDs.
///
/// Persisted IDs are kept verbatim, whatever their shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generates a new ID from the current time and a random suffix.
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        Self(format!("{millis}-{}", random_suffix()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Returns the current time truncated to millisecond precision.
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(3)
}

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TaskRecord")]
pub struct Task {
    id: TaskId,
    title: String,
    completed: bool,
    #[serde(serialize_with = "iso_millis::serialize")]
    created_at: Timestamp,
    #[serde(serialize_with = "iso_millis::serialize")]
    updated_at: Timestamp,
    transcript: Option<String>,
    #[serde(serialize_with = "iso_millis::serialize_option")]
    transcript_created_at: Option<Timestamp>,
}

impl Task {
    /// Creates a pending task with a fresh ID.
    ///
    /// The title must already be validated and trimmed by the caller.
    pub fn new(title: impl Into<String>) -> Self {
        let created_at = now();
        Self {
            id: TaskId::generate(),
            title: title.into(),
            completed: false,
            created_at,
            updated_at: created_at,
            transcript: None,
            transcript_created_at: None,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    pub fn transcript_created_at(&self) -> Option<Timestamp> {
        self.transcript_created_at
    }

    /// Flips the completion flag.
    pub fn toggle_completed(&mut self) {
        self.completed = !self.completed;
        self.touch();
    }

    /// Replaces the title. Callers pass a title that passed validation.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    /// Attaches a voice transcript, replacing any previous one.
    pub fn attach_transcript(&mut self, text: impl Into<String>) {
        let at = now();
        self.transcript = Some(text.into());
        self.transcript_created_at = Some(at);
        self.touch_at(at);
    }

    /// Removes the transcript and its timestamp together.
    pub fn detach_transcript(&mut self) {
        self.transcript = None;
        self.transcript_created_at = None;
        self.touch();
    }

    /// Serializes this task into a plain attribute mapping.
    pub fn to_record(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Reconstructs a task from an attribute mapping.
    ///
    /// Unknown attributes are ignored. Shape errors are `Malformed`; records
    /// breaking a task invariant report the matching variant.
    pub fn from_record(record: serde_json::Value) -> Result<Self, TaskRecordError> {
        let record = serde_json::from_value::<TaskRecord>(record)
            .map_err(|err| TaskRecordError::Malformed(err.to_string()))?;
        Self::try_from(record)
    }

    fn touch(&mut self) {
        self.touch_at(now());
    }

    // Keeps `updated_at` strictly increasing even when the clock has not
    // moved past the previous value at millisecond resolution.
    fn touch_at(&mut self, at: Timestamp) {
        self.updated_at = if at > self.updated_at {
            at
        } else {
            self.updated_at + TimeDelta::milliseconds(1)
        };
    }
}

/// Errors produced while decoding a persisted task record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRecordError {
    /// Record does not match the task wire shape.
    Malformed(String),
    /// Exactly one of the two transcript fields is set.
    TranscriptMismatch,
    /// `updatedAt` precedes `createdAt`.
    UpdatedBeforeCreated,
}

impl Display for TaskRecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(details) => write!(f, "malformed task record: {details}"),
            Self::TranscriptMismatch => write!(
                f,
                "transcript and transcriptCreatedAt must be set together"
            ),
            Self::UpdatedBeforeCreated => write!(f, "updatedAt must be >= createdAt"),
        }
    }
}

impl Error for TaskRecordError {}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: TaskId,
    title: String,
    #[serde(default)]
    completed: bool,
    #[serde(deserialize_with = "iso_millis::deserialize")]
    created_at: Timestamp,
    #[serde(deserialize_with = "iso_millis::deserialize")]
    updated_at: Timestamp,
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default, deserialize_with = "iso_millis::deserialize_option")]
    transcript_created_at: Option<Timestamp>,
}

impl TryFrom<TaskRecord> for Task {
    type Error = TaskRecordError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        if record.transcript.is_some() != record.transcript_created_at.is_some() {
            return Err(TaskRecordError::TranscriptMismatch);
        }
        if record.updated_at < record.created_at {
            return Err(TaskRecordError::UpdatedBeforeCreated);
        }

        Ok(Self {
            id: record.id,
            title: record.title,
            completed: record.completed,
            created_at: record.created_at,
            updated_at: record.updated_at,
            transcript: record.transcript,
            transcript_created_at: record.transcript_created_at,
        })
    }
}

// ISO-8601 with exactly three fraction digits and a `Z` suffix. Decoded
// values are truncated to milliseconds so re-encoding is lossless.
mod iso_millis {
    use super::Timestamp;
    use chrono::{SecondsFormat, SubsecRound};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn serialize_option<S: Serializer>(
        value: &Option<Timestamp>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        Ok(Timestamp::deserialize(deserializer)?.trunc_subsecs(3))
    }

    pub fn deserialize_option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Timestamp>, D::Error> {
        Ok(Option::<Timestamp>::deserialize(deserializer)?.map(|value| value.trunc_subsecs(3)))
    }
}

fn random_suffix() -> String {
    let mut value = Uuid::new_v4().as_u128();
    let mut suffix = String::with_capacity(ID_SUFFIX_LEN);
    for _ in 0..ID_SUFFIX_LEN {
        suffix.push(char::from(BASE36_DIGITS[(value % 36) as usize]));
        value /= 36;
    }
    suffix
}
