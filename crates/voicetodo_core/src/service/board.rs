//! UI-facing task board.
//!
//! # Responsibility
//! - Wrap `TaskService` for presentation layers that render one error at a
//!   time.
//! - Route speech capture outcomes into transcript attachment.
//!
//! # Invariants
//! - At most one error message is held; a newer error replaces it.
//! - Any successful command clears the held error.

use crate::model::task::{Task, TaskId};
use crate::repo::task_repo::TaskRepository;
use crate::service::task_service::{TaskService, TaskServiceResult};
use crate::speech::SpeechError;

/// Task service plus a single dismissible error slot.
pub struct TaskBoard<R: TaskRepository> {
    service: TaskService<R>,
    error: Option<String>,
}

impl<R: TaskRepository> TaskBoard<R> {
    /// Wraps `service` and loads the persisted collection into it.
    pub fn open(mut service: TaskService<R>) -> Self {
        service.load();
        Self {
            service,
            error: None,
        }
    }

    /// Current list in display order.
    pub fn tasks(&self) -> Vec<Task> {
        self.service.get_all()
    }

    /// Message of the most recent failed command, if not yet cleared.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn service(&self) -> &TaskService<R> {
        &self.service
    }

    pub fn reload(&mut self) -> Vec<Task> {
        self.service.load();
        self.error = None;
        self.service.get_all()
    }

    pub fn add<'a>(&mut self, title: impl Into<Option<&'a str>>) -> Option<Task> {
        let result = self.service.create(title);
        self.record(result)
    }

    pub fn toggle(&mut self, id: &TaskId) -> Option<Task> {
        let result = self.service.toggle_completed(id);
        self.record(result)
    }

    pub fn rename<'a>(&mut self, id: &TaskId, title: impl Into<Option<&'a str>>) -> Option<Task> {
        let result = self.service.rename(id, title);
        self.record(result)
    }

    pub fn remove(&mut self, id: &TaskId) -> bool {
        let result = self.service.delete(id);
        self.record(result).unwrap_or(false)
    }

    pub fn attach_transcript(&mut self, id: &TaskId, text: impl Into<String>) -> Option<Task> {
        let result = self.service.attach_transcript(id, text);
        self.record(result)
    }

    pub fn detach_transcript(&mut self, id: &TaskId) -> Option<Task> {
        let result = self.service.detach_transcript(id);
        self.record(result)
    }

    /// Applies one speech capture outcome to task `id`.
    ///
    /// A transcript is attached; a capture error lands in the error slot.
    pub fn apply_speech_outcome(
        &mut self,
        id: &TaskId,
        outcome: Result<String, SpeechError>,
    ) -> Option<Task> {
        match outcome {
            Ok(text) => self.attach_transcript(id, text),
            Err(err) => {
                self.error = Some(err.to_string());
                None
            }
        }
    }

    fn record<T>(&mut self, result: TaskServiceResult<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.error = None;
                Some(value)
            }
            Err(err) => {
                self.error = Some(err.to_string());
                None
            }
        }
    }
}
