//! Task use-case service.
//!
//! # Responsibility
//! - Provide create/toggle/rename/delete/transcript entry points.
//! - Keep the in-memory collection authoritative for the session.
//!
//! # Invariants
//! - Titles pass `validate_title` before any mutation sets them.
//! - A failed lookup or validation leaves the collection untouched.
//! - Every successful mutation is followed by one full `save`.
//! - A failed save never rolls back the in-memory mutation.

use crate::model::task::{Task, TaskId};
use crate::model::validation::{validate_title, TitleValidationError};
use crate::repo::task_repo::TaskRepository;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

/// How a failed write-through save is reported to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistencePolicy {
    /// Log the failure and report the operation as successful.
    #[default]
    BestEffort,
    /// Keep the in-memory mutation but return `PersistenceFailed`.
    Strict,
}

impl PersistencePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BestEffort => "best_effort",
            Self::Strict => "strict",
        }
    }
}

/// Service error for task use-cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskServiceError {
    /// Title rejected by validation; message is user-facing.
    Validation(TitleValidationError),
    /// No task with this ID exists in the collection.
    NotFound(TaskId),
    /// Mutation applied in memory but not persisted (strict policy only).
    PersistenceFailed { operation: &'static str },
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(_) => write!(f, "Task not found"),
            Self::PersistenceFailed { .. } => {
                write!(f, "Changes could not be saved and will be lost on reload")
            }
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TitleValidationError> for TaskServiceError {
    fn from(value: TitleValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Owner of the in-memory task collection.
pub struct TaskService<R: TaskRepository> {
    repo: R,
    tasks: Vec<Task>,
    policy: PersistencePolicy,
    last_save_ok: bool,
}

impl<R: TaskRepository> TaskService<R> {
    /// Creates an empty service with the best-effort persistence policy.
    ///
    /// Call [`TaskService::load`] to pull the persisted collection in.
    pub fn new(repo: R) -> Self {
        Self::with_policy(repo, PersistencePolicy::default())
    }

    pub fn with_policy(repo: R, policy: PersistencePolicy) -> Self {
        Self {
            repo,
            tasks: Vec::new(),
            policy,
            last_save_ok: true,
        }
    }

    /// Replaces in-memory state with the repository contents.
    pub fn load(&mut self) -> &[Task] {
        self.tasks = self.repo.load();
        info!(
            "event=tasks_load module=service status=ok count={}",
            self.tasks.len()
        );
        &self.tasks
    }

    /// Returns a snapshot copy of the collection in list order.
    pub fn get_all(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn get_by_id(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn policy(&self) -> PersistencePolicy {
        self.policy
    }

    /// Whether the most recent write-through save succeeded.
    pub fn last_save_succeeded(&self) -> bool {
        self.last_save_ok
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Validates `title` and appends a new task to the end of the list.
    pub fn create<'a>(&mut self, title: impl Into<Option<&'a str>>) -> TaskServiceResult<Task> {
        let title = validate_title(title.into())?;
        let task = Task::new(title);
        self.tasks.push(task.clone());
        info!(
            "event=task_create module=service status=ok task_id={}",
            task.id()
        );
        self.persist("create")?;
        Ok(task)
    }

    /// Flips the completion flag of one task.
    pub fn toggle_completed(&mut self, id: &TaskId) -> TaskServiceResult<Task> {
        let index = self.position(id)?;
        self.apply(index, "toggle", Task::toggle_completed)
    }

    /// Replaces the title of one task after validation.
    pub fn rename<'a>(
        &mut self,
        id: &TaskId,
        title: impl Into<Option<&'a str>>,
    ) -> TaskServiceResult<Task> {
        let index = self.position(id)?;
        let title = validate_title(title.into())?;
        self.apply(index, "rename", |task| task.set_title(title))
    }

    /// Removes one task, keeping the order of the others.
    pub fn delete(&mut self, id: &TaskId) -> TaskServiceResult<bool> {
        let index = self.position(id)?;
        self.tasks.remove(index);
        info!("event=task_delete module=service status=ok task_id={id}");
        self.persist("delete")?;
        Ok(true)
    }

    /// Attaches a voice transcript to one task.
    pub fn attach_transcript(
        &mut self,
        id: &TaskId,
        text: impl Into<String>,
    ) -> TaskServiceResult<Task> {
        let index = self.position(id)?;
        let text = text.into();
        self.apply(index, "attach_transcript", |task| {
            task.attach_transcript(text)
        })
    }

    /// Removes the transcript of one task.
    pub fn detach_transcript(&mut self, id: &TaskId) -> TaskServiceResult<Task> {
        let index = self.position(id)?;
        self.apply(index, "detach_transcript", Task::detach_transcript)
    }

    /// Removes the persisted copy. In-memory tasks are kept.
    pub fn clear_storage(&mut self) -> bool {
        let cleared = self.repo.clear();
        info!("event=tasks_clear module=service status={}", status(cleared));
        cleared
    }

    fn position(&self, id: &TaskId) -> TaskServiceResult<usize> {
        self.tasks
            .iter()
            .position(|task| task.id() == id)
            .ok_or_else(|| {
                warn!("event=task_lookup module=service status=not_found task_id={id}");
                TaskServiceError::NotFound(id.clone())
            })
    }

    fn apply(
        &mut self,
        index: usize,
        operation: &'static str,
        mutate: impl FnOnce(&mut Task),
    ) -> TaskServiceResult<Task> {
        let task = &mut self.tasks[index];
        mutate(task);
        let updated = task.clone();
        info!(
            "event=task_{operation} module=service status=ok task_id={}",
            updated.id()
        );
        self.persist(operation)?;
        Ok(updated)
    }

    fn persist(&mut self, operation: &'static str) -> TaskServiceResult<()> {
        self.last_save_ok = self.repo.save(&self.tasks);
        if self.last_save_ok {
            return Ok(());
        }

        warn!(
            "event=tasks_persist module=service status=error operation={operation} policy={}",
            self.policy.as_str()
        );
        match self.policy {
            PersistencePolicy::BestEffort => Ok(()),
            PersistencePolicy::Strict => Err(TaskServiceError::PersistenceFailed { operation }),
        }
    }
}

fn status(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}
