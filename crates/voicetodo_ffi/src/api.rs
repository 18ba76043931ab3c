//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level task commands to Dart via FRB.
//! - Hold the process-wide task board and its single error slot.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every command runs under one board lock; calls are serialized.
//! - Timestamps cross the boundary as epoch milliseconds.

use log::warn;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use voicetodo_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, open_repository,
    ping as ping_inner, KeyValueTaskRepository, MemoryKeyValueStore, StorageBackend,
    StorageConfig, Task, TaskBoard, TaskId, TaskRepository, TaskService,
};

type SharedBoard = TaskBoard<Box<dyn TaskRepository + Send>>;

const BOARD_DB_FILE_NAME: &str = "voicetodo_tasks.sqlite3";
static BOARD_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static BOARD: OnceLock<Mutex<SharedBoard>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Task projection handed to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    /// Stable task ID.
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub created_at_epoch_ms: i64,
    pub updated_at_epoch_ms: i64,
    /// Attached voice transcript, if any.
    pub transcript: Option<String>,
    /// Set exactly when `transcript` is set.
    pub transcript_created_at_epoch_ms: Option<i64>,
}

/// Full list envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    /// Tasks in display order.
    pub items: Vec<TaskItem>,
    /// Pending board error, if not yet dismissed.
    pub error: Option<String>,
}

/// Single command envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskActionResponse {
    /// Whether the command succeeded.
    pub ok: bool,
    /// Task after the command; `None` on failure and for deletions.
    pub task: Option<TaskItem>,
    /// Human-readable result, or the board error on failure.
    pub message: String,
}

impl TaskActionResponse {
    fn success(message: impl Into<String>, task: Option<&Task>) -> Self {
        Self {
            ok: true,
            task: task.map(to_task_item),
            message: message.into(),
        }
    }

    fn failure(board: &SharedBoard) -> Self {
        Self {
            ok: false,
            task: None,
            message: board.error().unwrap_or("Task command failed").to_string(),
        }
    }
}

/// Returns the current list and pending error.
///
/// # FFI contract
/// - Sync call; the first call opens the backing store.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn task_list() -> TaskListResponse {
    list_response(&lock_board())
}

/// Creates a task. `None` reports "Title is required".
///
/// # FFI contract
/// - Sync call, store-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn task_create(title: Option<String>) -> TaskActionResponse {
    let mut board = lock_board();
    match board.add(title.as_deref()) {
        Some(task) => TaskActionResponse::success("Task created.", Some(&task)),
        None => TaskActionResponse::failure(&board),
    }
}

/// Flips completion of task `id`.
#[flutter_rust_bridge::frb(sync)]
pub fn task_toggle(id: String) -> TaskActionResponse {
    let mut board = lock_board();
    match board.toggle(&TaskId::from(id)) {
        Some(task) => TaskActionResponse::success("Task updated.", Some(&task)),
        None => TaskActionResponse::failure(&board),
    }
}

/// Renames task `id` after title validation.
#[flutter_rust_bridge::frb(sync)]
pub fn task_rename(id: String, title: Option<String>) -> TaskActionResponse {
    let mut board = lock_board();
    match board.rename(&TaskId::from(id), title.as_deref()) {
        Some(task) => TaskActionResponse::success("Task renamed.", Some(&task)),
        None => TaskActionResponse::failure(&board),
    }
}

/// Deletes task `id`.
#[flutter_rust_bridge::frb(sync)]
pub fn task_delete(id: String) -> TaskActionResponse {
    let mut board = lock_board();
    if board.remove(&TaskId::from(id)) {
        TaskActionResponse::success("Task deleted.", None)
    } else {
        TaskActionResponse::failure(&board)
    }
}

/// Attaches a recognized transcript to task `id`.
///
/// # FFI contract
/// - Capture itself runs on the host; only the final text crosses here.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn task_attach_transcript(id: String, text: String) -> TaskActionResponse {
    let mut board = lock_board();
    match board.attach_transcript(&TaskId::from(id), text) {
        Some(task) => TaskActionResponse::success("Transcript attached.", Some(&task)),
        None => TaskActionResponse::failure(&board),
    }
}

/// Removes the transcript from task `id`.
#[flutter_rust_bridge::frb(sync)]
pub fn task_detach_transcript(id: String) -> TaskActionResponse {
    let mut board = lock_board();
    match board.detach_transcript(&TaskId::from(id)) {
        Some(task) => TaskActionResponse::success("Transcript removed.", Some(&task)),
        None => TaskActionResponse::failure(&board),
    }
}

/// Clears the pending board error and returns the refreshed list.
#[flutter_rust_bridge::frb(sync)]
pub fn error_dismiss() -> TaskListResponse {
    let mut board = lock_board();
    board.dismiss_error();
    list_response(&board)
}

fn list_response(board: &SharedBoard) -> TaskListResponse {
    TaskListResponse {
        items: board.tasks().iter().map(to_task_item).collect(),
        error: board.error().map(str::to_string),
    }
}

fn to_task_item(task: &Task) -> TaskItem {
    TaskItem {
        id: task.id().to_string(),
        title: task.title().to_string(),
        completed: task.is_completed(),
        created_at_epoch_ms: task.created_at().timestamp_millis(),
        updated_at_epoch_ms: task.updated_at().timestamp_millis(),
        transcript: task.transcript().map(str::to_string),
        transcript_created_at_epoch_ms: task
            .transcript_created_at()
            .map(|at| at.timestamp_millis()),
    }
}

// Poison is ignored; board commands never leave a half-applied mutation.
fn lock_board() -> MutexGuard<'static, SharedBoard> {
    BOARD
        .get_or_init(|| Mutex::new(TaskBoard::open(TaskService::new(open_board_repository()))))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn open_board_repository() -> Box<dyn TaskRepository + Send> {
    let config = StorageConfig {
        backend: StorageBackend::Sqlite,
        path: Some(resolve_board_db_path()),
        ..StorageConfig::default()
    };
    match open_repository(&config) {
        Ok(repo) => repo,
        Err(err) => {
            warn!("event=board_open module=ffi status=fallback backend=memory error={err}");
            Box::new(KeyValueTaskRepository::with_key(
                MemoryKeyValueStore::new(),
                config.key,
            ))
        }
    }
}

fn resolve_board_db_path() -> PathBuf {
    BOARD_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("VOICETODO_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(BOARD_DB_FILE_NAME)
        })
        .clone()
}
