//! Task persistence adapter.
//!
//! # Responsibility
//! - Define the save/load/clear contract the task service depends on.
//! - Serialize the whole task collection into one key-value entry.
//!
//! # Invariants
//! - Adapter calls never raise: failures are logged and reported as
//!   `false` / empty collections.
//! - The adapter holds no task state between calls.

pub mod task_repo;
