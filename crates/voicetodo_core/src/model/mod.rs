//! Task domain model and title validation.
//!
//! # Responsibility
//! - Define the canonical task record shared by service, storage and FFI.
//! - Own the single title validation gate.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Deletion is a hard removal from the collection.

pub mod task;
pub mod validation;
