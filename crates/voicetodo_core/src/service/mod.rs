//! Task use-case services.
//!
//! # Responsibility
//! - Own the in-memory task collection and apply every mutation to it.
//! - Write the collection through the repository after each mutation.
//! - Offer a UI-facing facade with single-slot error reporting.

pub mod board;
pub mod task_service;
